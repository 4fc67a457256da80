// Request and response types for the HTTP API

use crate::access::Role;
use crate::ledger::{ListingView, MarketView, TicketView};
use crate::market_resolve::NewMarket;
use crate::orderbook::Fill;
use crate::{Amount, MarketId, OptionId, TicketId};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== AMOUNTS =====

/// Render smallest units as a decimal token amount ("1.5" for 15 with 1 decimal).
/// Falls back to the raw integer when it does not fit a `Decimal`.
pub fn to_human(amount: Amount, decimals: u32) -> String {
    i128::try_from(amount)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| amount.to_string())
}

/// An amount in a request body: a JSON integer, or a string of digits for
/// values a JSON number cannot carry exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountArg(pub Amount);

impl<'de> Deserialize<'de> for AmountArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = AmountArg;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer or a string of digits")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AmountArg, E> {
                Ok(AmountArg(Amount::from(v)))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<AmountArg, E> {
                Ok(AmountArg(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<AmountArg, E> {
                Amount::try_from(v)
                    .map(AmountArg)
                    .map_err(|_| E::custom("amount must not be negative"))
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<AmountArg, E> {
                Err(E::custom("amount must be an integer; pass large values as strings"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AmountArg, E> {
                v.trim().parse::<Amount>().map(AmountArg).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

// ===== QUERY PARAMETERS =====

#[derive(Debug, Default, Deserialize)]
pub struct SimulateQuery {
    /// Validate and compute the result without committing
    #[serde(default)]
    pub simulate: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

// ===== REQUEST TYPES =====

/// Body of every write that needs nothing but the caller.
#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub caller: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub oracle: String,
    pub resolve_at: u64,
    pub option_labels: Vec<String>,
    pub option_prices: Vec<AmountArg>,
    #[serde(default)]
    pub prize_pool: AmountArg,
}

impl CreateMarketRequest {
    pub fn into_parts(self) -> (String, NewMarket) {
        let market = NewMarket {
            title: self.title,
            description: self.description,
            oracle: self.oracle,
            resolve_at: self.resolve_at,
            option_labels: self.option_labels,
            option_prices: self.option_prices.into_iter().map(|p| p.0).collect(),
            prize_pool: self.prize_pool.0,
        };
        (self.caller, market)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub caller: String,
    pub winning_option: OptionId,
}

#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    pub caller: String,
    /// Defaults to the caller
    pub recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRequest {
    pub caller: String,
    pub ask_price: AmountArg,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub caller: String,
    pub amount: AmountArg,
}

#[derive(Debug, Deserialize)]
pub struct MintRequest {
    pub caller: String,
    pub to: String,
    pub amount: AmountArg,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub caller: String,
    pub role: Role,
    pub principal: String,
}

// ===== RESPONSE TYPES =====

/// Envelope of every successful response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// True when the write was only simulated
    pub simulated: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            simulated: false,
            data,
        }
    }

    pub fn write(data: T, simulated: bool) -> Self {
        Self {
            success: true,
            simulated,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub markets: u64,
    pub tickets: usize,
    pub listings: usize,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    #[serde(flatten)]
    pub view: MarketView,
    pub prize_pool_human: String,
    pub payout_per_ticket_human: Option<String>,
}

impl MarketResponse {
    pub fn new(view: MarketView, decimals: u32) -> Self {
        Self {
            prize_pool_human: to_human(view.market.prize_pool, decimals),
            payout_per_ticket_human: view.payout_per_ticket.map(|p| to_human(p, decimals)),
            view,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedMarket {
    pub market_id: MarketId,
}

#[derive(Debug, Serialize)]
pub struct IssuedTicket {
    pub ticket_id: TicketId,
    pub market_id: MarketId,
    pub option_id: OptionId,
    pub price: Amount,
    pub price_human: String,
}

#[derive(Debug, Serialize)]
pub struct FillResponse {
    #[serde(flatten)]
    pub fill: Fill,
    pub price_human: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub ticket_id: TicketId,
    pub amount: Amount,
    pub amount_human: String,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub market_id: MarketId,
    pub recipient: String,
    pub amount: Amount,
    pub amount_human: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub principal: String,
    pub balance: Amount,
    pub balance_human: String,
    /// Remaining allowance granted to the ledger
    pub allowance: Amount,
    pub allowance_human: String,
}

#[derive(Debug, Serialize)]
pub struct RoleChange {
    pub role: Role,
    pub principal: String,
    /// False when the call changed nothing
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleMembers {
    pub role: Role,
    pub members: Vec<String>,
}

pub type TicketList = Vec<TicketView>;
pub type ListingList = Vec<ListingView>;
