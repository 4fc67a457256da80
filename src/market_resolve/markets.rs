use crate::error::LedgerError;
use crate::ids::IdCounter;
use crate::{Amount, MarketId, OptionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A prediction market with a fixed prize pool and priced options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Market {
    /// Sequential market identifier
    pub id: MarketId,

    /// Market question/title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Informational resolver label; resolution is gated by the admin role
    pub oracle: String,

    /// Principal that funded the prize pool
    pub creator: String,

    /// Escrowed prize pool in smallest units, fixed at creation
    pub prize_pool: Amount,

    /// Scheduled resolution time (unix seconds), a hint rather than a lock
    pub resolve_at: u64,

    /// Market status: open or resolved
    pub status: MarketStatus,

    /// Winning option index (None while open)
    pub winning_option: Option<OptionId>,

    /// Outcome options, indexed by option id
    pub options: Vec<MarketOption>,

    /// Creation timestamp
    pub created_at: u64,

    /// Resolution timestamp (if resolved)
    pub resolved_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MarketStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "resolved")]
    Resolved,
}

/// One outcome of a market.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarketOption {
    pub label: String,

    /// Primary ticket price, always > 0
    pub unit_price: Amount,

    /// Tickets issued on this option
    pub tickets_sold: u64,

    /// Sum of unit prices over issued tickets; resale never touches it
    pub volume: Amount,
}

impl Market {
    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    pub fn total_tickets_sold(&self) -> u64 {
        self.options.iter().map(|o| o.tickets_sold).sum()
    }

    pub fn option(&self, option_id: OptionId) -> Result<&MarketOption, LedgerError> {
        self.options
            .get(option_id)
            .ok_or(LedgerError::OptionOutOfRange {
                market_id: self.id,
                option_id,
                option_count: self.options.len(),
            })
    }

    /// Tickets on the winning option, once resolved.
    pub fn winning_ticket_count(&self) -> Option<u64> {
        let winner = self.winning_option?;
        self.options.get(winner).map(|o| o.tickets_sold)
    }
}

/// Parameters for a new market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub oracle: String,
    pub resolve_at: u64,
    pub option_labels: Vec<String>,
    pub option_prices: Vec<Amount>,
    #[serde(default)]
    pub prize_pool: Amount,
}

impl NewMarket {
    /// Validation that needs no state. Cheap checks only; the prize pool has
    /// not been escrowed yet when this runs.
    pub fn validate(&self, now: u64) -> Result<(), LedgerError> {
        if self.option_labels.is_empty() {
            return Err(LedgerError::InvalidSchedule(
                "market needs at least one option".to_string(),
            ));
        }
        if self.option_labels.len() != self.option_prices.len() {
            return Err(LedgerError::InvalidSchedule(format!(
                "{} option labels but {} option prices",
                self.option_labels.len(),
                self.option_prices.len()
            )));
        }
        if self.option_prices.iter().any(|p| *p == 0) {
            return Err(LedgerError::ZeroPrice);
        }
        if self.resolve_at <= now {
            return Err(LedgerError::InvalidSchedule(format!(
                "resolve_at {} is not after {}",
                self.resolve_at, now
            )));
        }
        Ok(())
    }
}

/// Owns every market and the market id counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketId, Market>,
    ids: IdCounter,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markets ever created.
    pub fn count(&self) -> u64 {
        self.ids.issued()
    }

    pub fn get(&self, market_id: MarketId) -> Result<&Market, LedgerError> {
        self.markets
            .get(&market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))
    }

    pub fn options(&self, market_id: MarketId) -> Result<&[MarketOption], LedgerError> {
        Ok(&self.get(market_id)?.options)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Insert a validated market. Only called once the prize pool is in
    /// custody, so the id counter never advances for an aborted creation.
    pub(crate) fn insert(&mut self, new: NewMarket, creator: &str, now: u64) -> Result<MarketId, LedgerError> {
        new.validate(now)?;
        let id = self.ids.advance()?;

        let options = new
            .option_labels
            .into_iter()
            .zip(new.option_prices)
            .map(|(label, unit_price)| MarketOption {
                label,
                unit_price,
                tickets_sold: 0,
                volume: 0,
            })
            .collect();

        self.markets.insert(
            id,
            Market {
                id,
                title: new.title,
                description: new.description,
                oracle: new.oracle,
                creator: creator.to_string(),
                prize_pool: new.prize_pool,
                resolve_at: new.resolve_at,
                status: MarketStatus::Open,
                winning_option: None,
                options,
                created_at: now,
                resolved_at: None,
            },
        );
        Ok(id)
    }

    /// Option lookup for operations that need the market to still be open.
    pub fn open_option(&self, market_id: MarketId, option_id: OptionId) -> Result<&MarketOption, LedgerError> {
        let market = self.get(market_id)?;
        let option = market.option(option_id)?;
        if !market.is_open() {
            return Err(LedgerError::MarketClosed(market_id));
        }
        Ok(option)
    }

    /// Fail unless the market exists and is open.
    pub fn ensure_open(&self, market_id: MarketId) -> Result<&Market, LedgerError> {
        let market = self.get(market_id)?;
        if !market.is_open() {
            return Err(LedgerError::MarketClosed(market_id));
        }
        Ok(market)
    }

    pub fn check_resolve(&self, market_id: MarketId, winning_option: OptionId) -> Result<(), LedgerError> {
        let market = self.get(market_id)?;
        if !market.is_open() {
            return Err(LedgerError::AlreadyResolved(market_id));
        }
        market.option(winning_option)?;
        Ok(())
    }

    /// The single irreversible transition: Open -> Resolved.
    pub(crate) fn resolve(&mut self, market_id: MarketId, winning_option: OptionId, now: u64) -> Result<&Market, LedgerError> {
        self.check_resolve(market_id, winning_option)?;
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))?;
        market.status = MarketStatus::Resolved;
        market.winning_option = Some(winning_option);
        market.resolved_at = Some(now);
        Ok(market)
    }

    /// Everything `record_sale` can reject, checked up front. Returns the unit price.
    pub fn check_sale(&self, market_id: MarketId, option_id: OptionId) -> Result<Amount, LedgerError> {
        let option = self.open_option(market_id, option_id)?;
        option
            .tickets_sold
            .checked_add(1)
            .ok_or(LedgerError::Overflow("tickets sold"))?;
        option
            .volume
            .checked_add(option.unit_price)
            .ok_or(LedgerError::Overflow("option volume"))?;
        Ok(option.unit_price)
    }

    /// Count one primary sale. Ticket issuance is the only caller.
    pub(crate) fn record_sale(&mut self, market_id: MarketId, option_id: OptionId) -> Result<(), LedgerError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(LedgerError::MarketNotFound(market_id))?;
        let option_count = market.options.len();
        let option = market
            .options
            .get_mut(option_id)
            .ok_or(LedgerError::OptionOutOfRange { market_id, option_id, option_count })?;

        let tickets_sold = option
            .tickets_sold
            .checked_add(1)
            .ok_or(LedgerError::Overflow("tickets sold"))?;
        let volume = option
            .volume
            .checked_add(option.unit_price)
            .ok_or(LedgerError::Overflow("option volume"))?;
        option.tickets_sold = tickets_sold;
        option.volume = volume;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn two_options(prize_pool: Amount) -> NewMarket {
        NewMarket {
            title: "Will it rain?".into(),
            description: "Rain in Lisbon on Friday".into(),
            oracle: "weather-desk".into(),
            resolve_at: NOW + 3_600,
            option_labels: vec!["Yes".into(), "No".into()],
            option_prices: vec![5, 7],
            prize_pool,
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut registry = MarketRegistry::new();
        assert_eq!(registry.insert(two_options(100), "root", NOW).unwrap(), 1);
        assert_eq!(registry.insert(two_options(0), "root", NOW).unwrap(), 2);
        assert_eq!(registry.count(), 2);

        let market = registry.get(1).unwrap();
        assert_eq!(market.status, MarketStatus::Open);
        assert_eq!(market.options[1].unit_price, 7);
        assert_eq!(market.winning_option, None);
    }

    #[test]
    fn test_validation_rules() {
        let mut new = two_options(0);
        new.option_prices.pop();
        assert_eq!(new.validate(NOW).unwrap_err().kind(), "InvalidSchedule");

        let mut new = two_options(0);
        new.option_labels.clear();
        new.option_prices.clear();
        assert_eq!(new.validate(NOW).unwrap_err().kind(), "InvalidSchedule");

        let mut new = two_options(0);
        new.option_prices[0] = 0;
        assert_eq!(new.validate(NOW), Err(LedgerError::ZeroPrice));

        let mut new = two_options(0);
        new.resolve_at = NOW;
        assert_eq!(new.validate(NOW).unwrap_err().kind(), "InvalidSchedule");
    }

    #[test]
    fn test_failed_insert_does_not_consume_id() {
        let mut registry = MarketRegistry::new();
        let mut bad = two_options(0);
        bad.option_prices.push(9);
        assert!(registry.insert(bad, "root", NOW).is_err());
        assert_eq!(registry.insert(two_options(0), "root", NOW).unwrap(), 1);
    }

    #[test]
    fn test_resolve_is_one_way() {
        let mut registry = MarketRegistry::new();
        let id = registry.insert(two_options(100), "root", NOW).unwrap();

        assert!(matches!(
            registry.resolve(id, 2, NOW),
            Err(LedgerError::OptionOutOfRange { option_count: 2, .. })
        ));
        registry.resolve(id, 1, NOW + 5).unwrap();
        assert_eq!(registry.resolve(id, 0, NOW + 6), Err(LedgerError::AlreadyResolved(id)));

        let market = registry.get(id).unwrap();
        assert_eq!(market.winning_option, Some(1));
        assert_eq!(market.resolved_at, Some(NOW + 5));
        assert_eq!(registry.resolve(42, 0, NOW), Err(LedgerError::MarketNotFound(42)));
    }

    #[test]
    fn test_record_sale_updates_stats() {
        let mut registry = MarketRegistry::new();
        let id = registry.insert(two_options(100), "root", NOW).unwrap();
        registry.record_sale(id, 1).unwrap();
        registry.record_sale(id, 1).unwrap();

        let market = registry.get(id).unwrap();
        assert_eq!(market.options[1].tickets_sold, 2);
        assert_eq!(market.options[1].volume, 14);
        assert_eq!(market.total_tickets_sold(), 2);
    }

    #[test]
    fn test_open_option_order_of_checks() {
        let mut registry = MarketRegistry::new();
        let id = registry.insert(two_options(100), "root", NOW).unwrap();
        registry.resolve(id, 0, NOW).unwrap();

        assert_eq!(registry.open_option(7, 0).unwrap_err().kind(), "MarketNotFound");
        assert_eq!(registry.open_option(id, 5).unwrap_err().kind(), "OptionOutOfRange");
        assert_eq!(registry.open_option(id, 0), Err(LedgerError::MarketClosed(id)));
    }
}
