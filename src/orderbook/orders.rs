// ============================================================================
// Listings - resale asks
// ============================================================================

use crate::{Amount, MarketId, OptionId, TicketId};
use serde::{Deserialize, Serialize};

/// An active resale ask for one ticket.
///
/// Market and option are copied from the ticket at listing time so the
/// order book index can be rebuilt from listings alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub ticket_id: TicketId,
    pub market_id: MarketId,
    pub option_id: OptionId,

    /// Owner of the ticket when it was listed
    pub seller: String,

    /// Asking price in smallest units, > 0
    pub ask_price: Amount,

    pub listed_at: u64,
}

impl Listing {
    /// Order book key: (market, option)
    pub fn book_key(&self) -> (MarketId, OptionId) {
        (self.market_id, self.option_id)
    }
}

/// Outcome of a filled resale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fill {
    pub ticket_id: TicketId,
    pub market_id: MarketId,
    pub option_id: OptionId,
    pub seller: String,
    pub buyer: String,
    pub price: Amount,
    pub timestamp: u64,
}

impl Fill {
    pub fn new(listing: Listing, buyer: &str, timestamp: u64) -> Self {
        Self {
            ticket_id: listing.ticket_id,
            market_id: listing.market_id,
            option_id: listing.option_id,
            seller: listing.seller,
            buyer: buyer.to_string(),
            price: listing.ask_price,
            timestamp,
        }
    }
}
