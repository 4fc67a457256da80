// ============================================================================
// Ask Book - price levels for one market option
// ============================================================================
//
// Resale listings are asks only. Levels are kept in a BTreeMap so the best
// (lowest) price is the first key, and tickets inside a level are kept in a
// BTreeSet so the fill order at one price is lowest ticket id first.
//
// ============================================================================

use crate::{Amount, MarketId, OptionId, TicketId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// All listed tickets at one ask price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Amount,
    pub tickets: BTreeSet<TicketId>,
}

impl PriceLevel {
    pub fn new(price: Amount) -> Self {
        Self {
            price,
            tickets: BTreeSet::new(),
        }
    }

    pub fn quantity(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

/// Ask side of one (market, option) book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSide {
    pub levels: BTreeMap<Amount, PriceLevel>,
}

impl BookSide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, price: Amount, ticket_id: TicketId) {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .tickets
            .insert(ticket_id);
    }

    pub fn remove(&mut self, price: Amount, ticket_id: TicketId) {
        if let Some(level) = self.levels.get_mut(&price) {
            level.tickets.remove(&ticket_id);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn best_price(&self) -> Option<Amount> {
        self.levels.keys().next().copied()
    }

    /// Lowest priced ticket; lowest ticket id among equal prices.
    pub fn best(&self) -> Option<(Amount, TicketId)> {
        let level = self.levels.values().next()?;
        let ticket_id = level.tickets.iter().next()?;
        Some((level.price, *ticket_id))
    }

    pub fn depth(&self) -> Vec<Level> {
        self.levels
            .values()
            .map(|level| Level {
                price: level.price,
                quantity: level.quantity(),
                ticket_ids: level.tickets.iter().copied().collect(),
            })
            .collect()
    }
}

// ============================================================================
// SNAPSHOT TYPES (for API responses)
// ============================================================================

/// A single price level in the order book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Level {
    pub price: Amount,
    pub quantity: usize,
    pub ticket_ids: Vec<TicketId>,
}

/// Snapshot of the resale book of one market option
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderBookSnapshot {
    pub market_id: MarketId,
    pub option_id: OptionId,
    /// Ascending by price
    pub levels: Vec<Level>,
    pub best_ask: Option<Amount>,
    pub total_quantity: usize,
    /// False once the market resolved; listings stay visible but cannot fill
    pub fillable: bool,
}

impl OrderBookSnapshot {
    pub fn new(market_id: MarketId, option_id: OptionId, side: Option<&BookSide>, fillable: bool) -> Self {
        let levels = side.map(BookSide::depth).unwrap_or_default();
        Self {
            market_id,
            option_id,
            best_ask: levels.first().map(|l| l.price),
            total_quantity: levels.iter().map(|l| l.quantity).sum(),
            levels,
            fillable,
        }
    }
}
