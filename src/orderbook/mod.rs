// ============================================================================
// Order Book Module - Ticket Resale Marketplace
// ============================================================================
//
// Ticket holders list tickets for resale at an ask price. Listings are
// indexed per (market, option) into price levels so buyers can fill at the
// best price.
//
// Rules:
//   - At most one active listing per ticket
//   - Listings and fills are only accepted while the market is open
//   - Listings of a resolved market stay visible but never fill
//   - Best price first; lowest ticket id first inside a price level
//
// ============================================================================

pub mod matching;
pub mod orders;

pub use matching::*;
pub use orders::*;

use crate::error::LedgerError;
use crate::market_resolve::MarketRegistry;
use crate::registry::TicketRegistry;
use crate::tickets::{Ticket, TicketIssuer};
use crate::{Amount, MarketId, OptionId, TicketId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Active listings plus the derived per-option ask books.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Marketplace {
    listings: BTreeMap<TicketId, Listing>,

    /// Derived from `listings`; rebuilt after deserialization
    #[serde(skip)]
    books: BTreeMap<(MarketId, OptionId), BookSide>,
}

impl Marketplace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing(&self, ticket_id: TicketId) -> Option<&Listing> {
        self.listings.get(&ticket_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Validate a new listing and return the ticket it refers to.
    pub fn check_list<'a, R: TicketRegistry>(
        &self,
        registry: &R,
        tickets: &'a TicketIssuer,
        markets: &MarketRegistry,
        ticket_id: TicketId,
        seller: &str,
        ask_price: Amount,
    ) -> Result<&'a Ticket, LedgerError> {
        if ask_price == 0 {
            return Err(LedgerError::ZeroPrice);
        }
        let ticket = tickets.get(ticket_id)?;
        if registry.owner_of(ticket_id).as_deref() != Some(seller) {
            return Err(LedgerError::NotOwner {
                ticket_id,
                principal: seller.to_string(),
            });
        }
        markets.ensure_open(ticket.market_id)?;
        if self.listings.contains_key(&ticket_id) {
            return Err(LedgerError::DuplicateListing(ticket_id));
        }
        Ok(ticket)
    }

    pub(crate) fn insert(&mut self, ticket: &Ticket, seller: &str, ask_price: Amount, now: u64) -> &Listing {
        let listing = Listing {
            ticket_id: ticket.id,
            market_id: ticket.market_id,
            option_id: ticket.option_id,
            seller: seller.to_string(),
            ask_price,
            listed_at: now,
        };
        self.books
            .entry(listing.book_key())
            .or_default()
            .add(ask_price, ticket.id);
        self.listings.entry(ticket.id).or_insert(listing)
    }

    /// Only the seller who listed may cancel.
    pub fn check_cancel(&self, ticket_id: TicketId, caller: &str) -> Result<&Listing, LedgerError> {
        let listing = self
            .listings
            .get(&ticket_id)
            .ok_or(LedgerError::NoListing(ticket_id))?;
        if listing.seller != caller {
            return Err(LedgerError::NotOwner {
                ticket_id,
                principal: caller.to_string(),
            });
        }
        Ok(listing)
    }

    /// Validate a purchase of a specific listing.
    ///
    /// A listing whose seller no longer holds the ticket is stale and is
    /// rejected before any funds move.
    pub fn check_buy<R: TicketRegistry>(
        &self,
        registry: &R,
        markets: &MarketRegistry,
        ticket_id: TicketId,
    ) -> Result<&Listing, LedgerError> {
        let listing = self
            .listings
            .get(&ticket_id)
            .ok_or(LedgerError::NoListing(ticket_id))?;
        markets.ensure_open(listing.market_id)?;
        if registry.owner_of(ticket_id).as_deref() != Some(listing.seller.as_str()) {
            return Err(LedgerError::NotOwner {
                ticket_id,
                principal: listing.seller.clone(),
            });
        }
        Ok(listing)
    }

    /// Ticket a best-price purchase would fill.
    pub fn best_listing(
        &self,
        markets: &MarketRegistry,
        market_id: MarketId,
        option_id: OptionId,
    ) -> Result<TicketId, LedgerError> {
        markets.open_option(market_id, option_id)?;
        self.books
            .get(&(market_id, option_id))
            .and_then(BookSide::best)
            .map(|(_, ticket_id)| ticket_id)
            .ok_or(LedgerError::NoListings { market_id, option_id })
    }

    /// Remove a listing (cancel or fill).
    pub(crate) fn remove(&mut self, ticket_id: TicketId) -> Option<Listing> {
        let listing = self.listings.remove(&ticket_id)?;
        let key = listing.book_key();
        if let Some(side) = self.books.get_mut(&key) {
            side.remove(listing.ask_price, ticket_id);
            if side.is_empty() {
                self.books.remove(&key);
            }
        }
        Some(listing)
    }

    pub fn order_book(
        &self,
        markets: &MarketRegistry,
        market_id: MarketId,
        option_id: OptionId,
    ) -> Result<OrderBookSnapshot, LedgerError> {
        let market = markets.get(market_id)?;
        market.option(option_id)?;
        Ok(OrderBookSnapshot::new(
            market_id,
            option_id,
            self.books.get(&(market_id, option_id)),
            market.is_open(),
        ))
    }

    /// Rebuild the ask books from the listings.
    pub fn rebuild_index(&mut self) {
        self.books.clear();
        for listing in self.listings.values() {
            self.books
                .entry(listing.book_key())
                .or_default()
                .add(listing.ask_price, listing.ticket_id);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
