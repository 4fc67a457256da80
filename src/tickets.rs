// ============================================================================
// Tickets - primary issuance
// ============================================================================
//
// A ticket is a numbered claim on one option of one market. Tickets are
// created only by a primary purchase; resale moves ownership in the ticket
// registry but never creates or destroys a ticket here.
//
// ============================================================================

use crate::error::LedgerError;
use crate::market_resolve::MarketRegistry;
use crate::{Amount, MarketId, OptionId, TicketId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticket {
    /// Id assigned by the ticket registry at mint time
    pub id: TicketId,
    pub market_id: MarketId,
    pub option_id: OptionId,
    /// Buyer of the primary sale (current owner lives in the registry)
    pub original_buyer: String,
    /// Price paid at issuance
    pub price_paid: Amount,
    /// Set once by a successful payout claim
    pub claimed: bool,
    pub issued_at: u64,
}

/// Ticket records keyed by ticket id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketIssuer {
    tickets: BTreeMap<TicketId, Ticket>,
}

impl TicketIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticket_id: TicketId) -> Result<&Ticket, LedgerError> {
        self.tickets
            .get(&ticket_id)
            .ok_or(LedgerError::TicketNotFound(ticket_id))
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Validate a primary purchase and quote its price.
    pub fn check_issue(
        &self,
        markets: &MarketRegistry,
        market_id: MarketId,
        option_id: OptionId,
    ) -> Result<Amount, LedgerError> {
        markets.check_sale(market_id, option_id)
    }

    /// Record a freshly minted ticket and count the sale on its option.
    pub(crate) fn record(
        &mut self,
        markets: &mut MarketRegistry,
        ticket_id: TicketId,
        market_id: MarketId,
        option_id: OptionId,
        buyer: &str,
        now: u64,
    ) -> Result<&Ticket, LedgerError> {
        let price_paid = self.check_issue(markets, market_id, option_id)?;
        markets.record_sale(market_id, option_id)?;

        let ticket = Ticket {
            id: ticket_id,
            market_id,
            option_id,
            original_buyer: buyer.to_string(),
            price_paid,
            claimed: false,
            issued_at: now,
        };
        Ok(self.tickets.entry(ticket_id).or_insert(ticket))
    }

    /// Flip the claimed flag. Fails if it is already set.
    pub(crate) fn mark_claimed(&mut self, ticket_id: TicketId) -> Result<(), LedgerError> {
        let ticket = self
            .tickets
            .get_mut(&ticket_id)
            .ok_or(LedgerError::TicketNotFound(ticket_id))?;
        if ticket.claimed {
            return Err(LedgerError::AlreadyClaimed(ticket_id));
        }
        ticket.claimed = true;
        Ok(())
    }
}
