/// Activity journal
///
/// Every committed write appends one `LedgerEvent`. The journal is a bounded
/// ring of recent entries served by `/activity`; it is informational and never
/// consulted by settlement logic.

use crate::{Amount, MarketId, OptionId, TicketId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept before the oldest is dropped.
pub const MAX_ACTIVITY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MarketCreated,
    MarketResolved,
    TicketIssued,
    Listed,
    ListingCancelled,
    ResaleFilled,
    PayoutClaimed,
    ResidualSwept,
    RoleGranted,
    RoleRevoked,
    TokensMinted,
    Approval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    /// Assigned by the journal, starting at 1
    pub seq: u64,
    pub kind: EventKind,
    /// Principal that performed the write
    pub principal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<MarketId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_id: Option<OptionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<TicketId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    pub timestamp: u64,
    pub description: String,
}

impl LedgerEvent {
    pub fn new(kind: EventKind, principal: &str, timestamp: u64, description: impl Into<String>) -> Self {
        Self {
            seq: 0,
            kind,
            principal: principal.to_string(),
            counterparty: None,
            market_id: None,
            option_id: None,
            ticket_id: None,
            amount: None,
            timestamp,
            description: description.into(),
        }
    }

    pub fn counterparty(mut self, principal: &str) -> Self {
        self.counterparty = Some(principal.to_string());
        self
    }

    pub fn market(mut self, market_id: MarketId) -> Self {
        self.market_id = Some(market_id);
        self
    }

    pub fn option(mut self, option_id: OptionId) -> Self {
        self.option_id = Some(option_id);
        self
    }

    pub fn ticket(mut self, ticket_id: TicketId) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    events: VecDeque<LedgerEvent>,
    /// Sequence numbers keep counting after old entries are dropped
    next_seq: u64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mut event: LedgerEvent) {
        self.next_seq += 1;
        event.seq = self.next_seq;
        self.events.push_back(event);
        if self.events.len() > MAX_ACTIVITY {
            self.events.pop_front();
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<LedgerEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_bounded() {
        let mut log = ActivityLog::new();
        for i in 0..(MAX_ACTIVITY + 5) {
            log.record(LedgerEvent::new(EventKind::TicketIssued, "alice", i as u64, "issued"));
        }
        assert_eq!(log.len(), MAX_ACTIVITY);

        let recent = log.recent(2);
        assert_eq!(recent[0].seq, (MAX_ACTIVITY + 5) as u64);
        assert_eq!(recent[1].seq, (MAX_ACTIVITY + 4) as u64);
    }

    #[test]
    fn test_event_builder() {
        let event = LedgerEvent::new(EventKind::ResaleFilled, "bob", 10, "bought ticket 7")
            .counterparty("alice")
            .market(1)
            .option(0)
            .ticket(7)
            .amount(10);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "resale_filled");
        assert_eq!(json["counterparty"], "alice");
        assert_eq!(json["ticket_id"], 7);
    }
}
