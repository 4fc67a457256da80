// ============================================================================
// Payouts - claims against a resolved market
// ============================================================================
//
// Every winning ticket is worth the same amount:
//
//     payout_per_ticket = floor(prize_pool / winning_ticket_count)
//
// The winning count is fixed at resolution because issuance stops once a
// market resolves. The remainder of the division (dust) stays in custody
// until an admin sweeps it; when nobody holds a winning ticket the whole pool
// is residual.
//
// ============================================================================

use crate::error::LedgerError;
use crate::market_resolve::{Market, MarketRegistry};
use crate::registry::TicketRegistry;
use crate::tickets::TicketIssuer;
use crate::{Amount, MarketId, TicketId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-ticket payout for a pool split across `winners` tickets.
pub fn payout_per_ticket(prize_pool: Amount, winners: u64) -> Amount {
    if winners == 0 {
        0
    } else {
        prize_pool / Amount::from(winners)
    }
}

/// Part of the pool never paid to winners.
pub fn residual(prize_pool: Amount, winners: u64) -> Amount {
    prize_pool - payout_per_ticket(prize_pool, winners) * Amount::from(winners)
}

/// Settlement figures of a resolved market.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settlement {
    pub winners: u64,
    pub payout_per_ticket: Amount,
    pub residual: Amount,
}

impl Settlement {
    /// None while the market is open.
    pub fn of(market: &Market) -> Option<Self> {
        let winners = market.winning_ticket_count()?;
        Some(Self {
            winners,
            payout_per_ticket: payout_per_ticket(market.prize_pool, winners),
            residual: residual(market.prize_pool, winners),
        })
    }
}

/// Tracks residual sweeps. Claimed flags live on the tickets themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutEngine {
    swept: BTreeMap<MarketId, Amount>,
}

impl PayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a claim and return the amount it pays.
    pub fn check_claim<R: TicketRegistry>(
        &self,
        registry: &R,
        tickets: &TicketIssuer,
        markets: &MarketRegistry,
        ticket_id: TicketId,
        claimant: &str,
    ) -> Result<Amount, LedgerError> {
        let ticket = tickets.get(ticket_id)?;
        let market = markets.get(ticket.market_id)?;
        let winning_option = market
            .winning_option
            .ok_or(LedgerError::MarketNotResolved(market.id))?;

        if registry.owner_of(ticket_id).as_deref() != Some(claimant) {
            return Err(LedgerError::NotOwner {
                ticket_id,
                principal: claimant.to_string(),
            });
        }
        if ticket.option_id != winning_option {
            return Err(LedgerError::NotWinningOption {
                ticket_id,
                option_id: ticket.option_id,
                winning_option,
            });
        }
        if ticket.claimed {
            return Err(LedgerError::AlreadyClaimed(ticket_id));
        }

        let settlement = Settlement::of(market).ok_or(LedgerError::MarketNotResolved(market.id))?;
        Ok(settlement.payout_per_ticket)
    }

    pub fn settlement(&self, markets: &MarketRegistry, market_id: MarketId) -> Result<Settlement, LedgerError> {
        let market = markets.get(market_id)?;
        Settlement::of(market).ok_or(LedgerError::MarketNotResolved(market_id))
    }

    /// Validate a residual sweep and return the amount it moves.
    pub fn check_sweep(&self, markets: &MarketRegistry, market_id: MarketId) -> Result<Amount, LedgerError> {
        let settlement = self.settlement(markets, market_id)?;
        if self.swept.contains_key(&market_id) {
            return Err(LedgerError::AlreadySwept(market_id));
        }
        Ok(settlement.residual)
    }

    pub(crate) fn record_sweep(&mut self, market_id: MarketId, amount: Amount) {
        self.swept.insert(market_id, amount);
    }

    pub fn swept(&self, market_id: MarketId) -> Option<Amount> {
        self.swept.get(&market_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_resolve::NewMarket;
    use crate::registry::InMemoryTicketRegistry;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_payout_math() {
        assert_eq!(payout_per_ticket(1000, 3), 333);
        assert_eq!(residual(1000, 3), 1);
        assert_eq!(payout_per_ticket(1000, 0), 0);
        assert_eq!(residual(1000, 0), 1000);
        assert_eq!(residual(0, 5), 0);
    }

    #[test]
    fn test_payout_never_exceeds_pool() {
        for pool in [0u128, 1, 7, 999, 1000, 123_456_789] {
            for winners in 1u64..50 {
                let per = payout_per_ticket(pool, winners);
                let rest = residual(pool, winners);
                assert!(per * Amount::from(winners) <= pool);
                assert!(rest < Amount::from(winners));
                assert_eq!(per * Amount::from(winners) + rest, pool);
            }
        }
    }

    fn resolved_fixture() -> (MarketRegistry, TicketIssuer, InMemoryTicketRegistry) {
        let mut markets = MarketRegistry::new();
        markets
            .insert(
                NewMarket {
                    title: "Coin flip".into(),
                    description: String::new(),
                    oracle: String::new(),
                    resolve_at: NOW + 60,
                    option_labels: vec!["Heads".into(), "Tails".into()],
                    option_prices: vec![5, 5],
                    prize_pool: 1000,
                },
                "root",
                NOW,
            )
            .unwrap();
        let mut tickets = TicketIssuer::new();
        let mut registry = InMemoryTicketRegistry::new();
        for (owner, option) in [("alice", 0), ("bob", 0), ("carol", 1)] {
            let id = registry.mint(owner).unwrap();
            tickets.record(&mut markets, id, 1, option, owner, NOW).unwrap();
        }
        (markets, tickets, registry)
    }

    #[test]
    fn test_check_claim_rules() {
        let (mut markets, mut tickets, registry) = resolved_fixture();
        let engine = PayoutEngine::new();

        assert_eq!(
            engine.check_claim(&registry, &tickets, &markets, 1, "alice"),
            Err(LedgerError::MarketNotResolved(1))
        );
        markets.resolve(1, 0, NOW).unwrap();

        assert_eq!(engine.check_claim(&registry, &tickets, &markets, 1, "alice"), Ok(500));
        assert_eq!(engine.check_claim(&registry, &tickets, &markets, 1, "bob").unwrap_err().kind(), "NotOwner");
        assert_eq!(engine.check_claim(&registry, &tickets, &markets, 3, "carol").unwrap_err().kind(), "NotWinningOption");
        assert_eq!(engine.check_claim(&registry, &tickets, &markets, 9, "carol"), Err(LedgerError::TicketNotFound(9)));

        tickets.mark_claimed(1).unwrap();
        assert_eq!(
            engine.check_claim(&registry, &tickets, &markets, 1, "alice"),
            Err(LedgerError::AlreadyClaimed(1))
        );
    }

    #[test]
    fn test_sweep_once() {
        let (mut markets, _tickets, _registry) = resolved_fixture();
        let mut engine = PayoutEngine::new();
        assert_eq!(engine.check_sweep(&markets, 1), Err(LedgerError::MarketNotResolved(1)));

        markets.resolve(1, 1, NOW).unwrap();
        assert_eq!(engine.check_sweep(&markets, 1), Ok(0));
        engine.record_sweep(1, 0);
        assert_eq!(engine.check_sweep(&markets, 1), Err(LedgerError::AlreadySwept(1)));
        assert_eq!(engine.swept(1), Some(0));
    }
}
