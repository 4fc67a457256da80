/// Settlement ledger facade
///
/// Owns every component (roles, markets, tickets, resale listings, payouts)
/// and both collaborators (token ledger, ticket registry). All writes go
/// through here and follow the same shape:
///
/// - validate against local state, no side effects on failure
/// - stage the fund movement with the token ledger
/// - perform the ticket registry step, reversing the funds if it fails
/// - apply the local state change, which can no longer fail
/// - append an activity event
///
/// Writes take `&mut self`; wrapping the ledger in `SharedLedger` serializes
/// them while readers see a consistent snapshot.

use crate::access::{AccessControl, Role};
use crate::activity::{ActivityLog, EventKind, LedgerEvent};
use crate::error::LedgerError;
use crate::market_resolve::{with_compensation, Market, MarketOption, MarketRegistry, NewMarket, StagedTransfer};
use crate::orderbook::{Fill, Listing, Marketplace, OrderBookSnapshot};
use crate::payout::{PayoutEngine, Settlement};
use crate::registry::{InMemoryTicketRegistry, TicketRegistry};
use crate::tickets::{Ticket, TicketIssuer};
use crate::token::{InMemoryToken, TokenLedger};
use crate::{Amount, MarketId, OptionId, TicketId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The ledger behind a single reader/writer lock.
pub type SharedLedger<T = InMemoryToken, R = InMemoryTicketRegistry> = Arc<RwLock<Ledger<T, R>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger<T = InMemoryToken, R = InMemoryTicketRegistry> {
    /// Principal holding escrowed prize pools and ticket proceeds
    custody: String,
    access: AccessControl,
    markets: MarketRegistry,
    tickets: TicketIssuer,
    marketplace: Marketplace,
    payouts: PayoutEngine,
    token: T,
    registry: R,
    activity: ActivityLog,

    /// Set on the scratch copy used by `simulate`
    #[serde(skip)]
    simulating: bool,
}

impl Ledger {
    /// Ledger backed by the in-memory collaborators.
    pub fn in_memory(admin: &str, custody: &str) -> Self {
        Self::new(admin, custody, InMemoryToken::new(), InMemoryTicketRegistry::new())
    }
}

impl<T: TokenLedger, R: TicketRegistry> Ledger<T, R> {
    /// Bootstrap: `admin` gets ADMIN, the custody principal gets MINTER.
    pub fn new(admin: &str, custody: &str, token: T, registry: R) -> Self {
        let mut access = AccessControl::with_admin(admin);
        access.insert(Role::Minter, custody);
        info!(admin, custody, "ledger initialized");

        Self {
            custody: custody.to_string(),
            access,
            markets: MarketRegistry::new(),
            tickets: TicketIssuer::new(),
            marketplace: Marketplace::new(),
            payouts: PayoutEngine::new(),
            token,
            registry,
            activity: ActivityLog::new(),
            simulating: false,
        }
    }

    /// Run `op` against a throwaway copy of the ledger. The result is what the
    /// committed call would return; the real state is untouched.
    pub fn simulate<Out, E, F>(&self, op: F) -> Result<Out, E>
    where
        Self: Clone,
        F: FnOnce(&mut Self) -> Result<Out, E>,
    {
        let mut scratch = self.clone();
        scratch.simulating = true;
        op(&mut scratch)
    }

    /// Rebuild derived indexes after the ledger was deserialized.
    pub fn rebuild_index(&mut self) {
        self.marketplace.rebuild_index();
    }

    fn run<Out, F>(&mut self, op: &'static str, principal: &str, f: F) -> Result<Out, LedgerError>
    where
        F: FnOnce(&mut Self) -> Result<Out, LedgerError>,
    {
        let result = f(self);
        if let Err(err) = &result {
            if self.simulating {
                debug!(op, principal, error = %err, "simulated write rejected");
            } else {
                warn!(op, principal, kind = err.kind(), "write rejected: {}", err);
            }
        }
        result
    }

    /// Custody only ever moves funds on the ledger's behalf.
    fn reject_custody(&self, principal: &str) -> Result<(), LedgerError> {
        if principal == self.custody {
            return Err(LedgerError::CustodyCaller(principal.to_string()));
        }
        Ok(())
    }

    fn record(&mut self, event: LedgerEvent) {
        if self.simulating {
            return;
        }
        info!(kind = ?event.kind, principal = %event.principal, "{}", event.description);
        self.activity.record(event);
    }

    // ========================================================================
    // ROLES
    // ========================================================================

    pub fn grant_role(&mut self, caller: &str, role: Role, principal: &str) -> Result<bool, LedgerError> {
        self.run("grant_role", caller, |ledger| {
            let added = ledger.access.grant_role(caller, role, principal)?;
            if added {
                ledger.record(
                    LedgerEvent::new(EventKind::RoleGranted, caller, now(), format!("granted {} to {}", role, principal))
                        .counterparty(principal),
                );
            }
            Ok(added)
        })
    }

    pub fn revoke_role(&mut self, caller: &str, role: Role, principal: &str) -> Result<bool, LedgerError> {
        self.run("revoke_role", caller, |ledger| {
            let removed = ledger.access.revoke_role(caller, role, principal)?;
            if removed {
                ledger.record(
                    LedgerEvent::new(EventKind::RoleRevoked, caller, now(), format!("revoked {} from {}", role, principal))
                        .counterparty(principal),
                );
            }
            Ok(removed)
        })
    }

    // ========================================================================
    // MARKETS
    // ========================================================================

    /// Create a market and escrow its prize pool from `caller` into custody.
    pub fn create_market(&mut self, caller: &str, new: NewMarket) -> Result<MarketId, LedgerError> {
        self.run("create_market", caller, |ledger| {
            ledger.access.require(Role::Admin, caller)?;
            let now = now();
            new.validate(now)?;

            let title = new.title.clone();
            let prize_pool = new.prize_pool;
            let staged = StagedTransfer::pull(&mut ledger.token, &ledger.custody, caller, &ledger.custody, prize_pool)?;
            let markets = &mut ledger.markets;
            let market_id = with_compensation(&mut ledger.token, staged, || markets.insert(new, caller, now))?;

            ledger.record(
                LedgerEvent::new(EventKind::MarketCreated, caller, now, format!("created market {}: {}", market_id, title))
                    .market(market_id)
                    .amount(prize_pool),
            );
            Ok(market_id)
        })
    }

    /// Declare the winning option. Irreversible.
    pub fn resolve_market(&mut self, caller: &str, market_id: MarketId, winning_option: OptionId) -> Result<Market, LedgerError> {
        self.run("resolve_market", caller, |ledger| {
            ledger.access.require(Role::Admin, caller)?;
            let now = now();
            let market = ledger.markets.resolve(market_id, winning_option, now)?.clone();

            let winners = market.winning_ticket_count().unwrap_or(0);
            ledger.record(
                LedgerEvent::new(
                    EventKind::MarketResolved,
                    caller,
                    now,
                    format!("resolved market {} to option {} ({} winning tickets)", market_id, winning_option, winners),
                )
                .market(market_id)
                .option(winning_option),
            );
            Ok(market)
        })
    }

    // ========================================================================
    // PRIMARY ISSUANCE
    // ========================================================================

    /// Sell a new ticket on an open option at its unit price.
    pub fn issue_ticket(&mut self, buyer: &str, market_id: MarketId, option_id: OptionId) -> Result<TicketId, LedgerError> {
        self.run("issue_ticket", buyer, |ledger| {
            ledger.reject_custody(buyer)?;
            let price = ledger.tickets.check_issue(&ledger.markets, market_id, option_id)?;
            if !ledger.access.has_role(Role::Minter, &ledger.custody) {
                return Err(LedgerError::CollaboratorFailure(format!(
                    "custody {} may not mint tickets",
                    ledger.custody
                )));
            }
            let now = now();

            let staged = StagedTransfer::pull(&mut ledger.token, &ledger.custody, buyer, &ledger.custody, price)?;
            let registry = &mut ledger.registry;
            let tickets = &mut ledger.tickets;
            let markets = &mut ledger.markets;
            let ticket_id = with_compensation(&mut ledger.token, staged, || {
                let ticket_id = registry.mint(buyer)?;
                tickets
                    .record(markets, ticket_id, market_id, option_id, buyer, now)
                    .map(|ticket| ticket.id)
            })?;

            ledger.record(
                LedgerEvent::new(EventKind::TicketIssued, buyer, now, format!("bought ticket {} for {}", ticket_id, price))
                    .market(market_id)
                    .option(option_id)
                    .ticket(ticket_id)
                    .amount(price),
            );
            Ok(ticket_id)
        })
    }

    // ========================================================================
    // RESALE
    // ========================================================================

    pub fn list_ticket(&mut self, seller: &str, ticket_id: TicketId, ask_price: Amount) -> Result<Listing, LedgerError> {
        self.run("list_ticket", seller, |ledger| {
            ledger.reject_custody(seller)?;
            let ticket = ledger.marketplace.check_list(
                &ledger.registry,
                &ledger.tickets,
                &ledger.markets,
                ticket_id,
                seller,
                ask_price,
            )?;
            let now = now();
            let listing = ledger.marketplace.insert(ticket, seller, ask_price, now).clone();

            ledger.record(
                LedgerEvent::new(EventKind::Listed, seller, now, format!("listed ticket {} at {}", ticket_id, ask_price))
                    .market(listing.market_id)
                    .option(listing.option_id)
                    .ticket(ticket_id)
                    .amount(ask_price),
            );
            Ok(listing)
        })
    }

    pub fn cancel_listing(&mut self, caller: &str, ticket_id: TicketId) -> Result<Listing, LedgerError> {
        self.run("cancel_listing", caller, |ledger| {
            ledger.marketplace.check_cancel(ticket_id, caller)?;
            let listing = ledger
                .marketplace
                .remove(ticket_id)
                .ok_or(LedgerError::NoListing(ticket_id))?;

            ledger.record(
                LedgerEvent::new(EventKind::ListingCancelled, caller, now(), format!("cancelled listing of ticket {}", ticket_id))
                    .market(listing.market_id)
                    .option(listing.option_id)
                    .ticket(ticket_id),
            );
            Ok(listing)
        })
    }

    /// Buy one specific listed ticket at its ask price.
    pub fn buy_listed(&mut self, buyer: &str, ticket_id: TicketId) -> Result<Fill, LedgerError> {
        self.run("buy_listed", buyer, |ledger| {
            ledger.reject_custody(buyer)?;
            ledger.fill(buyer, ticket_id)
        })
    }

    /// Buy the cheapest listing of an option; lowest ticket id wins a tie.
    pub fn buy_at_best_price(&mut self, buyer: &str, market_id: MarketId, option_id: OptionId) -> Result<Fill, LedgerError> {
        self.run("buy_at_best_price", buyer, |ledger| {
            ledger.reject_custody(buyer)?;
            let ticket_id = ledger.marketplace.best_listing(&ledger.markets, market_id, option_id)?;
            ledger.fill(buyer, ticket_id)
        })
    }

    fn fill(&mut self, buyer: &str, ticket_id: TicketId) -> Result<Fill, LedgerError> {
        let listing = self
            .marketplace
            .check_buy(&self.registry, &self.markets, ticket_id)?
            .clone();
        let now = now();

        let staged = StagedTransfer::pull(&mut self.token, &self.custody, buyer, &listing.seller, listing.ask_price)?;
        let registry = &mut self.registry;
        let seller = listing.seller.as_str();
        with_compensation(&mut self.token, staged, || {
            registry.transfer(ticket_id, seller, buyer).map_err(LedgerError::from)
        })?;
        self.marketplace.remove(ticket_id);

        let fill = Fill::new(listing, buyer, now);
        self.record(
            LedgerEvent::new(
                EventKind::ResaleFilled,
                buyer,
                now,
                format!("bought ticket {} from {} for {}", ticket_id, fill.seller, fill.price),
            )
            .counterparty(&fill.seller)
            .market(fill.market_id)
            .option(fill.option_id)
            .ticket(ticket_id)
            .amount(fill.price),
        );
        Ok(fill)
    }

    // ========================================================================
    // PAYOUTS
    // ========================================================================

    /// Pay one winning ticket out of custody. Returns the amount paid.
    pub fn claim_payout(&mut self, claimant: &str, ticket_id: TicketId) -> Result<Amount, LedgerError> {
        self.run("claim_payout", claimant, |ledger| {
            ledger.reject_custody(claimant)?;
            let amount = ledger
                .payouts
                .check_claim(&ledger.registry, &ledger.tickets, &ledger.markets, ticket_id, claimant)?;
            ledger.token.transfer(&ledger.custody, claimant, amount)?;
            ledger.tickets.mark_claimed(ticket_id)?;

            let market_id = ledger.tickets.get(ticket_id)?.market_id;
            ledger.record(
                LedgerEvent::new(EventKind::PayoutClaimed, claimant, now(), format!("claimed {} for ticket {}", amount, ticket_id))
                    .market(market_id)
                    .ticket(ticket_id)
                    .amount(amount),
            );
            Ok(amount)
        })
    }

    /// Move the unpayable remainder of a resolved market's pool to `recipient`.
    pub fn sweep_residual(&mut self, caller: &str, market_id: MarketId, recipient: &str) -> Result<Amount, LedgerError> {
        self.run("sweep_residual", caller, |ledger| {
            ledger.access.require(Role::Admin, caller)?;
            let amount = ledger.payouts.check_sweep(&ledger.markets, market_id)?;
            ledger.token.transfer(&ledger.custody, recipient, amount)?;
            ledger.payouts.record_sweep(market_id, amount);

            ledger.record(
                LedgerEvent::new(EventKind::ResidualSwept, caller, now(), format!("swept {} from market {}", amount, market_id))
                    .counterparty(recipient)
                    .market(market_id)
                    .amount(amount),
            );
            Ok(amount)
        })
    }

    // ========================================================================
    // TOKEN PASS-THROUGH
    // ========================================================================

    /// Let the ledger move up to `amount` of `owner`'s funds.
    pub fn approve(&mut self, owner: &str, amount: Amount) -> Result<(), LedgerError> {
        self.run("approve", owner, |ledger| {
            ledger.reject_custody(owner)?;
            ledger.token.approve(owner, &ledger.custody, amount)?;
            ledger.record(
                LedgerEvent::new(EventKind::Approval, owner, now(), format!("approved {} for the ledger", amount))
                    .amount(amount),
            );
            Ok(())
        })
    }

    /// Fund an account. Admin only.
    pub fn mint_tokens(&mut self, caller: &str, to: &str, amount: Amount) -> Result<(), LedgerError> {
        self.run("mint_tokens", caller, |ledger| {
            ledger.access.require(Role::Admin, caller)?;
            ledger.token.mint(to, amount)?;
            ledger.record(
                LedgerEvent::new(EventKind::TokensMinted, caller, now(), format!("minted {} to {}", amount, to))
                    .counterparty(to)
                    .amount(amount),
            );
            Ok(())
        })
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn custody(&self) -> &str {
        &self.custody
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn balance_of(&self, principal: &str) -> Amount {
        self.token.balance_of(principal)
    }

    /// Remaining allowance `owner` granted the ledger.
    pub fn allowance(&self, owner: &str) -> Amount {
        self.token.allowance(owner, &self.custody)
    }

    pub fn market_count(&self) -> u64 {
        self.markets.count()
    }

    pub fn market(&self, market_id: MarketId) -> Result<&Market, LedgerError> {
        self.markets.get(market_id)
    }

    pub fn options(&self, market_id: MarketId) -> Result<&[MarketOption], LedgerError> {
        self.markets.options(market_id)
    }

    pub fn market_view(&self, market_id: MarketId) -> Result<MarketView, LedgerError> {
        let market = self.markets.get(market_id)?;
        Ok(MarketView::new(market, self.payouts.swept(market_id)))
    }

    pub fn market_views(&self) -> Vec<MarketView> {
        self.markets
            .iter()
            .map(|market| MarketView::new(market, self.payouts.swept(market.id)))
            .collect()
    }

    pub fn settlement(&self, market_id: MarketId) -> Result<Settlement, LedgerError> {
        self.payouts.settlement(&self.markets, market_id)
    }

    pub fn order_book(&self, market_id: MarketId, option_id: OptionId) -> Result<OrderBookSnapshot, LedgerError> {
        self.marketplace.order_book(&self.markets, market_id, option_id)
    }

    /// Listing a best-price purchase of this option would fill.
    pub fn best_listing(&self, market_id: MarketId, option_id: OptionId) -> Result<&Listing, LedgerError> {
        let ticket_id = self.marketplace.best_listing(&self.markets, market_id, option_id)?;
        self.listing(ticket_id)
    }

    pub fn listing(&self, ticket_id: TicketId) -> Result<&Listing, LedgerError> {
        self.marketplace
            .listing(ticket_id)
            .ok_or(LedgerError::NoListing(ticket_id))
    }

    /// Every active listing with its market context.
    pub fn listings(&self) -> Vec<ListingView> {
        self.marketplace
            .iter()
            .filter_map(|listing| {
                let market = self.markets.get(listing.market_id).ok()?;
                let option = market.option(listing.option_id).ok()?;
                Some(ListingView {
                    listing: listing.clone(),
                    market_title: market.title.clone(),
                    option_label: option.label.clone(),
                    fillable: market.is_open(),
                })
            })
            .collect()
    }

    pub fn ticket(&self, ticket_id: TicketId) -> Result<TicketView, LedgerError> {
        let ticket = self.tickets.get(ticket_id)?;
        self.ticket_view(ticket)
    }

    /// Tickets currently held by `owner`, ascending by id.
    pub fn tickets_of(&self, owner: &str) -> Vec<TicketView> {
        self.registry
            .tokens_of_owner(owner)
            .into_iter()
            .filter_map(|id| self.tickets.get(id).ok())
            .filter_map(|ticket| self.ticket_view(ticket).ok())
            .collect()
    }

    /// Winning tickets of a resolved market held by `owner`, claimed or not.
    pub fn winning_tickets(&self, market_id: MarketId, owner: &str) -> Result<Vec<TicketView>, LedgerError> {
        let market = self.markets.get(market_id)?;
        let winning_option = market
            .winning_option
            .ok_or(LedgerError::MarketNotResolved(market_id))?;
        Ok(self
            .tickets_of(owner)
            .into_iter()
            .filter(|view| view.ticket.market_id == market_id && view.ticket.option_id == winning_option)
            .collect())
    }

    pub fn activity(&self, limit: usize) -> Vec<LedgerEvent> {
        self.activity.recent(limit)
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    fn ticket_view(&self, ticket: &Ticket) -> Result<TicketView, LedgerError> {
        let market = self.markets.get(ticket.market_id)?;
        let option = market.option(ticket.option_id)?;
        let payout = match market.winning_option {
            Some(winner) if winner == ticket.option_id => Settlement::of(market).map(|s| s.payout_per_ticket),
            Some(_) => Some(0),
            None => None,
        };
        Ok(TicketView {
            ticket: ticket.clone(),
            owner: self.registry.owner_of(ticket.id),
            market_title: market.title.clone(),
            option_label: option.label.clone(),
            market_open: market.is_open(),
            listing: self.marketplace.listing(ticket.id).cloned(),
            payout,
        })
    }
}

// ============================================================================
// VIEWS
// ============================================================================

/// A market with its derived settlement figures.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MarketView {
    #[serde(flatten)]
    pub market: Market,
    pub total_tickets_sold: u64,
    /// Winning ticket count, once resolved
    pub winners: Option<u64>,
    pub payout_per_ticket: Option<Amount>,
    pub residual: Option<Amount>,
    pub residual_swept: bool,
}

impl MarketView {
    fn new(market: &Market, swept: Option<Amount>) -> Self {
        let settlement = Settlement::of(market);
        Self {
            market: market.clone(),
            total_tickets_sold: market.total_tickets_sold(),
            winners: settlement.map(|s| s.winners),
            payout_per_ticket: settlement.map(|s| s.payout_per_ticket),
            residual: settlement.map(|s| s.residual),
            residual_swept: swept.is_some(),
        }
    }
}

/// A ticket joined with its owner, market and listing state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub owner: Option<String>,
    pub market_title: String,
    pub option_label: String,
    pub market_open: bool,
    pub listing: Option<Listing>,
    /// What a claim pays once resolved (0 for losing options)
    pub payout: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    pub market_title: String,
    pub option_label: String,
    pub fillable: bool,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Current unix time in seconds.
pub fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: &str = "root";
    const CUSTODY: &str = "ledger:custody";

    fn new_market(prize_pool: Amount) -> NewMarket {
        NewMarket {
            title: "Who wins the derby?".into(),
            description: String::new(),
            oracle: "sports-desk".into(),
            resolve_at: now() + 3_600,
            option_labels: vec!["Home".into(), "Away".into()],
            option_prices: vec![5, 5],
            prize_pool,
        }
    }

    fn funded_ledger() -> Ledger {
        let mut ledger = Ledger::in_memory(ADMIN, CUSTODY);
        for who in [ADMIN, "alice", "bob"] {
            ledger.mint_tokens(ADMIN, who, 10_000).unwrap();
            ledger.approve(who, 10_000).unwrap();
        }
        ledger
    }

    #[test]
    fn test_bootstrap_roles() {
        let ledger = Ledger::in_memory(ADMIN, CUSTODY);
        assert!(ledger.access().has_role(Role::Admin, ADMIN));
        assert!(ledger.access().has_role(Role::Minter, CUSTODY));
        assert!(!ledger.access().has_role(Role::Admin, CUSTODY));
    }

    #[test]
    fn test_create_market_escrows_pool() {
        let mut ledger = funded_ledger();
        let id = ledger.create_market(ADMIN, new_market(1_000)).unwrap();

        assert_eq!(id, 1);
        assert_eq!(ledger.balance_of(CUSTODY), 1_000);
        assert_eq!(ledger.balance_of(ADMIN), 9_000);
        assert_eq!(ledger.allowance(ADMIN), 9_000);
    }

    #[test]
    fn test_create_market_requires_admin() {
        let mut ledger = funded_ledger();
        let err = ledger.create_market("alice", new_market(0)).unwrap_err();
        assert_eq!(err.kind(), "Unauthorized");
        assert_eq!(ledger.market_count(), 0);
    }

    #[test]
    fn test_unfunded_pool_leaves_no_market() {
        let mut ledger = Ledger::in_memory(ADMIN, CUSTODY);
        let err = ledger.create_market(ADMIN, new_market(50)).unwrap_err();
        assert_eq!(err.kind(), "InsufficientAllowance");
        assert_eq!(ledger.market_count(), 0);

        ledger.mint_tokens(ADMIN, ADMIN, 100).unwrap();
        ledger.approve(ADMIN, 100).unwrap();
        assert_eq!(ledger.create_market(ADMIN, new_market(50)).unwrap(), 1);
    }

    #[test]
    fn test_issue_moves_price_into_custody() {
        let mut ledger = funded_ledger();
        let market_id = ledger.create_market(ADMIN, new_market(0)).unwrap();
        let ticket_id = ledger.issue_ticket("alice", market_id, 1).unwrap();

        assert_eq!(ledger.balance_of("alice"), 9_995);
        assert_eq!(ledger.balance_of(CUSTODY), 5);
        assert_eq!(ledger.registry().owner_of(ticket_id).as_deref(), Some("alice"));
        assert_eq!(ledger.options(market_id).unwrap()[1].tickets_sold, 1);
    }

    #[test]
    fn test_issue_without_minter_role_fails_cleanly() {
        let mut ledger = funded_ledger();
        let market_id = ledger.create_market(ADMIN, new_market(0)).unwrap();
        ledger.revoke_role(ADMIN, Role::Minter, CUSTODY).unwrap();

        let err = ledger.issue_ticket("alice", market_id, 0).unwrap_err();
        assert_eq!(err.kind(), "CollaboratorFailure");
        assert_eq!(ledger.balance_of("alice"), 10_000);
        assert_eq!(ledger.ticket_count(), 0);
    }

    #[test]
    fn test_simulate_leaves_state_untouched() {
        let mut ledger = funded_ledger();
        let market_id = ledger.create_market(ADMIN, new_market(0)).unwrap();
        let events = ledger.activity(usize::MAX).len();

        let simulated = ledger.simulate(|l| l.issue_ticket("alice", market_id, 0)).unwrap();
        assert_eq!(ledger.ticket_count(), 0);
        assert_eq!(ledger.balance_of("alice"), 10_000);
        assert_eq!(ledger.activity(usize::MAX).len(), events);

        let committed = ledger.issue_ticket("alice", market_id, 0).unwrap();
        assert_eq!(simulated, committed);
    }

    #[test]
    fn test_ticket_view_tracks_listing_and_payout() {
        let mut ledger = funded_ledger();
        let market_id = ledger.create_market(ADMIN, new_market(100)).unwrap();
        let ticket_id = ledger.issue_ticket("alice", market_id, 0).unwrap();
        ledger.list_ticket("alice", ticket_id, 9).unwrap();

        let view = ledger.ticket(ticket_id).unwrap();
        assert_eq!(view.owner.as_deref(), Some("alice"));
        assert_eq!(view.listing.as_ref().map(|l| l.ask_price), Some(9));
        assert_eq!(view.payout, None);

        ledger.resolve_market(ADMIN, market_id, 0).unwrap();
        assert_eq!(ledger.ticket(ticket_id).unwrap().payout, Some(100));
        assert_eq!(ledger.winning_tickets(market_id, "alice").unwrap().len(), 1);
        assert!(ledger.winning_tickets(market_id, "bob").unwrap().is_empty());
    }

    #[test]
    fn test_activity_records_commits_only() {
        let mut ledger = funded_ledger();
        let market_id = ledger.create_market(ADMIN, new_market(0)).unwrap();
        assert!(ledger.issue_ticket("alice", market_id, 7).is_err());

        let latest = &ledger.activity(1)[0];
        assert_eq!(latest.kind, EventKind::MarketCreated);
        assert_eq!(latest.market_id, Some(market_id));
    }
}
