/// Ticket Market Ledger
///
/// Settlement ledger for priced-ticket prediction markets: prize pools are
/// escrowed at creation, tickets are sold per option, resold through a
/// price-level order book, and winning tickets split the pool once the market
/// resolves.

pub mod access;
pub mod activity;
pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod ledger;
pub mod market_resolve;
pub mod models;
pub mod orderbook;
pub mod payout;
pub mod registry;
pub mod routes;
pub mod tickets;
pub mod token;

/// Token amount in smallest units.
pub type Amount = u128;
pub type MarketId = u64;
/// Index of an option within its market.
pub type OptionId = usize;
pub type TicketId = u64;

pub use access::{AccessControl, Role};
pub use activity::{ActivityLog, EventKind, LedgerEvent};
pub use error::{ConfigError, LedgerError, RegistryError, SnapshotError, StartupError, TokenError};
pub use ledger::{Ledger, ListingView, MarketView, SharedLedger, TicketView};
pub use market_resolve::{Market, MarketOption, MarketStatus, NewMarket};
pub use orderbook::{Fill, Level, Listing, OrderBookSnapshot};
pub use payout::Settlement;
pub use registry::{InMemoryTicketRegistry, TicketRegistry};
pub use tickets::Ticket;
pub use token::{InMemoryToken, TokenLedger, TransferRecord};
