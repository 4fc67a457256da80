// ============================================================================
// Errors - Ticket Market Ledger
// ============================================================================
//
// Every user-visible failure cause of a ledger operation is a `LedgerError`
// variant. Collaborators report their own error types which convert into
// `LedgerError` at the boundary of the operation that called them.
//
// ============================================================================

use crate::access::Role;
use crate::{Amount, MarketId, OptionId, TicketId};
use thiserror::Error;

/// Failures surfaced by the fungible balance collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("insufficient funds: {account} has {available}, needs {required}")]
    InsufficientFunds {
        account: String,
        available: Amount,
        required: Amount,
    },

    #[error("insufficient allowance: {owner} allows {spender} {allowance}, needs {required}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        allowance: Amount,
        required: Amount,
    },

    #[error("balance overflow crediting {0}")]
    Overflow(String),

    #[error("token ledger unavailable: {0}")]
    Unavailable(String),
}

/// Failures surfaced by the ticket ownership registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("ticket {0} does not exist")]
    UnknownToken(TicketId),

    #[error("ticket {ticket_id} is not owned by {from}")]
    WrongOwner { ticket_id: TicketId, from: String },

    #[error("ticket id space exhausted")]
    Exhausted,

    #[error("ticket registry unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{principal} does not hold the {role} role")]
    Unauthorized { role: Role, principal: String },

    #[error("custody principal {0} cannot trade, approve or claim")]
    CustodyCaller(String),

    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("option {option_id} out of range for market {market_id} ({option_count} options)")]
    OptionOutOfRange {
        market_id: MarketId,
        option_id: OptionId,
        option_count: usize,
    },

    #[error("market {0} is closed")]
    MarketClosed(MarketId),

    #[error("market {0} is already resolved")]
    AlreadyResolved(MarketId),

    #[error("market {0} is not resolved yet")]
    MarketNotResolved(MarketId),

    #[error("price must be greater than zero")]
    ZeroPrice,

    #[error("invalid market schedule: {0}")]
    InvalidSchedule(String),

    #[error("{principal} does not own ticket {ticket_id}")]
    NotOwner { ticket_id: TicketId, principal: String },

    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    #[error("ticket {0} has no active listing")]
    NoListing(TicketId),

    #[error("ticket {0} is already listed")]
    DuplicateListing(TicketId),

    #[error("no listings for market {market_id} option {option_id}")]
    NoListings {
        market_id: MarketId,
        option_id: OptionId,
    },

    #[error("ticket {ticket_id} backs option {option_id}, winning option is {winning_option}")]
    NotWinningOption {
        ticket_id: TicketId,
        option_id: OptionId,
        winning_option: OptionId,
    },

    #[error("ticket {0} was already claimed")]
    AlreadyClaimed(TicketId),

    #[error("residual of market {0} was already swept")]
    AlreadySwept(MarketId),

    #[error("cannot revoke the last admin {0}")]
    LastAdmin(String),

    #[error("insufficient funds: {account} has {available}, needs {required}")]
    InsufficientFunds {
        account: String,
        available: Amount,
        required: Amount,
    },

    #[error("insufficient allowance: {owner} allows {spender} {allowance}, needs {required}")]
    InsufficientAllowance {
        owner: String,
        spender: String,
        allowance: Amount,
        required: Amount,
    },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),
}

impl LedgerError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized { .. } => "Unauthorized",
            LedgerError::CustodyCaller(_) => "CustodyCaller",
            LedgerError::MarketNotFound(_) => "MarketNotFound",
            LedgerError::OptionOutOfRange { .. } => "OptionOutOfRange",
            LedgerError::MarketClosed(_) => "MarketClosed",
            LedgerError::AlreadyResolved(_) => "AlreadyResolved",
            LedgerError::MarketNotResolved(_) => "MarketNotResolved",
            LedgerError::ZeroPrice => "ZeroPrice",
            LedgerError::InvalidSchedule(_) => "InvalidSchedule",
            LedgerError::NotOwner { .. } => "NotOwner",
            LedgerError::TicketNotFound(_) => "TicketNotFound",
            LedgerError::NoListing(_) => "NoListing",
            LedgerError::DuplicateListing(_) => "DuplicateListing",
            LedgerError::NoListings { .. } => "NoListings",
            LedgerError::NotWinningOption { .. } => "NotWinningOption",
            LedgerError::AlreadyClaimed(_) => "AlreadyClaimed",
            LedgerError::AlreadySwept(_) => "AlreadySwept",
            LedgerError::LastAdmin(_) => "LastAdmin",
            LedgerError::InsufficientFunds { .. } => "InsufficientFunds",
            LedgerError::InsufficientAllowance { .. } => "InsufficientAllowance",
            LedgerError::Overflow(_) => "Overflow",
            LedgerError::CollaboratorFailure(_) => "CollaboratorFailure",
        }
    }
}

impl From<TokenError> for LedgerError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientFunds { account, available, required } => {
                LedgerError::InsufficientFunds { account, available, required }
            }
            TokenError::InsufficientAllowance { owner, spender, allowance, required } => {
                LedgerError::InsufficientAllowance { owner, spender, allowance, required }
            }
            other => LedgerError::CollaboratorFailure(other.to_string()),
        }
    }
}

impl From<RegistryError> for LedgerError {
    fn from(err: RegistryError) -> Self {
        LedgerError::CollaboratorFailure(err.to_string())
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Snapshot persistence errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },
}

/// Failures that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("admin funding failed: {0}")]
    Funding(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_keep_their_kind() {
        let err: LedgerError = TokenError::InsufficientFunds {
            account: "alice".into(),
            available: 3,
            required: 5,
        }
        .into();
        assert_eq!(err.kind(), "InsufficientFunds");

        let err: LedgerError = TokenError::Unavailable("offline".into()).into();
        assert_eq!(err.kind(), "CollaboratorFailure");
    }

    #[test]
    fn test_registry_errors_are_collaborator_failures() {
        let err: LedgerError = RegistryError::UnknownToken(9).into();
        assert_eq!(err.kind(), "CollaboratorFailure");
        assert!(err.to_string().contains("ticket 9"));
    }
}
