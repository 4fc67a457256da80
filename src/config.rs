// Server configuration, read from the environment (and `.env` when present)
//
// Requests name their caller in the body and nothing authenticates it: every
// client that can reach the listener is trusted. The default bind address is
// loopback; exposing the server needs an authenticating proxy in front.

use crate::error::ConfigError;
use crate::Amount;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:1234";
pub const DEFAULT_CUSTODY: &str = "ledger:custody";
pub const DEFAULT_STATE_PATH: &str = "data/ledger.json";
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;
pub const DEFAULT_LOG_FILTER: &str = "info";

/// rust_decimal cannot represent a larger scale
const MAX_TOKEN_DECIMALS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Bootstrap principal holding ADMIN
    pub admin: String,
    /// Principal holding escrowed funds; receives MINTER
    pub custody: String,
    pub state_path: PathBuf,
    /// Display decimals of the token
    pub token_decimals: u32,
    /// Minted to the admin when starting without a snapshot
    pub admin_funding: Amount,
    pub log_filter: String,
}

impl Config {
    /// Load `.env` (if any) and read `LEDGER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("LEDGER_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "LEDGER_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let admin = get("LEDGER_ADMIN").ok_or(ConfigError::MissingField("LEDGER_ADMIN"))?;
        let custody = get("LEDGER_CUSTODY").unwrap_or_else(|| DEFAULT_CUSTODY.to_string());
        if custody == admin {
            return Err(ConfigError::InvalidValue {
                field: "LEDGER_CUSTODY",
                reason: "custody principal must differ from the admin".to_string(),
            });
        }

        let token_decimals = match get("LEDGER_TOKEN_DECIMALS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|d| *d <= MAX_TOKEN_DECIMALS)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "LEDGER_TOKEN_DECIMALS",
                    reason: format!("expected 0..={}, got {}", MAX_TOKEN_DECIMALS, raw),
                })?,
            None => DEFAULT_TOKEN_DECIMALS,
        };

        let admin_funding = match get("LEDGER_ADMIN_FUNDING") {
            Some(raw) => raw.parse::<Amount>().map_err(|e| ConfigError::InvalidValue {
                field: "LEDGER_ADMIN_FUNDING",
                reason: e.to_string(),
            })?,
            None => 0,
        };

        let log_filter = get("LEDGER_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        EnvFilter::try_new(&log_filter).map_err(|e| ConfigError::InvalidValue {
            field: "LEDGER_LOG",
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            admin,
            custody,
            state_path: get("LEDGER_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            token_decimals,
            admin_funding,
            log_filter,
        })
    }

    /// Config for tests and embedding: defaults everywhere except the admin.
    pub fn with_admin(admin: &str) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 1234)),
            admin: admin.to_string(),
            custody: DEFAULT_CUSTODY.to_string(),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            admin_funding: 0,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
