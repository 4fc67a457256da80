// Application state and snapshot persistence

use crate::access::Role;
use crate::config::Config;
use crate::error::{LedgerError, SnapshotError, StartupError};
use crate::ledger::{Ledger, SharedLedger};
use crate::models::to_human;
use crate::Amount;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub ledger: SharedLedger,
    pub config: Config,
}

impl AppState {
    /// Fresh ledger bootstrapped from the configuration.
    pub fn new(config: Config) -> Result<Self, LedgerError> {
        let ledger = Ledger::in_memory(&config.admin, &config.custody);
        Self::funded(ledger, config)
    }

    /// Mint `config.admin_funding` to the admin, then wrap the ledger.
    pub fn funded(mut ledger: Ledger, config: Config) -> Result<Self, LedgerError> {
        if config.admin_funding > 0 {
            ledger.mint_tokens(&config.admin, &config.admin, config.admin_funding)?;
        }
        Ok(Self::with_ledger(ledger, config))
    }

    pub fn with_ledger(ledger: Ledger, config: Config) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            config,
        }
    }

    /// Restore the snapshot at `config.state_path` if there is one, else start fresh.
    /// A snapshot that exists but cannot be read is an error, never silently replaced.
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        if !config.state_path.exists() {
            info!(path = %config.state_path.display(), "no snapshot found, starting fresh");
            return Ok(Self::new(config)?);
        }
        let ledger = load_snapshot(&config.state_path)?;
        if !ledger.access().has_role(Role::Admin, &config.admin) {
            warn!(admin = %config.admin, "configured admin holds no ADMIN role in the snapshot");
        }
        Ok(Self::with_ledger(ledger, config))
    }

    pub fn save_to_disk(&self) -> Result<(), SnapshotError> {
        let ledger = self.ledger.read();
        save_snapshot(&ledger, &self.config.state_path).map(|_| ())
    }

    /// Token amount in display units.
    pub fn human(&self, amount: Amount) -> String {
        to_human(amount, self.config.token_decimals)
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================
//
// The ledger is written as pretty JSON; a sidecar `<file>.sha256` holds the
// hex digest of those exact bytes and is checked on load. Both files are
// staged as `.tmp` siblings first. The body is renamed into place before the
// digest, so a save cut short between the two renames leaves a pending
// digest that matches the new body.

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn checksum_path(path: &Path) -> PathBuf {
    suffixed(path, ".sha256")
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write the ledger to `path`. Returns the digest of the written bytes.
pub fn save_snapshot(ledger: &Ledger, path: &Path) -> Result<String, SnapshotError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let body = serde_json::to_vec_pretty(ledger)?;
    let checksum = digest(&body);

    let sidecar = checksum_path(path);
    let body_tmp = suffixed(path, ".tmp");
    let sidecar_tmp = suffixed(&sidecar, ".tmp");
    fs::write(&body_tmp, &body)?;
    fs::write(&sidecar_tmp, &checksum)?;
    fs::rename(&body_tmp, path)?;
    fs::rename(&sidecar_tmp, &sidecar)?;

    info!(path = %path.display(), bytes = body.len(), %checksum, "snapshot saved");
    Ok(checksum)
}

/// Read a snapshot and rebuild the derived indexes.
pub fn load_snapshot(path: &Path) -> Result<Ledger, SnapshotError> {
    let body = fs::read(path)?;
    let found = digest(&body);
    let sidecar = checksum_path(path);
    match fs::read_to_string(&sidecar) {
        Ok(expected) => {
            let expected = expected.trim().to_string();
            if expected != found {
                let pending = suffixed(&sidecar, ".tmp");
                match fs::read_to_string(&pending) {
                    Ok(staged) if staged.trim() == found => {
                        warn!(path = %path.display(), "completing interrupted snapshot save");
                        fs::rename(&pending, &sidecar)?;
                    }
                    _ => return Err(SnapshotError::Checksum { expected, found }),
                }
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "snapshot has no checksum file, loading unverified");
        }
        Err(err) => return Err(err.into()),
    }

    let mut ledger: Ledger = serde_json::from_slice(&body)?;
    ledger.rebuild_index();
    info!(path = %path.display(), markets = ledger.market_count(), tickets = ledger.ticket_count(), "snapshot loaded");
    Ok(ledger)
}
