use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Monotonic id source. Ids start at 1 and are never reused.
///
/// Owned by exactly one component (market registry, ticket registry); `peek`
/// lets a caller validate an operation before committing to the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    next: u64,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next call to `advance` will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next - 1
    }

    pub fn advance(&mut self) -> Result<u64, LedgerError> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(LedgerError::Overflow("id counter"))?;
        Ok(id)
    }
}
