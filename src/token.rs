/// Fungible balance collaborator
///
/// The settlement ledger never keeps balances of its own. Prize pools,
/// ticket purchases, resale payments and payouts are all instructions sent
/// through the `TokenLedger` trait; `InMemoryToken` is the reference
/// implementation used by the server and the tests.

use crate::error::TokenError;
use crate::Amount;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Most recent movements kept by `InMemoryToken`.
const JOURNAL_CAP: usize = 1000;

// ============================================================================
// COLLABORATOR TRAIT
// ============================================================================

/// ERC-20 style balance ledger.
pub trait TokenLedger {
    fn balance_of(&self, account: &str) -> Amount;

    fn allowance(&self, owner: &str, spender: &str) -> Amount;

    /// Set (not add to) the amount `spender` may move out of `owner`.
    fn approve(&mut self, owner: &str, spender: &str, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` directly from `from` to `to`.
    fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        spender: &str,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Create new units for `to` (account funding).
    fn mint(&mut self, to: &str, amount: Amount) -> Result<(), TokenError>;
}

// ============================================================================
// IN-MEMORY TOKEN
// ============================================================================

/// One balance movement. `from` is None for mints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Option<String>,
    pub to: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryToken {
    /// Account balances (account -> amount)
    balances: BTreeMap<String, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<String, BTreeMap<String, Amount>>,
    /// Units in existence
    total_supply: Amount,
    /// Recent movements, oldest first
    #[serde(default)]
    journal: VecDeque<TransferRecord>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn journal(&self) -> impl Iterator<Item = &TransferRecord> {
        self.journal.iter()
    }

    fn note(&mut self, from: Option<&str>, to: &str, amount: Amount) {
        self.journal.push_back(TransferRecord {
            from: from.map(str::to_string),
            to: to.to_string(),
            amount,
        });
        if self.journal.len() > JOURNAL_CAP {
            self.journal.pop_front();
        }
    }

    /// Accounts with a non-zero balance.
    pub fn holders(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    fn debit(&mut self, account: &str, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(TokenError::InsufficientFunds {
                account: account.to_string(),
                available,
                required: amount,
            });
        }
        self.balances.insert(account.to_string(), available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &str, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TokenError::Overflow(account.to_string()))?;
        Ok(())
    }
}

impl TokenLedger for InMemoryToken {
    fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &str, spender: &str) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: &str, spender: &str, amount: Amount) -> Result<(), TokenError> {
        self.allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
        Ok(())
    }

    fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> Result<(), TokenError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        // Overflow check before the debit so a failed credit leaves no trace
        if self.balance_of(to).checked_add(amount).is_none() {
            return Err(TokenError::Overflow(to.to_string()));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.note(Some(from), to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &str,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                owner: from.to_string(),
                spender: spender.to_string(),
                allowance,
                required: amount,
            });
        }
        self.transfer(from, to, amount)?;
        if amount > 0 {
            self.approve(from, spender, allowance - amount)?;
        }
        Ok(())
    }

    fn mint(&mut self, to: &str, amount: Amount) -> Result<(), TokenError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TokenError::Overflow("total supply".to_string()))?;
        self.credit(to, amount)?;
        self.total_supply = supply;
        self.note(None, to, amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_transfer() {
        let mut token = InMemoryToken::new();
        token.mint("alice", 100).unwrap();
        token.transfer("alice", "bob", 40).unwrap();

        assert_eq!(token.balance_of("alice"), 60);
        assert_eq!(token.balance_of("bob"), 40);
        assert_eq!(token.total_supply(), 100);
        assert_eq!(token.holders(), 2);

        let journal: Vec<_> = token.journal().collect();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].from, None);
        assert_eq!(journal[1].from.as_deref(), Some("alice"));
        assert_eq!(journal[1].amount, 40);
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let mut token = InMemoryToken::new();
        token.mint("alice", 10).unwrap();

        let err = token.transfer("alice", "bob", 11).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientFunds {
                account: "alice".into(),
                available: 10,
                required: 11,
            }
        );
        assert_eq!(token.balance_of("alice"), 10);
        assert_eq!(token.balance_of("bob"), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut token = InMemoryToken::new();
        token.mint("alice", 100).unwrap();
        token.approve("alice", "escrow", 30).unwrap();

        token.transfer_from("escrow", "alice", "escrow", 20).unwrap();
        assert_eq!(token.allowance("alice", "escrow"), 10);
        assert_eq!(token.balance_of("escrow"), 20);

        let err = token.transfer_from("escrow", "alice", "escrow", 11).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { allowance: 10, .. }));
    }

    #[test]
    fn test_failed_transfer_from_keeps_allowance() {
        let mut token = InMemoryToken::new();
        token.mint("alice", 5).unwrap();
        token.approve("alice", "escrow", 50).unwrap();

        assert!(token.transfer_from("escrow", "alice", "bob", 6).is_err());
        assert_eq!(token.allowance("alice", "escrow"), 50);
        assert_eq!(token.balance_of("alice"), 5);
    }
}
