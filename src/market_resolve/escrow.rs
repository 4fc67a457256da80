use crate::error::LedgerError;
use crate::token::TokenLedger;
use crate::Amount;
use tracing::error;

/// A delegated transfer that already happened and can still be undone.
///
/// Operations spanning both collaborators stage the fund movement first and
/// keep this handle until the ticket registry step has succeeded. Dropping
/// it commits; `reverse` puts funds and allowance back.
#[derive(Debug)]
#[must_use = "a staged transfer must be committed or reversed"]
pub struct StagedTransfer {
    spender: String,
    from: String,
    to: String,
    amount: Amount,
    prior_allowance: Amount,
}

impl StagedTransfer {
    /// Move `amount` from `from` to `to` using the allowance granted to `spender`.
    /// A zero amount never reaches the token ledger.
    pub fn pull<T: TokenLedger>(
        token: &mut T,
        spender: &str,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<Self, LedgerError> {
        let prior_allowance = token.allowance(from, spender);
        if amount > 0 {
            token.transfer_from(spender, from, to, amount)?;
        }
        Ok(Self {
            spender: spender.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
            prior_allowance,
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Keep the transfer.
    pub fn commit(self) {}

    /// Undo the transfer and restore the allowance it consumed.
    pub fn reverse<T: TokenLedger>(self, token: &mut T) {
        if self.amount == 0 {
            return;
        }
        let undone = token
            .transfer(&self.to, &self.from, self.amount)
            .and_then(|_| token.approve(&self.from, &self.spender, self.prior_allowance));
        if let Err(err) = undone {
            error!(
                from = %self.from,
                to = %self.to,
                amount = %self.amount,
                "failed to reverse staged transfer: {}", err
            );
        }
    }
}

/// Run `step` after staging `transfer`; reverse the transfer if `step` fails.
pub fn with_compensation<T, Out, F>(token: &mut T, transfer: StagedTransfer, step: F) -> Result<Out, LedgerError>
where
    T: TokenLedger,
    F: FnOnce() -> Result<Out, LedgerError>,
{
    match step() {
        Ok(out) => {
            transfer.commit();
            Ok(out)
        }
        Err(err) => {
            transfer.reverse(token);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::InMemoryToken;

    fn funded() -> InMemoryToken {
        let mut token = InMemoryToken::new();
        token.mint("alice", 100).unwrap();
        token.approve("alice", "custody", 60).unwrap();
        token
    }

    #[test]
    fn test_reverse_restores_balance_and_allowance() {
        let mut token = funded();
        let staged = StagedTransfer::pull(&mut token, "custody", "alice", "bob", 25).unwrap();
        assert_eq!(token.balance_of("bob"), 25);
        assert_eq!(token.allowance("alice", "custody"), 35);

        staged.reverse(&mut token);
        assert_eq!(token.balance_of("alice"), 100);
        assert_eq!(token.balance_of("bob"), 0);
        assert_eq!(token.allowance("alice", "custody"), 60);
    }

    #[test]
    fn test_with_compensation_reverses_on_failure() {
        let mut token = funded();
        let staged = StagedTransfer::pull(&mut token, "custody", "alice", "custody", 40).unwrap();
        let result: Result<(), LedgerError> =
            with_compensation(&mut token, staged, || Err(LedgerError::CollaboratorFailure("mint".into())));

        assert_eq!(result.unwrap_err().kind(), "CollaboratorFailure");
        assert_eq!(token.balance_of("alice"), 100);
        assert_eq!(token.balance_of("custody"), 0);
    }

    #[test]
    fn test_with_compensation_commits_on_success() {
        let mut token = funded();
        let staged = StagedTransfer::pull(&mut token, "custody", "alice", "custody", 40).unwrap();
        let out = with_compensation(&mut token, staged, || Ok(7)).unwrap();

        assert_eq!(out, 7);
        assert_eq!(token.balance_of("custody"), 40);
    }

    #[test]
    fn test_zero_pull_skips_token_ledger() {
        let mut token = InMemoryToken::new();
        let staged = StagedTransfer::pull(&mut token, "custody", "nobody", "custody", 0).unwrap();
        assert_eq!(staged.amount(), 0);
        staged.reverse(&mut token);
        assert_eq!(token.journal().count(), 0);
    }

    #[test]
    fn test_pull_failure_moves_nothing() {
        let mut token = funded();
        let err = StagedTransfer::pull(&mut token, "custody", "alice", "bob", 61).unwrap_err();
        assert_eq!(err.kind(), "InsufficientAllowance");
        assert_eq!(token.balance_of("alice"), 100);
    }
}
