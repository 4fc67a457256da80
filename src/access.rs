use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Roles recognised by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Creates and resolves markets, manages roles, sweeps residuals
    Admin,
    /// Allowed to mint tickets on the ownership registry
    Minter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Minter => write!(f, "MINTER"),
        }
    }
}

/// Role membership store. Absence of a role is the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Role, BTreeSet<String>>,
}

impl AccessControl {
    /// Bootstrap with a single admin principal.
    pub fn with_admin(admin: &str) -> Self {
        let mut access = Self::default();
        access.insert(Role::Admin, admin);
        access
    }

    pub fn has_role(&self, role: Role, principal: &str) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(principal))
            .unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `principal` holds `role`.
    pub fn require(&self, role: Role, principal: &str) -> Result<(), LedgerError> {
        if self.has_role(role, principal) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                role,
                principal: principal.to_string(),
            })
        }
    }

    /// Grant `role` to `principal`. Only admins may grant. Returns false when
    /// the principal already held the role.
    pub fn grant_role(&mut self, caller: &str, role: Role, principal: &str) -> Result<bool, LedgerError> {
        self.require(Role::Admin, caller)?;
        Ok(self.insert(role, principal))
    }

    /// Revoke `role` from `principal`. The last admin stays.
    pub fn revoke_role(&mut self, caller: &str, role: Role, principal: &str) -> Result<bool, LedgerError> {
        self.require(Role::Admin, caller)?;
        if role == Role::Admin
            && self.has_role(Role::Admin, principal)
            && self.members(Role::Admin).len() == 1
        {
            return Err(LedgerError::LastAdmin(principal.to_string()));
        }
        Ok(self
            .members
            .get_mut(&role)
            .map(|set| set.remove(principal))
            .unwrap_or(false))
    }

    /// Principals holding `role`, sorted.
    pub fn members(&self, role: Role) -> Vec<String> {
        self.members
            .get(&role)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, role: Role, principal: &str) -> bool {
        self.members
            .entry(role)
            .or_default()
            .insert(principal.to_string())
    }
}
