/// Ticket ownership collaborator
///
/// ERC-721 style registry. The settlement ledger treats it as the only
/// source of truth for who currently holds a ticket.

use crate::error::RegistryError;
use crate::ids::IdCounter;
use crate::TicketId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait TicketRegistry {
    /// Mint a new token to `to` and return its id.
    fn mint(&mut self, to: &str) -> Result<TicketId, RegistryError>;

    fn owner_of(&self, token_id: TicketId) -> Option<String>;

    fn transfer(&mut self, token_id: TicketId, from: &str, to: &str) -> Result<(), RegistryError>;

    /// Token ids held by `owner`, ascending.
    fn tokens_of_owner(&self, owner: &str) -> Vec<TicketId>;

    fn total_supply(&self) -> u64;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryTicketRegistry {
    owners: BTreeMap<TicketId, String>,
    ids: IdCounter,
}

impl InMemoryTicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TicketRegistry for InMemoryTicketRegistry {
    fn mint(&mut self, to: &str) -> Result<TicketId, RegistryError> {
        let id = self.ids.advance().map_err(|_| RegistryError::Exhausted)?;
        self.owners.insert(id, to.to_string());
        Ok(id)
    }

    fn owner_of(&self, token_id: TicketId) -> Option<String> {
        self.owners.get(&token_id).cloned()
    }

    fn transfer(&mut self, token_id: TicketId, from: &str, to: &str) -> Result<(), RegistryError> {
        let owner = self
            .owners
            .get_mut(&token_id)
            .ok_or(RegistryError::UnknownToken(token_id))?;
        if owner != from {
            return Err(RegistryError::WrongOwner {
                ticket_id: token_id,
                from: from.to_string(),
            });
        }
        *owner = to.to_string();
        Ok(())
    }

    fn tokens_of_owner(&self, owner: &str) -> Vec<TicketId> {
        self.owners
            .iter()
            .filter(|(_, holder)| holder.as_str() == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    fn total_supply(&self) -> u64 {
        self.owners.len() as u64
    }
}
