//! JSON snapshots of ledger store contents
//!
//! The CLI has no remote store to talk to; it seeds an
//! [`InMemoryLedgerStore`] from a snapshot file and writes the result back.

use crate::core::InMemoryLedgerStore;
use crate::types::{LoyaltyError, Member, Transaction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serialized store contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, LoyaltyError> {
        let text = fs::read_to_string(path).map_err(|e| {
            LoyaltyError::invalid_input(format!("Failed to read snapshot '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            LoyaltyError::invalid_input(format!("Invalid snapshot '{}': {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), LoyaltyError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| LoyaltyError::internal(format!("Failed to encode snapshot: {}", e)))?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn from_store(store: &InMemoryLedgerStore) -> Self {
        Self {
            members: store.all_members(),
            transactions: store.all_transactions(),
        }
    }

    pub fn into_store(self) -> InMemoryLedgerStore {
        InMemoryLedgerStore::seeded(self.members, self.transactions)
    }
}
