//! The ledger store capability
//!
//! Every component receives an `Arc<dyn LedgerStore>` instead of reaching for
//! a global client. Production wires a remote document store behind this
//! trait; tests and the CLI use [`crate::core::InMemoryLedgerStore`].

use crate::types::{Member, StoreError, Transaction};
use async_trait::async_trait;

/// A document together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Document store holding members and transactions
///
/// Writes are conditional: `expected_version` of `Some(v)` succeeds only if
/// the stored document is still at version `v`, otherwise the store returns
/// [`StoreError::Conflict`]. `None` creates the document and conflicts if it
/// already exists. Successful writes return the new version.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read a member ledger
    async fn get_member(&self, member_id: &str) -> Result<Option<Versioned<Member>>, StoreError>;

    /// Conditionally write a member ledger
    async fn put_member(
        &self,
        member: Member,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Read a transaction by doc path
    async fn get_transaction(
        &self,
        doc_path: &str,
    ) -> Result<Option<Versioned<Transaction>>, StoreError>;

    /// Conditionally write a transaction, keyed by its doc path
    async fn put_transaction(
        &self,
        transaction: Transaction,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Read up to `cap` transactions in no particular order
    async fn scan_transactions(&self, cap: usize) -> Result<Vec<Transaction>, StoreError>;
}
