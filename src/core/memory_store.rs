//! In-memory ledger store
//!
//! `InMemoryLedgerStore` keeps members and transactions in two `DashMap`s,
//! each document paired with a version counter. Conditional writes compare
//! the caller's expected version against the stored one while holding the
//! entry lock, which gives the same optimistic-concurrency behaviour a remote
//! document store provides.
//!
//! # Thread Safety
//!
//! Operations on different documents proceed in parallel. A conditional write
//! and the version check it depends on happen under a single shard lock, so
//! two writers racing on the same document see exactly one success.

use super::traits::{LedgerStore, Versioned};
use crate::types::{Member, StoreError, Transaction};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Thread-safe, versioned document store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    members: DashMap<String, Versioned<Member>>,
    transactions: DashMap<String, Versioned<Transaction>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded with the given documents, each at version 1
    ///
    /// Later duplicates of the same key replace earlier ones.
    pub fn seeded(members: Vec<Member>, transactions: Vec<Transaction>) -> Self {
        let store = Self::new();
        for member in members {
            store
                .members
                .insert(member.id.clone(), Versioned { value: member, version: 1 });
        }
        for transaction in transactions {
            store.transactions.insert(
                transaction.doc_path.clone(),
                Versioned {
                    value: transaction,
                    version: 1,
                },
            );
        }
        store
    }

    /// Snapshot of every member, sorted by id
    pub fn all_members(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .map(|entry| entry.value().value.clone())
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    /// Snapshot of every transaction, sorted by doc path
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .map(|entry| entry.value().value.clone())
            .collect();
        transactions.sort_by(|a, b| a.doc_path.cmp(&b.doc_path));
        transactions
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// Shared conditional-write logic for both collections
fn conditional_put<T>(
    map: &DashMap<String, Versioned<T>>,
    key: String,
    value: T,
    expected_version: Option<u64>,
) -> Result<u64, StoreError> {
    match (map.entry(key), expected_version) {
        (Entry::Vacant(vacant), None) => {
            vacant.insert(Versioned { value, version: 1 });
            Ok(1)
        }
        (Entry::Occupied(mut occupied), Some(expected)) if occupied.get().version == expected => {
            let version = expected + 1;
            occupied.insert(Versioned { value, version });
            Ok(version)
        }
        (Entry::Vacant(vacant), Some(_)) => Err(StoreError::conflict(vacant.key())),
        (Entry::Occupied(occupied), _) => Err(StoreError::conflict(occupied.key())),
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_member(&self, member_id: &str) -> Result<Option<Versioned<Member>>, StoreError> {
        Ok(self.members.get(member_id).map(|entry| entry.value().clone()))
    }

    async fn put_member(
        &self,
        member: Member,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let key = member.id.clone();
        conditional_put(&self.members, key, member, expected_version)
    }

    async fn get_transaction(
        &self,
        doc_path: &str,
    ) -> Result<Option<Versioned<Transaction>>, StoreError> {
        Ok(self
            .transactions
            .get(doc_path)
            .map(|entry| entry.value().clone()))
    }

    async fn put_transaction(
        &self,
        transaction: Transaction,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let key = transaction.doc_path.clone();
        conditional_put(&self.transactions, key, transaction, expected_version)
    }

    async fn scan_transactions(&self, cap: usize) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .transactions
            .iter()
            .take(cap)
            .map(|entry| entry.value().value.clone())
            .collect())
    }
}
