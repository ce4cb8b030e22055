//! Bulk resolution with per-member partitioning
//!
//! `BulkProcessor` applies one action to a list of transactions. Each item
//! succeeds, is skipped, or fails on its own; nothing is rolled back, so a
//! batch that fails halfway leaves every processed item in its terminal
//! state and reports counts the operator can act on.
//!
//! # Design
//!
//! Eligible transactions are partitioned by member id. Each member's items run
//! sequentially in input order on their own tokio task, and at most
//! `max_concurrent_members` tasks run at once. Items for different members
//! never share a ledger document, and disbursements racing with other callers
//! on the same member are handled by the optimistic retry in the
//! disbursement engine.

use super::state_machine::{ResolveOutcome, TransactionStateMachine};
use super::traits::LedgerStore;
use crate::types::{DocPath, LoyaltyError, MemberId, ResolveAction};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for bulk resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkConfig {
    /// Maximum number of members processed concurrently
    pub max_concurrent_members: usize,
    /// Number of item errors kept verbatim in the summary
    pub error_sample_limit: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrent_members: num_cpus::get(),
            error_sample_limit: 5,
        }
    }
}

impl BulkConfig {
    /// Create a BulkConfig, falling back to the default concurrency for zero
    pub fn new(max_concurrent_members: usize, error_sample_limit: usize) -> Self {
        let default = Self::default();

        let max_concurrent_members = if max_concurrent_members == 0 {
            tracing::warn!(
                default = default.max_concurrent_members,
                "invalid max_concurrent_members (0), using default"
            );
            default.max_concurrent_members
        } else {
            max_concurrent_members
        };

        Self {
            max_concurrent_members,
            error_sample_limit,
        }
    }
}

/// Result of resolving a single item in a batch
#[derive(Debug, Clone)]
pub struct ItemResult {
    pub doc_path: DocPath,
    pub result: Result<ResolveOutcome, LoyaltyError>,
}

/// One retained item failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemError {
    pub doc_path: DocPath,
    pub message: String,
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    /// True when no item failed
    pub success: bool,
    pub success_count: usize,
    pub skip_count: usize,
    pub error_count: usize,
    /// First few failures; `error_count` counts all of them
    pub errors: Vec<BulkItemError>,
}

impl BulkSummary {
    fn record_error(&mut self, doc_path: &str, message: String, limit: usize) {
        self.error_count += 1;
        if self.errors.len() < limit {
            self.errors.push(BulkItemError {
                doc_path: doc_path.to_string(),
                message,
            });
        }
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.skip_count + self.error_count
    }
}

/// Applies the state machine to many transactions
#[derive(Clone)]
pub struct BulkProcessor {
    store: Arc<dyn LedgerStore>,
    machine: TransactionStateMachine,
    config: BulkConfig,
}

impl std::fmt::Debug for BulkProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BulkProcessor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        machine: TransactionStateMachine,
        config: BulkConfig,
    ) -> Self {
        Self {
            store,
            machine,
            config,
        }
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Group doc paths by member
    ///
    /// Members appear in the order of their first doc path; each member's
    /// doc paths keep input order.
    pub fn partition_by_member(
        &self,
        eligible: Vec<(DocPath, MemberId)>,
    ) -> Vec<(MemberId, Vec<DocPath>)> {
        let mut member_batches: Vec<(MemberId, Vec<DocPath>)> = Vec::new();
        let mut slots: HashMap<MemberId, usize> = HashMap::new();

        for (doc_path, member_id) in eligible {
            let slot = *slots.entry(member_id.clone()).or_insert_with(|| {
                member_batches.push((member_id, Vec::new()));
                member_batches.len() - 1
            });
            member_batches[slot].1.push(doc_path);
        }

        member_batches
    }

    /// Resolve one member's transactions sequentially
    ///
    /// Every item is attempted; a failure never stops the ones after it.
    pub async fn process_member_transactions(
        &self,
        doc_paths: Vec<DocPath>,
        action: ResolveAction,
        actor_id: &str,
    ) -> Vec<ItemResult> {
        let mut results = Vec::with_capacity(doc_paths.len());

        for doc_path in doc_paths {
            let result = self.machine.resolve(&doc_path, action, actor_id).await;
            results.push(ItemResult { doc_path, result });
        }

        results
    }

    /// Resolve every transaction in `doc_paths` with `action` (default verify)
    ///
    /// Missing and non-pending transactions are skipped, as are repeats of a
    /// doc path already in the batch. Item failures are counted and the
    /// earliest ones in input order are sampled in the summary. Only invalid
    /// input fails the whole call.
    pub async fn resolve_many(
        &self,
        doc_paths: &[DocPath],
        action: Option<ResolveAction>,
        actor_id: &str,
    ) -> Result<BulkSummary, LoyaltyError> {
        if doc_paths.is_empty() {
            return Err(LoyaltyError::invalid_input("docPaths must be a non-empty list"));
        }
        if actor_id.trim().is_empty() {
            return Err(LoyaltyError::invalid_input("actor id is required"));
        }
        let action = action.unwrap_or_default();
        let limit = self.config.error_sample_limit;

        let mut summary = BulkSummary::default();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(doc_paths.len());
        for doc_path in doc_paths {
            if !seen.insert(doc_path.as_str()) || doc_path.trim().is_empty() {
                summary.skip_count += 1;
            } else {
                unique.push(doc_path);
            }
        }

        let positions: HashMap<&str, usize> = unique
            .iter()
            .enumerate()
            .map(|(position, doc_path)| (doc_path.as_str(), position))
            .collect();
        // (input position, doc path, message), sampled in input order at the end
        let mut failures: Vec<(usize, DocPath, String)> = Vec::new();

        let loaded = join_all(unique.iter().map(|doc_path| self.store.get_transaction(doc_path))).await;

        let mut eligible = Vec::new();
        for (position, (doc_path, result)) in unique.iter().zip(loaded).enumerate() {
            match result {
                Ok(Some(current)) if current.value.is_pending() => {
                    eligible.push(((*doc_path).clone(), current.value.member_id));
                }
                Ok(_) => summary.skip_count += 1,
                Err(error) => failures.push((position, (*doc_path).clone(), error.to_string())),
            }
        }

        let member_batches = self.partition_by_member(eligible);
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_members));

        let mut tasks = Vec::with_capacity(member_batches.len());
        for (_member_id, member_doc_paths) in member_batches {
            let processor = self.clone();
            let permits = Arc::clone(&permits);
            let actor_id = actor_id.to_string();
            let task_doc_paths = member_doc_paths.clone();
            let task = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                processor
                    .process_member_transactions(task_doc_paths, action, &actor_id)
                    .await
            });
            tasks.push((member_doc_paths, task));
        }

        for (member_doc_paths, task) in tasks {
            match task.await {
                Ok(results) => {
                    for item in results {
                        match item.result {
                            Ok(_) => summary.success_count += 1,
                            Err(error) if error.is_skippable() => summary.skip_count += 1,
                            Err(error) => {
                                let position = position_of(&positions, &item.doc_path);
                                failures.push((position, item.doc_path, error.to_string()));
                            }
                        }
                    }
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "bulk member task failed");
                    for doc_path in member_doc_paths {
                        let position = position_of(&positions, &doc_path);
                        failures.push((position, doc_path, format!("task failed: {}", join_error)));
                    }
                }
            }
        }

        failures.sort_by_key(|(position, _, _)| *position);
        for (_, doc_path, message) in failures {
            summary.record_error(&doc_path, message, limit);
        }

        summary.success = summary.error_count == 0;
        tracing::info!(
            %action,
            actor_id,
            requested = doc_paths.len(),
            success_count = summary.success_count,
            skip_count = summary.skip_count,
            error_count = summary.error_count,
            "bulk resolution finished"
        );

        Ok(summary)
    }
}

fn position_of(positions: &HashMap<&str, usize>, doc_path: &str) -> usize {
    positions.get(doc_path).copied().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DisbursementEngine, InMemoryLedgerStore, RetryPolicy};
    use crate::types::{Member, Transaction, TransactionStatus};
    use chrono::Utc;
    use std::time::Duration;

    fn pending(doc_path: &str, member_id: &str, points: i64) -> Transaction {
        Transaction::pending(doc_path, doc_path, doc_path, member_id, points, Utc::now())
    }

    fn processor_with(
        members: Vec<Member>,
        transactions: Vec<Transaction>,
        config: BulkConfig,
    ) -> (Arc<InMemoryLedgerStore>, BulkProcessor) {
        let store = Arc::new(InMemoryLedgerStore::seeded(members, transactions));
        let policy = RetryPolicy::new(16, Duration::ZERO, Duration::ZERO);
        let engine = DisbursementEngine::new(store.clone(), policy);
        let machine = TransactionStateMachine::new(store.clone(), engine);
        let processor = BulkProcessor::new(store.clone(), machine, config);
        (store, processor)
    }

    fn paths(items: &[&str]) -> Vec<DocPath> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_zero_concurrency_falls_back_to_default() {
        let config = BulkConfig::new(0, 5);
        assert_eq!(config.max_concurrent_members, num_cpus::get());
        assert_eq!(config.error_sample_limit, 5);
    }

    #[test]
    fn test_partition_by_member_maintains_order() {
        let (_, processor) = processor_with(vec![], vec![], BulkConfig::default());

        let partitioned = processor.partition_by_member(vec![
            ("p/1".into(), "a".into()),
            ("p/2".into(), "b".into()),
            ("p/3".into(), "a".into()),
            ("p/4".into(), "a".into()),
        ]);

        assert_eq!(
            partitioned,
            vec![
                ("a".to_string(), paths(&["p/1", "p/3", "p/4"])),
                ("b".to_string(), paths(&["p/2"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid() {
        let (_, processor) = processor_with(vec![], vec![], BulkConfig::default());
        let result = processor.resolve_many(&[], None, "a").await;
        assert!(matches!(result, Err(LoyaltyError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_missing_action_defaults_to_verify() {
        let (store, processor) = processor_with(
            vec![Member::new("m1")],
            vec![pending("p/1", "m1", 40)],
            BulkConfig::default(),
        );

        let summary = processor.resolve_many(&paths(&["p/1"]), None, "a").await.unwrap();

        assert_eq!(summary.success_count, 1);
        let tx = store.get_transaction("p/1").await.unwrap().unwrap().value;
        assert_eq!(tx.status, TransactionStatus::Verified);
        let member = store.get_member("m1").await.unwrap().unwrap().value;
        assert_eq!(member.lifetime_points, 40);
    }

    #[tokio::test]
    async fn test_skips_missing_resolved_and_repeated() {
        let mut done = pending("p/2", "m1", 10);
        done.resolve(ResolveAction::Reject, "x", Utc::now());
        let (_, processor) = processor_with(
            vec![Member::new("m1")],
            vec![pending("p/1", "m1", 10), done],
            BulkConfig::default(),
        );

        let summary = processor
            .resolve_many(&paths(&["p/1", "p/2", "p/missing", "p/1"]), Some(ResolveAction::Verify), "a")
            .await
            .unwrap();

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.skip_count, 3);
        assert_eq!(summary.error_count, 0);
        assert!(summary.success);
        assert_eq!(summary.processed(), 4);
    }

    #[tokio::test]
    async fn test_reject_many_touches_no_ledger() {
        let (store, processor) = processor_with(
            vec![Member::with_points("m1", 5, 5), Member::with_points("m2", 7, 7)],
            vec![pending("p/1", "m1", 10), pending("p/2", "m2", 20)],
            BulkConfig::new(2, 5),
        );

        let summary = processor
            .resolve_many(&paths(&["p/1", "p/2"]), Some(ResolveAction::Reject), "a")
            .await
            .unwrap();

        assert_eq!(summary.success_count, 2);
        for id in ["m1", "m2"] {
            assert_eq!(store.get_member(id).await.unwrap().unwrap().version, 1);
        }
    }

    #[tokio::test]
    async fn test_same_member_items_all_credited() {
        let transactions = (0..6).map(|i| pending(&format!("p/{}", i), "m1", 100)).collect();
        let (store, processor) =
            processor_with(vec![Member::new("m1")], transactions, BulkConfig::new(4, 5));

        let batch: Vec<DocPath> = (0..6).map(|i| format!("p/{}", i)).collect();
        let summary = processor.resolve_many(&batch, None, "a").await.unwrap();

        assert_eq!(summary.success_count, 6);
        let member = store.get_member("m1").await.unwrap().unwrap().value;
        assert_eq!(member.lifetime_points, 600);
        assert_eq!(member.xp_history.len(), 6);
        let order: Vec<_> = member
            .xp_history
            .iter()
            .filter_map(|e| e.source_doc_path.clone())
            .collect();
        assert_eq!(order, batch);
    }

    #[test]
    fn test_error_sample_is_bounded() {
        let mut summary = BulkSummary::default();
        for i in 0..9 {
            summary.record_error(&format!("p/{}", i), "boom".into(), 5);
        }
        assert_eq!(summary.error_count, 9);
        assert_eq!(summary.errors.len(), 5);
        assert_eq!(summary.errors[0].doc_path, "p/0");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = BulkSummary {
            success: true,
            success_count: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["successCount"], 2);
        assert_eq!(json["skipCount"], 0);
        assert_eq!(json["errorCount"], 0);
        assert!(json["errors"].as_array().unwrap().is_empty());
    }
}
