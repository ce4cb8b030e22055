//! Verification engine orchestration
//!
//! `LoyaltyEngine` wires the components over one shared ledger store and is
//! what the HTTP handlers and the CLI talk to.
//!
//! # Architecture
//!
//! ```text
//! LoyaltyEngine
//!     ├── Arc<dyn LedgerStore>       (injected store capability)
//!     ├── TransactionStateMachine    (single resolve)
//!     │   └── DisbursementEngine     (optimistic ledger credit)
//!     └── BulkProcessor              (batch resolve, per-member partitions)
//! ```

use super::bulk_processor::{BulkConfig, BulkProcessor, BulkSummary};
use super::disbursement::DisbursementEngine;
use super::optimistic::RetryPolicy;
use super::query::{self, DEFAULT_LIST_LIMIT, DEFAULT_SCAN_CAP};
use super::repair::{repair_unfunded, RepairReport};
use super::state_machine::{ResolveOutcome, TransactionStateMachine};
use super::traits::LedgerStore;
use crate::io::csv_format::{match_rows, MatchReport};
use crate::types::{DocPath, LoyaltyError, ResolveAction, Transaction};
use serde::Serialize;
use std::sync::Arc;

/// Tunables for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub bulk: BulkConfig,
    /// Rows returned by `list_recent`
    pub list_limit: usize,
    /// Upper bound on documents read by any scan
    pub scan_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            bulk: BulkConfig::default(),
            list_limit: DEFAULT_LIST_LIMIT,
            scan_cap: DEFAULT_SCAN_CAP,
        }
    }
}

/// Result of a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    #[serde(flatten)]
    pub report: MatchReport,
    /// Bulk verify summary, present when the match was applied
    pub summary: Option<BulkSummary>,
}

/// Entry point for verification, disbursement and reconciliation
#[derive(Clone)]
pub struct LoyaltyEngine {
    store: Arc<dyn LedgerStore>,
    machine: TransactionStateMachine,
    bulk: BulkProcessor,
    config: EngineConfig,
}

impl std::fmt::Debug for LoyaltyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoyaltyEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LoyaltyEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Self {
        let disbursement = DisbursementEngine::new(Arc::clone(&store), config.retry);
        let machine = TransactionStateMachine::new(Arc::clone(&store), disbursement);
        let bulk = BulkProcessor::new(Arc::clone(&store), machine.clone(), config.bulk.clone());
        Self {
            store,
            machine,
            bulk,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub async fn resolve(
        &self,
        doc_path: &str,
        action: ResolveAction,
        actor_id: &str,
    ) -> Result<ResolveOutcome, LoyaltyError> {
        self.machine.resolve(doc_path, action, actor_id).await
    }

    pub async fn resolve_many(
        &self,
        doc_paths: &[DocPath],
        action: Option<ResolveAction>,
        actor_id: &str,
    ) -> Result<BulkSummary, LoyaltyError> {
        self.bulk.resolve_many(doc_paths, action, actor_id).await
    }

    /// Newest transactions, capped at `limit` or the configured list limit
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Transaction>, LoyaltyError> {
        let limit = limit
            .unwrap_or(self.config.list_limit)
            .min(self.config.list_limit);
        query::list_recent(self.store.as_ref(), limit, self.config.scan_cap).await
    }

    /// Match a POS export against pending transactions, verifying on `apply`
    pub async fn reconcile(
        &self,
        csv_text: &str,
        actor_id: &str,
        apply: bool,
    ) -> Result<ReconciliationResult, LoyaltyError> {
        let pending = query::list_pending(self.store.as_ref(), self.config.scan_cap).await?;
        let report = match_rows(csv_text, &pending);
        tracing::info!(
            pending = pending.len(),
            matched = report.matched.len(),
            unmatched = report.unmatched.len(),
            duplicates = report.duplicates.len(),
            apply,
            "reconciliation matched"
        );

        let summary = if apply && !report.matched.is_empty() {
            let doc_paths = report.matched_doc_paths();
            Some(
                self.bulk
                    .resolve_many(&doc_paths, Some(ResolveAction::Verify), actor_id)
                    .await?,
            )
        } else {
            None
        };

        Ok(ReconciliationResult { report, summary })
    }

    /// Credit verified transactions whose disbursement never landed
    pub async fn repair(&self, actor_id: &str) -> Result<RepairReport, LoyaltyError> {
        if actor_id.trim().is_empty() {
            return Err(LoyaltyError::invalid_input("actor id is required"));
        }
        repair_unfunded(
            self.store.as_ref(),
            self.machine.disbursement(),
            actor_id,
            self.config.scan_cap,
            self.config.bulk.error_sample_limit,
        )
        .await
    }
}
