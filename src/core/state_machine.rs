//! Transaction lifecycle
//!
//! `TransactionStateMachine` moves one pending transaction to `verified` or
//! `rejected`. The status write is conditional on the version read at load
//! time, so of two resolvers racing on the same transaction exactly one wins
//! and the other gets `Conflict`.
//!
//! On verify the status is written first and the disbursement second. The
//! two writes touch different documents and are not atomic together: if the
//! disbursement fails, the transaction stays `verified` without its points.
//! [`crate::core::repair`] closes that gap by re-running the (idempotent)
//! disbursement for verified transactions.

use super::disbursement::{DisbursementContext, DisbursementEngine, DisbursementOutcome};
use super::traits::LedgerStore;
use crate::types::{DocPath, LoyaltyError, ResolveAction, StoreError, TransactionStatus};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Result of resolving one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutcome {
    pub doc_path: DocPath,
    pub action: ResolveAction,
    pub status: TransactionStatus,
    /// Points credited by this call
    pub points: i64,
    /// Disbursement result, present on verify
    pub disbursement: Option<DisbursementOutcome>,
}

/// Performs the pending -> verified / rejected transition
#[derive(Clone)]
pub struct TransactionStateMachine {
    store: Arc<dyn LedgerStore>,
    disbursement: DisbursementEngine,
}

impl std::fmt::Debug for TransactionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionStateMachine")
            .field("disbursement", &self.disbursement)
            .finish_non_exhaustive()
    }
}

impl TransactionStateMachine {
    pub fn new(store: Arc<dyn LedgerStore>, disbursement: DisbursementEngine) -> Self {
        Self {
            store,
            disbursement,
        }
    }

    pub fn disbursement(&self) -> &DisbursementEngine {
        &self.disbursement
    }

    /// Resolve the transaction at `doc_path`
    ///
    /// # Returns
    ///
    /// * `Ok(ResolveOutcome)` - the transaction is now terminal
    /// * `Err(InvalidInput)` - empty doc path or actor
    /// * `Err(NotFound)` - no transaction at `doc_path`
    /// * `Err(Conflict)` - the transaction is not pending, or another
    ///   resolver got there first
    /// * any disbursement error; the transaction is left `verified`
    pub async fn resolve(
        &self,
        doc_path: &str,
        action: ResolveAction,
        actor_id: &str,
    ) -> Result<ResolveOutcome, LoyaltyError> {
        if doc_path.trim().is_empty() {
            return Err(LoyaltyError::invalid_input("docPath is required"));
        }
        if actor_id.trim().is_empty() {
            return Err(LoyaltyError::invalid_input("actor id is required"));
        }

        let current = self
            .store
            .get_transaction(doc_path)
            .await?
            .ok_or_else(|| LoyaltyError::not_found(doc_path))?;

        let mut transaction = current.value;
        if !transaction.is_pending() {
            return Err(LoyaltyError::conflict(doc_path, transaction.status));
        }

        transaction.resolve(action, actor_id, Utc::now());
        match self
            .store
            .put_transaction(transaction.clone(), Some(current.version))
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict { .. }) => return Err(self.lost_race(doc_path, action).await),
            Err(other) => return Err(other.into()),
        }

        tracing::info!(
            doc_path,
            %action,
            actor_id,
            member_id = %transaction.member_id,
            "transaction resolved"
        );

        let disbursement = match action {
            ResolveAction::Reject => None,
            ResolveAction::Verify => {
                let context = DisbursementContext::from(&transaction);
                let outcome = self
                    .disbursement
                    .disburse(
                        &transaction.member_id,
                        transaction.potential_points,
                        &context,
                        actor_id,
                    )
                    .await
                    .inspect_err(|error| {
                        tracing::error!(
                            doc_path,
                            member_id = %transaction.member_id,
                            points = transaction.potential_points,
                            %error,
                            "transaction verified but disbursement failed"
                        )
                    })?;
                Some(outcome)
            }
        };

        Ok(ResolveOutcome {
            doc_path: doc_path.to_string(),
            action,
            status: transaction.status,
            points: disbursement
                .as_ref()
                .map(DisbursementOutcome::credited_points)
                .unwrap_or(0),
            disbursement,
        })
    }

    /// Build the error for a status write that lost to a concurrent resolver
    async fn lost_race(&self, doc_path: &str, action: ResolveAction) -> LoyaltyError {
        match self.store.get_transaction(doc_path).await {
            Ok(Some(latest)) => LoyaltyError::conflict(doc_path, latest.value.status),
            Ok(None) => LoyaltyError::not_found(doc_path),
            Err(_) => LoyaltyError::conflict(doc_path, action.target_status()),
        }
    }
}
