//! Disbursement repair for verified transactions
//!
//! Verification writes the transaction status before crediting the member,
//! so a failure in between leaves a `verified` transaction whose points were
//! never applied. `repair_unfunded` walks the verified transactions and
//! re-runs their disbursement. The disbursement engine skips transactions
//! already present in the member's history, so running repair repeatedly is
//! safe.

use super::bulk_processor::BulkItemError;
use super::disbursement::{DisbursementContext, DisbursementEngine, DisbursementOutcome};
use super::query::list_by_status;
use super::traits::LedgerStore;
use crate::types::{LoyaltyError, TransactionStatus};
use serde::Serialize;

/// Counts per repair outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub examined: usize,
    /// Points were missing and have now been credited
    pub repaired: usize,
    pub already_funded: usize,
    /// Verified, but the member ledger does not exist
    pub member_missing: usize,
    /// Nothing to credit (no member id or zero points)
    pub skipped: usize,
    pub error_count: usize,
    pub errors: Vec<BulkItemError>,
}

/// Re-run disbursement for every verified transaction within `scan_cap`
pub async fn repair_unfunded(
    store: &dyn LedgerStore,
    engine: &DisbursementEngine,
    actor_id: &str,
    scan_cap: usize,
    error_sample_limit: usize,
) -> Result<RepairReport, LoyaltyError> {
    let verified = list_by_status(store, TransactionStatus::Verified, scan_cap).await?;
    let mut report = RepairReport::default();

    for transaction in &verified {
        report.examined += 1;
        let context = DisbursementContext::from(transaction);
        let result = engine
            .disburse(
                &transaction.member_id,
                transaction.potential_points,
                &context,
                actor_id,
            )
            .await;

        match result {
            Ok(DisbursementOutcome::Credited { .. }) => {
                tracing::info!(doc_path = %transaction.doc_path, "repaired missing disbursement");
                report.repaired += 1;
            }
            Ok(DisbursementOutcome::AlreadyApplied) => report.already_funded += 1,
            Ok(DisbursementOutcome::MemberMissing { .. }) => report.member_missing += 1,
            Ok(DisbursementOutcome::Skipped) => report.skipped += 1,
            Err(error) => {
                report.error_count += 1;
                if report.errors.len() < error_sample_limit {
                    report.errors.push(BulkItemError {
                        doc_path: transaction.doc_path.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        examined = report.examined,
        repaired = report.repaired,
        member_missing = report.member_missing,
        error_count = report.error_count,
        "disbursement repair finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryLedgerStore, RetryPolicy};
    use crate::types::{Member, ResolveAction, Transaction};
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    fn verified(doc_path: &str, member_id: &str, points: i64) -> Transaction {
        let mut tx = Transaction::pending(doc_path, doc_path, doc_path, member_id, points, Utc::now());
        tx.resolve(ResolveAction::Verify, "a", Utc::now());
        tx
    }

    #[tokio::test]
    async fn test_repair_credits_only_unfunded() {
        let store = Arc::new(InMemoryLedgerStore::seeded(
            vec![Member::new("m1")],
            vec![
                verified("p/1", "m1", 100),
                verified("p/2", "m1", 50),
                verified("p/3", "ghost", 10),
                Transaction::pending("p/4", "p/4", "p/4", "m1", 999, Utc::now()),
            ],
        ));
        let engine = DisbursementEngine::new(
            store.clone(),
            RetryPolicy::new(4, Duration::ZERO, Duration::ZERO),
        );
        // p/1 was funded at verification time
        let funded = store.get_transaction("p/1").await.unwrap().unwrap().value;
        engine
            .disburse("m1", 100, &DisbursementContext::from(&funded), "a")
            .await
            .unwrap();

        let report = repair_unfunded(store.as_ref(), &engine, "repair", 1000, 5)
            .await
            .unwrap();

        assert_eq!(report.examined, 3);
        assert_eq!(report.repaired, 1);
        assert_eq!(report.already_funded, 1);
        assert_eq!(report.member_missing, 1);
        let member = store.get_member("m1").await.unwrap().unwrap().value;
        assert_eq!(member.lifetime_points, 150);

        let again = repair_unfunded(store.as_ref(), &engine, "repair", 1000, 5)
            .await
            .unwrap();
        assert_eq!(again.repaired, 0);
        assert_eq!(again.already_funded, 2);
    }

    #[tokio::test]
    async fn test_repair_recognizes_entries_recorded_before_source_paths() {
        let member: Member = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "currentPoints": 960,
            "lifetimePoints": 10460,
            "tier": "Gold",
            "xpHistory": [
                {
                    "id": "TX-a-1f2e3d4c",
                    "date": "2026-02-01T09:30:00Z",
                    "amount": 960,
                    "type": "earn",
                    "status": "verified",
                    "context": "Purchase at Central",
                    "location": "Central",
                    "transactionId": "TX-a"
                }
            ]
        }))
        .unwrap();
        let mut tx = Transaction::pending("a", "transactions/a", "TX-a", "m1", 960, Utc::now());
        tx.resolve(ResolveAction::Verify, "staff-1", Utc::now());
        let store = Arc::new(InMemoryLedgerStore::seeded(vec![member], vec![tx]));
        let engine = DisbursementEngine::new(
            store.clone(),
            RetryPolicy::new(4, Duration::ZERO, Duration::ZERO),
        );

        let report = repair_unfunded(store.as_ref(), &engine, "ops", 1000, 5)
            .await
            .unwrap();

        assert_eq!(report.repaired, 0);
        assert_eq!(report.already_funded, 1);
        let member = store.get_member("m1").await.unwrap().unwrap().value;
        assert_eq!(member.lifetime_points, 10460);
        assert_eq!(member.xp_history.len(), 1);
    }
}
