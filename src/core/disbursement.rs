//! Points disbursement
//!
//! `DisbursementEngine` credits a member's ledger for one verified
//! transaction. The read-modify-write runs inside
//! [`with_optimistic_update`], so concurrent disbursements to the same member
//! are serialized by the store's version check and none of them is lost.
//!
//! Every credited entry records the doc path of its source transaction.
//! Before crediting, the engine looks for that doc path in the member's
//! history and reports [`DisbursementOutcome::AlreadyApplied`] if it is
//! present, which makes re-running a disbursement for the same transaction
//! harmless.

use super::optimistic::{with_optimistic_update, AttemptError, RetryPolicy};
use super::traits::LedgerStore;
use crate::types::{
    DocPath, EntryStatus, EntryType, LedgerEntry, LoyaltyError, MemberId, Tier, Transaction,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Where a disbursement came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisbursementContext {
    /// Source transaction document; idempotency key
    pub doc_path: DocPath,
    /// POS reference copied into the ledger entry
    pub transaction_id: String,
    /// Prefix for the ledger entry id
    pub reference: String,
    pub location: String,
}

impl DisbursementContext {
    /// Description stored on the ledger entry
    pub fn description(&self) -> String {
        if self.location.is_empty() {
            "Purchase".to_string()
        } else {
            format!("Purchase at {}", self.location)
        }
    }
}

impl From<&Transaction> for DisbursementContext {
    fn from(tx: &Transaction) -> Self {
        Self {
            doc_path: tx.doc_path.clone(),
            transaction_id: tx.transaction_id.clone(),
            reference: tx.reference().to_string(),
            location: tx.store_location.clone(),
        }
    }
}

/// Result of a disbursement request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DisbursementOutcome {
    /// Ledger was credited
    #[serde(rename_all = "camelCase")]
    Credited {
        member_id: MemberId,
        points: i64,
        current_points: i64,
        lifetime_points: i64,
        tier: Tier,
        entry_id: String,
    },
    /// Nothing to do: empty member id or non-positive points
    Skipped,
    /// No ledger exists for the member; nothing was credited
    #[serde(rename_all = "camelCase")]
    MemberMissing { member_id: MemberId },
    /// An entry for this source transaction is already in the history
    AlreadyApplied,
}

impl DisbursementOutcome {
    /// Points actually added by this call
    pub fn credited_points(&self) -> i64 {
        match self {
            DisbursementOutcome::Credited { points, .. } => *points,
            _ => 0,
        }
    }
}

/// Credits member ledgers through the ledger store
#[derive(Clone)]
pub struct DisbursementEngine {
    store: Arc<dyn LedgerStore>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for DisbursementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisbursementEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DisbursementEngine {
    pub fn new(store: Arc<dyn LedgerStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Credit `points` to `member_id`
    ///
    /// Increases current and lifetime points, recomputes the tier from the new
    /// lifetime total, appends one `earn` entry and stamps the last-updated
    /// fields, all in one conditional write.
    ///
    /// # Returns
    ///
    /// * `Ok(Skipped)` - empty member id or `points <= 0`; no store access
    /// * `Ok(MemberMissing)` - no ledger for the member; logged, not credited
    /// * `Ok(AlreadyApplied)` - this source transaction was credited before
    /// * `Ok(Credited)` - the ledger was updated
    /// * `Err(RetryExhausted)` - contention outlasted the retry budget
    /// * `Err(StoreUnavailable)` - store I/O failure
    pub async fn disburse(
        &self,
        member_id: &str,
        points: i64,
        context: &DisbursementContext,
        actor_id: &str,
    ) -> Result<DisbursementOutcome, LoyaltyError> {
        if member_id.trim().is_empty() || points <= 0 {
            tracing::debug!(
                member_id,
                points,
                doc_path = %context.doc_path,
                "nothing to disburse"
            );
            return Ok(DisbursementOutcome::Skipped);
        }

        let engine = self;
        let outcome = with_optimistic_update(&self.policy, member_id, move || {
            engine.attempt_credit(member_id, points, context, actor_id)
        })
        .await?;

        match &outcome {
            DisbursementOutcome::Credited {
                lifetime_points,
                tier,
                entry_id,
                ..
            } => tracing::info!(
                member_id,
                points,
                lifetime_points,
                %tier,
                entry_id = %entry_id,
                doc_path = %context.doc_path,
                "points disbursed"
            ),
            DisbursementOutcome::MemberMissing { .. } => tracing::warn!(
                member_id,
                points,
                doc_path = %context.doc_path,
                "member ledger not found, no points credited"
            ),
            DisbursementOutcome::AlreadyApplied => tracing::info!(
                member_id,
                doc_path = %context.doc_path,
                "disbursement already applied"
            ),
            DisbursementOutcome::Skipped => {}
        }

        Ok(outcome)
    }

    /// One read-modify-write against the member document
    async fn attempt_credit(
        &self,
        member_id: &str,
        points: i64,
        context: &DisbursementContext,
        actor_id: &str,
    ) -> Result<DisbursementOutcome, AttemptError> {
        let Some(current) = self.store.get_member(member_id).await? else {
            return Ok(DisbursementOutcome::MemberMissing {
                member_id: member_id.to_string(),
            });
        };

        let mut member = current.value;
        if member.has_entry_for(&context.doc_path, &context.transaction_id) {
            return Ok(DisbursementOutcome::AlreadyApplied);
        }

        let overflow = || LoyaltyError::internal(format!("points overflow for member {}", member_id));
        let current_points = member.current_points.checked_add(points).ok_or_else(overflow)?;
        let lifetime_points = member.lifetime_points.checked_add(points).ok_or_else(overflow)?;
        let tier = Tier::for_lifetime(lifetime_points);
        let now = Utc::now();
        let entry_id = format!("{}-{:08x}", context.reference, rand::random::<u32>());

        member.current_points = current_points;
        member.lifetime_points = lifetime_points;
        member.tier = tier;
        member.points_last_updated_at = Some(now);
        member.points_last_updated_by = Some(actor_id.to_string());
        member.xp_history.push(LedgerEntry {
            id: entry_id.clone(),
            date: now,
            amount: points,
            entry_type: EntryType::Earn,
            status: EntryStatus::Verified,
            context: context.description(),
            location: context.location.clone(),
            transaction_id: context.transaction_id.clone(),
            source_doc_path: Some(context.doc_path.clone()),
        });

        self.store.put_member(member, Some(current.version)).await?;

        Ok(DisbursementOutcome::Credited {
            member_id: member_id.to_string(),
            points,
            current_points,
            lifetime_points,
            tier,
            entry_id,
        })
    }
}
