//! Transaction-related types for the loyalty engine
//!
//! A `Transaction` is a staff-entered purchase waiting to be verified. It is
//! created elsewhere in `pending` state and resolved exactly once by the
//! state machine in [`crate::core::state_machine`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque addressing key for one transaction document
///
/// Never parsed; passed through unchanged to the ledger store.
pub type DocPath = String;

/// Member identifier
pub type MemberId = String;

/// Lifecycle state of a purchase transaction
///
/// The only legal moves are `Pending -> Verified` and `Pending -> Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Waiting for a staff decision
    Pending,
    /// Accepted; points have been (or should have been) disbursed
    Verified,
    /// Declined; no points are disbursed
    Rejected,
}

impl TransactionStatus {
    /// Whether the status is terminal
    pub fn is_resolved(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Verified => "verified",
            TransactionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Decision applied to a pending transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveAction {
    /// Mark verified and disburse the transaction's potential points
    #[default]
    Verify,
    /// Mark rejected; the member ledger is untouched
    Reject,
}

impl ResolveAction {
    /// Status a pending transaction moves to under this action
    pub fn target_status(self) -> TransactionStatus {
        match self {
            ResolveAction::Verify => TransactionStatus::Verified,
            ResolveAction::Reject => TransactionStatus::Rejected,
        }
    }
}

impl fmt::Display for ResolveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveAction::Verify => f.write_str("verify"),
            ResolveAction::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for ResolveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verify" => Ok(ResolveAction::Verify),
            "reject" => Ok(ResolveAction::Reject),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Purchase transaction document
///
/// `amount` is in the smallest currency unit. `potential_points` is fixed at
/// creation time and is never recomputed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Store-assigned document id
    pub doc_id: String,

    /// Fully qualified document location, used as the mutation key
    pub doc_path: DocPath,

    /// External point-of-sale reference
    ///
    /// Unique per store-day in practice, not globally.
    #[serde(default)]
    pub transaction_id: String,

    /// Member receiving the points
    #[serde(default)]
    pub member_id: MemberId,

    /// Denormalized member name at creation time
    #[serde(default)]
    pub member_name: String,

    /// Staff member who entered the purchase
    #[serde(default)]
    pub staff_id: String,

    /// Store the purchase happened at
    #[serde(default)]
    pub store_location: String,

    /// Purchase amount in the smallest currency unit
    pub amount: i64,

    /// Points to credit on verification
    pub potential_points: i64,

    /// Current lifecycle state
    pub status: TransactionStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Resolution time; set iff `status` is not pending
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,

    /// Resolving actor; set iff `status` is not pending
    #[serde(default)]
    pub verified_by: Option<String>,
}

impl Transaction {
    /// Build a new pending transaction
    pub fn pending(
        doc_id: impl Into<String>,
        doc_path: impl Into<DocPath>,
        transaction_id: impl Into<String>,
        member_id: impl Into<MemberId>,
        potential_points: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            doc_path: doc_path.into(),
            transaction_id: transaction_id.into(),
            member_id: member_id.into(),
            member_name: String::new(),
            staff_id: String::new(),
            store_location: String::new(),
            amount: 0,
            potential_points,
            status: TransactionStatus::Pending,
            created_at,
            verified_at: None,
            verified_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Apply a resolution in place
    ///
    /// Callers must have checked `is_pending` first; this only stamps the fields.
    pub fn resolve(&mut self, action: ResolveAction, actor_id: &str, at: DateTime<Utc>) {
        self.status = action.target_status();
        self.verified_at = Some(at);
        self.verified_by = Some(actor_id.to_string());
    }

    /// Reference used for ledger entry ids and log lines
    pub fn reference(&self) -> &str {
        if self.transaction_id.is_empty() {
            &self.doc_id
        } else {
            &self.transaction_id
        }
    }
}
