//! Member ledger types
//!
//! Only the ledger-relevant subset of a member profile lives here. The rest of
//! the profile is owned by account management and round-trips untouched
//! through `extra`.

use super::transaction::{DocPath, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime points at which a member becomes Gold
pub const GOLD_THRESHOLD: i64 = 10_000;

/// Lifetime points at which a member becomes Platinum
pub const PLATINUM_THRESHOLD: i64 = 50_000;

/// Member rank, derived purely from lifetime points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Tier {
    /// Below 10,000 lifetime points
    #[default]
    Silver,
    /// 10,000 up to (not including) 50,000
    Gold,
    /// 50,000 and above
    Platinum,
}

impl Tier {
    /// Tier for a lifetime point total
    pub fn for_lifetime(lifetime_points: i64) -> Self {
        if lifetime_points >= PLATINUM_THRESHOLD {
            Tier::Platinum
        } else if lifetime_points >= GOLD_THRESHOLD {
            Tier::Gold
        } else {
            Tier::Silver
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        };
        f.write_str(s)
    }
}

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Earn,
    Redeem,
}

/// Audit status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Verified,
    Pending,
}

/// Append-only audit record in a member's `xp_history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Source transaction reference plus a disambiguating suffix
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub status: EntryStatus,
    /// Human description
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub location: String,
    /// POS reference of the triggering transaction
    #[serde(default)]
    pub transaction_id: String,
    /// Document that produced this entry; the idempotency key for disbursement
    #[serde(default)]
    pub source_doc_path: Option<DocPath>,
}

/// Member ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,

    /// Redeemable balance
    ///
    /// Not clamped at zero here; redemption lives elsewhere.
    #[serde(default)]
    pub current_points: i64,

    /// Total ever earned; only grows, and only through disbursement
    #[serde(default)]
    pub lifetime_points: i64,

    #[serde(default)]
    pub tier: Tier,

    #[serde(default)]
    pub xp_history: Vec<LedgerEntry>,

    #[serde(default)]
    pub points_last_updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub points_last_updated_by: Option<String>,

    /// Profile fields owned by other systems
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Member {
    /// Create an empty Silver ledger for a member id
    pub fn new(id: impl Into<MemberId>) -> Self {
        Member {
            id: id.into(),
            current_points: 0,
            lifetime_points: 0,
            tier: Tier::Silver,
            xp_history: Vec::new(),
            points_last_updated_at: None,
            points_last_updated_by: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Member with a preexisting balance, tier recomputed from `lifetime_points`
    pub fn with_points(id: impl Into<MemberId>, current_points: i64, lifetime_points: i64) -> Self {
        let mut member = Member::new(id);
        member.current_points = current_points;
        member.lifetime_points = lifetime_points;
        member.tier = Tier::for_lifetime(lifetime_points);
        member
    }

    /// Whether an earn entry for this source transaction was already appended
    ///
    /// Entries without a `source_doc_path` predate that field and are matched
    /// on their `transaction_id` instead.
    pub fn has_entry_for(&self, doc_path: &str, transaction_id: &str) -> bool {
        self.xp_history.iter().any(|entry| match entry.source_doc_path.as_deref() {
            Some(source) => source == doc_path,
            None => {
                entry.entry_type == EntryType::Earn
                    && !transaction_id.is_empty()
                    && entry.transaction_id == transaction_id
            }
        })
    }
}
