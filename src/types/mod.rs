//! Types module
//!
//! Contains core data structures used throughout the application:
//! - `member`: Member ledger, tiers and ledger entries
//! - `transaction`: Purchase transactions and their lifecycle
//! - `error`: Error types for the engine and the ledger store

pub mod error;
pub mod member;
pub mod transaction;

pub use error::{LoyaltyError, StoreError};
pub use member::{EntryStatus, EntryType, LedgerEntry, Member, Tier, GOLD_THRESHOLD, PLATINUM_THRESHOLD};
pub use transaction::{DocPath, MemberId, ResolveAction, Transaction, TransactionStatus};
