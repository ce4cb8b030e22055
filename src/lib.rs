//! Loyalty Points Engine Library
//! # Overview
//!
//! This library verifies pending loyalty transactions and disburses their
//! points to member ledgers, either one at a time, in bulk, or by matching a
//! point-of-sale CSV export.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Transaction, Member, LedgerEntry, errors)
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - The versioned `LedgerStore` capability
//!   - [`core::disbursement`] - Conflict-retried, idempotent point credits
//!   - [`core::state_machine`] - pending to verified/rejected transitions
//!   - [`core::bulk_processor`] - Per-member concurrent batch resolution
//!   - [`core::engine`] - Orchestration used by the HTTP API and CLI
//! - [`io`] - CSV reconciliation matching and JSON snapshots
//! - [`api`] - axum HTTP surface
//! - [`cli`] and [`config`] - Argument parsing and service configuration
//!
//! # Tiers
//!
//! A member's tier is derived from lifetime points only:
//!
//! - **Silver**: below 10,000
//! - **Gold**: 10,000 to 49,999
//! - **Platinum**: 50,000 and above

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod types;

pub use core::{
    DisbursementEngine, EngineConfig, InMemoryLedgerStore, LedgerStore, LoyaltyEngine,
    TransactionStateMachine,
};
pub use io::{match_rows, MatchReport, Snapshot};
pub use types::{
    LedgerEntry, LoyaltyError, Member, ResolveAction, StoreError, Tier, Transaction,
    TransactionStatus,
};
