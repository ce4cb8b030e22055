//! Core business logic module
//!
//! This module contains the verification and disbursement components:
//! - `traits` - The `LedgerStore` capability injected into every component
//! - `memory_store` - In-memory versioned implementation of `LedgerStore`
//! - `optimistic` - Conflict-retrying read-modify-write
//! - `disbursement` - Crediting member ledgers exactly once
//! - `state_machine` - Pending -> verified / rejected transitions
//! - `bulk_processor` - Batch resolution with per-item outcomes
//! - `engine` - Facade wiring the components over one store
//! - `query` - Newest-first listings
//! - `repair` - Re-running disbursement for verified transactions

pub mod bulk_processor;
pub mod disbursement;
pub mod engine;
pub mod memory_store;
pub mod optimistic;
pub mod query;
pub mod repair;
pub mod state_machine;
pub mod traits;

pub use bulk_processor::{BulkConfig, BulkItemError, BulkProcessor, BulkSummary};
pub use disbursement::{DisbursementContext, DisbursementEngine, DisbursementOutcome};
pub use engine::{EngineConfig, LoyaltyEngine, ReconciliationResult};
pub use memory_store::InMemoryLedgerStore;
pub use optimistic::{with_optimistic_update, AttemptError, RetryPolicy};
pub use repair::{repair_unfunded, RepairReport};
pub use state_machine::{ResolveOutcome, TransactionStateMachine};
pub use traits::{LedgerStore, Versioned};
