//! Subcommand runners
//!
//! The offline subcommands load a [`Snapshot`] into an in-memory store, run
//! one engine operation, print the JSON result to `output` and, when the run
//! changed the ledger, write the snapshot back.

use super::{EngineArgs, ListArgs, ReconcileArgs, RepairArgs};
use crate::api::{self, AppState};
use crate::config::ServerConfig;
use crate::core::{InMemoryLedgerStore, LedgerStore, LoyaltyEngine, ReconciliationResult, RepairReport};
use crate::io::{write_rows_csv, Snapshot};
use crate::types::{LoyaltyError, Transaction};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

fn load_store(path: &Path) -> Result<Arc<InMemoryLedgerStore>, LoyaltyError> {
    let snapshot = Snapshot::load(path)?;
    info!(
        path = %path.display(),
        members = snapshot.members.len(),
        transactions = snapshot.transactions.len(),
        "snapshot loaded"
    );
    Ok(Arc::new(snapshot.into_store()))
}

fn save_store(store: &InMemoryLedgerStore, path: &Path) -> Result<(), LoyaltyError> {
    Snapshot::from_store(store).save(path)?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

fn engine_for(store: &Arc<InMemoryLedgerStore>, engine_args: &EngineArgs) -> LoyaltyEngine {
    let shared: Arc<dyn LedgerStore> = store.clone();
    LoyaltyEngine::new(shared, engine_args.to_engine_config())
}

fn write_json<T: Serialize>(output: &mut dyn Write, value: &T) -> Result<(), LoyaltyError> {
    serde_json::to_writer_pretty(&mut *output, value)
        .map_err(|e| LoyaltyError::internal(format!("Failed to write output: {}", e)))?;
    writeln!(output)?;
    Ok(())
}

/// Match a CSV export against the snapshot's pending transactions
pub async fn reconcile(
    args: &ReconcileArgs,
    engine_args: &EngineArgs,
    output: &mut dyn Write,
) -> Result<ReconciliationResult, LoyaltyError> {
    let csv_text = fs::read_to_string(&args.csv).map_err(|e| {
        LoyaltyError::invalid_input(format!("Failed to read '{}': {}", args.csv.display(), e))
    })?;
    let store = load_store(&args.snapshot)?;
    let engine = engine_for(&store, engine_args);

    let result = engine.reconcile(&csv_text, &args.actor, args.apply).await?;

    if let Some(path) = &args.unmatched_out {
        let mut file = File::create(path)?;
        write_rows_csv(&result.report.unmatched, &mut file).map_err(LoyaltyError::internal)?;
    }
    if result.summary.is_some() {
        save_store(&store, &args.snapshot)?;
    }

    write_json(output, &result)?;
    Ok(result)
}

/// Re-run disbursement for verified transactions in the snapshot
pub async fn repair(
    args: &RepairArgs,
    engine_args: &EngineArgs,
    output: &mut dyn Write,
) -> Result<RepairReport, LoyaltyError> {
    let store = load_store(&args.snapshot)?;
    let engine = engine_for(&store, engine_args);

    let report = engine.repair(&args.actor).await?;
    if report.repaired > 0 {
        save_store(&store, &args.snapshot)?;
    }

    write_json(output, &report)?;
    Ok(report)
}

pub async fn list(
    args: &ListArgs,
    engine_args: &EngineArgs,
    output: &mut dyn Write,
) -> Result<Vec<Transaction>, LoyaltyError> {
    let store = load_store(&args.snapshot)?;
    let engine = engine_for(&store, engine_args);

    let transactions = engine.list_recent(args.limit).await?;
    write_json(output, &transactions)?;
    Ok(transactions)
}

/// Serve the HTTP API until ctrl-c
///
/// A configured snapshot that does not exist yet starts an empty store; on
/// shutdown the store is written to that path.
pub async fn serve(config: ServerConfig) -> Result<(), LoyaltyError> {
    let store = match &config.snapshot {
        Some(path) if path.exists() => load_store(path)?,
        Some(path) => {
            warn!(path = %path.display(), "snapshot not found, starting with an empty store");
            Arc::new(InMemoryLedgerStore::new())
        }
        None => Arc::new(InMemoryLedgerStore::new()),
    };

    let shared: Arc<dyn LedgerStore> = store.clone();
    let engine = LoyaltyEngine::new(shared, config.engine.clone());
    let app = api::router(AppState::new(engine, config.allowed_roles.clone()));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, roles = ?config.allowed_roles, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(path) = &config.snapshot {
        save_store(&store, path)?;
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
