use crate::core::{BulkConfig, EngineConfig, RetryPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Verify loyalty transactions and disburse member points
#[derive(Parser, Debug)]
#[command(name = "loyalty-engine")]
#[command(about = "Verify loyalty transactions and disburse member points", long_about = None)]
pub struct CliArgs {
    /// Emit logs as JSON lines
    #[arg(long = "log-json", env = "LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Tunables shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Attempts per optimistic ledger update
    #[arg(
        long = "retry-attempts",
        value_name = "COUNT",
        env = "RETRY_ATTEMPTS",
        global = true,
        help = "Attempts per optimistic ledger update (default: 8)"
    )]
    pub retry_attempts: Option<u32>,

    /// Base backoff between conflicting attempts, in milliseconds
    #[arg(
        long = "retry-base-ms",
        value_name = "MS",
        env = "RETRY_BASE_MS",
        global = true,
        help = "Base backoff between conflicting attempts in ms (default: 5)"
    )]
    pub retry_base_ms: Option<u64>,

    /// Members processed concurrently in bulk operations
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        env = "MAX_CONCURRENT_MEMBERS",
        global = true,
        help = "Members processed concurrently in bulk operations (default: CPU cores)"
    )]
    pub max_concurrent_members: Option<usize>,

    /// Upper bound on transactions read by a scan
    #[arg(
        long = "scan-cap",
        value_name = "COUNT",
        env = "SCAN_CAP",
        global = true,
        help = "Upper bound on transactions read by a scan (default: 1000)"
    )]
    pub scan_cap: Option<usize>,

    /// Maximum transactions returned by a listing
    #[arg(
        long = "list-limit",
        value_name = "COUNT",
        env = "LIST_LIMIT",
        global = true,
        help = "Maximum transactions returned by a listing (default: 200)"
    )]
    pub list_limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Match a point-of-sale CSV export against pending transactions
    Reconcile(ReconcileArgs),
    /// Credit verified transactions whose points never landed
    Repair(RepairArgs),
    /// Print the newest transactions
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seed the store from this snapshot and write it back on shutdown
    #[arg(long, value_name = "FILE", env = "LEDGER_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Roles allowed to call the engine endpoints
    #[arg(
        long = "allowed-roles",
        env = "ALLOWED_ROLES",
        value_delimiter = ',',
        default_value = "admin,staff"
    )]
    pub allowed_roles: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Ledger snapshot to match against
    #[arg(long, value_name = "FILE", env = "LEDGER_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// CSV export from the point-of-sale system
    #[arg(long, value_name = "FILE")]
    pub csv: PathBuf,

    /// Verify matched transactions and save the snapshot
    #[arg(long)]
    pub apply: bool,

    /// Actor recorded on verified transactions
    #[arg(long, env = "ACTOR_ID", default_value = "cli")]
    pub actor: String,

    /// Also write unmatched rows as CSV to this file
    #[arg(long = "unmatched-out", value_name = "FILE")]
    pub unmatched_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RepairArgs {
    #[arg(long, value_name = "FILE", env = "LEDGER_SNAPSHOT")]
    pub snapshot: PathBuf,

    #[arg(long, env = "ACTOR_ID", default_value = "cli")]
    pub actor: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, value_name = "FILE", env = "LEDGER_SNAPSHOT")]
    pub snapshot: PathBuf,

    #[arg(long)]
    pub limit: Option<usize>,
}

impl EngineArgs {
    /// Create an EngineConfig from CLI arguments
    ///
    /// Unset values fall back to the defaults; zero values are replaced by
    /// the component constructors with a warning.
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();

        let retry = RetryPolicy::new(
            self.retry_attempts.unwrap_or(default.retry.max_attempts),
            self.retry_base_ms
                .map(Duration::from_millis)
                .unwrap_or(default.retry.base_delay),
            default.retry.max_delay,
        );
        let bulk = BulkConfig::new(
            self.max_concurrent_members
                .unwrap_or(default.bulk.max_concurrent_members),
            default.bulk.error_sample_limit,
        );

        EngineConfig {
            retry,
            bulk,
            list_limit: self.list_limit.unwrap_or(default.list_limit),
            scan_cap: self.scan_cap.unwrap_or(default.scan_cap),
        }
    }
}
