//! Loyalty Points Engine CLI
//!
//! # Usage
//!
//! ```bash
//! loyalty-engine serve --port 3000 --snapshot ledger.json
//! loyalty-engine reconcile --snapshot ledger.json --csv pos-export.csv --apply
//! loyalty-engine repair --snapshot ledger.json
//! loyalty-engine list --snapshot ledger.json --limit 20
//! ```
//!
//! Logging is controlled by `RUST_LOG`; `--log-json` switches to JSON lines.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable snapshot or CSV, bind failure, engine error, etc.)

use loyalty_points_engine::cli::{self, commands, Command};
use loyalty_points_engine::config::ServerConfig;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "loyalty_points_engine=info,tower_http=info";

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays parseable
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = cli::parse_args();
    init_tracing(args.log_json);

    let mut output = std::io::stdout();
    let result = match &args.command {
        Command::Serve(serve) => commands::serve(ServerConfig::from_args(serve, &args.engine)).await,
        Command::Reconcile(reconcile) => commands::reconcile(reconcile, &args.engine, &mut output)
            .await
            .map(|_| ()),
        Command::Repair(repair) => commands::repair(repair, &args.engine, &mut output)
            .await
            .map(|_| ()),
        Command::List(list) => commands::list(list, &args.engine, &mut output)
            .await
            .map(|_| ()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        process::exit(1);
    }
}
