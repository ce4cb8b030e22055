//! Benchmarks for reconciliation matching and bulk verification
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Inputs are generated in-process: `n` pending transactions and a CSV export
//! naming every transaction once plus 10% unknown ids.

use chrono::{Duration, TimeZone, Utc};
use loyalty_points_engine::core::{EngineConfig, InMemoryLedgerStore, LoyaltyEngine};
use loyalty_points_engine::io::match_rows;
use loyalty_points_engine::types::{Member, Transaction};
use std::fmt::Write;
use std::sync::Arc;

fn main() {
    divan::main();
}

const SIZES: &[usize] = &[100, 1_000, 10_000];

fn pending(n: usize) -> Vec<Transaction> {
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            Transaction::pending(
                format!("doc-{}", i),
                format!("transactions/doc-{}", i),
                format!("TX-{:06}", i),
                format!("m{}", i % 50),
                10,
                base + Duration::seconds(i as i64),
            )
        })
        .collect()
}

fn export(n: usize) -> String {
    let mut csv = String::from("TransactionId,Amount\n");
    for i in 0..n {
        let _ = writeln!(csv, "tx-{:06},10.00", i);
    }
    for i in 0..n / 10 {
        let _ = writeln!(csv, "UNKNOWN-{},1.00", i);
    }
    csv
}

#[divan::bench(args = SIZES)]
fn match_export(bencher: divan::Bencher, n: usize) {
    let transactions = pending(n);
    let csv = export(n);

    bencher.bench(|| match_rows(divan::black_box(&csv), divan::black_box(&transactions)));
}

#[divan::bench(args = SIZES)]
fn reconcile_and_apply(bencher: divan::Bencher, n: usize) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let csv = export(n);

    bencher
        .with_inputs(|| {
            let members = (0..50).map(|i| Member::new(format!("m{}", i))).collect();
            let store = Arc::new(InMemoryLedgerStore::seeded(members, pending(n)));
            LoyaltyEngine::new(store, EngineConfig {
                scan_cap: n,
                ..EngineConfig::default()
            })
        })
        .bench_values(|engine| {
            runtime
                .block_on(engine.reconcile(&csv, "bench", true))
                .expect("reconcile failed")
        });
}
