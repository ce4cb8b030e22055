//! Read-only transaction listing for audit screens

use super::traits::LedgerStore;
use crate::types::{LoyaltyError, Transaction, TransactionStatus};

/// Default number of transactions returned by [`list_recent`]
pub const DEFAULT_LIST_LIMIT: usize = 200;

/// Default upper bound on documents read by a scan
pub const DEFAULT_SCAN_CAP: usize = 1000;

/// Newest-first listing of at most `limit` transactions
///
/// Reads at most `scan_cap` documents and sorts in memory, since the store is
/// not assumed to have an index on `createdAt`. Ties keep doc path order so
/// the output is stable. Store failures are returned as-is, without retry.
pub async fn list_recent(
    store: &dyn LedgerStore,
    limit: usize,
    scan_cap: usize,
) -> Result<Vec<Transaction>, LoyaltyError> {
    let mut transactions = store.scan_transactions(scan_cap).await?;
    sort_newest_first(&mut transactions);
    transactions.truncate(limit);
    Ok(transactions)
}

/// All pending transactions within the scan cap, newest first
pub async fn list_pending(
    store: &dyn LedgerStore,
    scan_cap: usize,
) -> Result<Vec<Transaction>, LoyaltyError> {
    list_by_status(store, TransactionStatus::Pending, scan_cap).await
}

/// All transactions with `status` within the scan cap, newest first
pub async fn list_by_status(
    store: &dyn LedgerStore,
    status: TransactionStatus,
    scan_cap: usize,
) -> Result<Vec<Transaction>, LoyaltyError> {
    let mut transactions: Vec<Transaction> = store
        .scan_transactions(scan_cap)
        .await?
        .into_iter()
        .filter(|tx| tx.status == status)
        .collect();
    sort_newest_first(&mut transactions);
    Ok(transactions)
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.doc_path.cmp(&b.doc_path))
    });
}
