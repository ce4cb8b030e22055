//! CSV reconciliation matching
//!
//! This module centralizes all CSV format concerns for reconciliation:
//! - Parsing a point-of-sale export into `CsvRow`s with lowercased headers
//! - Extracting the transaction identifier from any accepted header alias
//! - Partitioning rows into matched transactions and unmatched rows
//! - Writing unmatched rows back out for operator review
//!
//! All functions are pure (no store access) for easy testing. Malformed rows
//! never produce an error; they land in `unmatched`.

use crate::types::{DocPath, Transaction};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Write;

/// Header names, compared case-insensitively, that carry the transaction id
///
/// Earlier aliases win when a row has more than one.
pub const TRANSACTION_ID_ALIASES: [&str; 4] = ["transactionid", "transaction_id", "id", "txid"];

/// One data row of the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    /// 1-based line in the input, header included
    pub line: u64,
    /// Value of the first non-empty id alias
    pub transaction_id: Option<String>,
    /// Field values keyed by lowercased header
    pub fields: BTreeMap<String, String>,
    /// Why the row could not be read, if it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rows partitioned against the pending transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    /// Matched transactions, in the order their first row appeared
    pub matched: Vec<Transaction>,
    /// Rows with no identifier or no matching pending transaction
    pub unmatched: Vec<CsvRow>,
    /// Rows that matched a transaction an earlier row already matched
    pub duplicates: Vec<CsvRow>,
}

impl MatchReport {
    /// Doc paths to hand to the bulk processor
    pub fn matched_doc_paths(&self) -> Vec<DocPath> {
        self.matched.iter().map(|tx| tx.doc_path.clone()).collect()
    }
}

/// Parse a header-first CSV export into rows
///
/// Headers are trimmed and lowercased. Blank rows are dropped. Surplus fields
/// past the header width are kept as `column_N`.
pub fn parse_rows(csv_text: &str) -> Vec<CsvRow> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect(),
        Err(error) => {
            tracing::warn!(%error, "unreadable CSV header, no rows parsed");
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        match result {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let fields: BTreeMap<String, String> = record
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let key = headers
                            .get(i)
                            .filter(|h| !h.is_empty())
                            .cloned()
                            .unwrap_or_else(|| format!("column_{}", i + 1));
                        (key, value.to_string())
                    })
                    .collect();
                rows.push(CsvRow {
                    line: record.position().map(|p| p.line()).unwrap_or(fallback_line),
                    transaction_id: extract_transaction_id(&fields),
                    fields,
                    error: None,
                });
            }
            Err(error) => rows.push(CsvRow {
                line: error
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line),
                transaction_id: None,
                fields: BTreeMap::new(),
                error: Some(error.to_string()),
            }),
        }
    }

    rows
}

/// First non-empty value among the id aliases
pub fn extract_transaction_id(fields: &BTreeMap<String, String>) -> Option<String> {
    TRANSACTION_ID_ALIASES
        .iter()
        .filter_map(|alias| fields.get(*alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Match export rows to pending transactions
///
/// A row matches when its identifier equals, ignoring case, a transaction's
/// `docId` or `transactionId`. A `docId` match takes precedence. A
/// `transactionId` is only unique per store and day, so each row takes the
/// first pending transaction with that id, in input order, that no earlier
/// row has taken. Rows whose candidates are all taken are duplicates.
/// Transactions that are not pending are ignored.
pub fn match_rows(csv_text: &str, pending: &[Transaction]) -> MatchReport {
    let candidates: Vec<&Transaction> = pending.iter().filter(|tx| tx.is_pending()).collect();

    let mut by_doc_id: HashMap<String, usize> = HashMap::new();
    let mut by_transaction_id: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, tx) in candidates.iter().enumerate() {
        if !tx.doc_id.is_empty() {
            by_doc_id.entry(tx.doc_id.to_lowercase()).or_insert(index);
        }
        if !tx.transaction_id.is_empty() {
            by_transaction_id
                .entry(tx.transaction_id.to_lowercase())
                .or_default()
                .push(index);
        }
    }

    let mut report = MatchReport::default();
    let mut matched: HashSet<usize> = HashSet::new();

    for row in parse_rows(csv_text) {
        let Some(key) = row.transaction_id.as_ref().map(|id| id.to_lowercase()) else {
            report.unmatched.push(row);
            continue;
        };

        let doc_hit = by_doc_id.get(&key).copied();
        let shared = by_transaction_id.get(&key).map(Vec::as_slice).unwrap_or_default();
        let free = doc_hit
            .filter(|index| !matched.contains(index))
            .or_else(|| shared.iter().copied().find(|index| !matched.contains(index)));

        match free {
            Some(index) => {
                matched.insert(index);
                report.matched.push(candidates[index].clone());
            }
            None if doc_hit.is_some() || !shared.is_empty() => report.duplicates.push(row),
            None => report.unmatched.push(row),
        }
    }

    report
}

/// Write rows as CSV with the union of their columns
///
/// Columns are `line`, then every field key in sorted order, then `error`.
/// Missing values are written empty.
pub fn write_rows_csv(rows: &[CsvRow], output: &mut dyn Write) -> Result<(), String> {
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.fields.keys().map(String::as_str))
        .collect();

    let mut writer = WriterBuilder::new().from_writer(output);

    let mut header = vec!["line"];
    header.extend(columns.iter().copied());
    header.push("error");
    writer
        .write_record(&header)
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for row in rows {
        let mut record = vec![row.line.to_string()];
        record.extend(
            columns
                .iter()
                .map(|column| row.fields.get(*column).cloned().unwrap_or_default()),
        );
        record.push(row.error.clone().unwrap_or_default());
        writer
            .write_record(&record)
            .map_err(|e| format!("Failed to write row {}: {}", row.line, e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
