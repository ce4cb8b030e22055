//! I/O module
//!
//! Handles CSV reconciliation input and snapshot persistence.
//!
//! # Components
//!
//! - `csv_format` - CSV parsing, id matching and unmatched-row output
//! - `snapshot` - JSON snapshots for seeding the in-memory store

pub mod csv_format;
pub mod snapshot;

pub use csv_format::{match_rows, parse_rows, write_rows_csv, CsvRow, MatchReport};
pub use snapshot::Snapshot;
