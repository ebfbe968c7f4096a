//! SQL text and row conversion helpers for the Turso repositories.
//!
//! Statements are sent as plain text, so every string value embedded in one
//! must go through [`escape_sql_string`].

use chrono::{DateTime, NaiveDateTime, Utc};

use super::wire::Cell;

/// Storage format of timestamps: `YYYY-MM-DD HH:MM:SS`, UTC, no fraction.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote-escape a value for use inside a single-quoted SQL literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// `'value'` with quotes escaped.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp; `DateTime::<Utc>::MIN_UTC` when unreadable.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Positional access to the cells of one result row.
pub trait RowExt {
    /// Cell text at `index`; empty for NULL or a missing cell.
    fn text_at(&self, index: usize) -> String;

    /// Cell at `index` read as an integer; 0 when it is not one.
    fn i64_at(&self, index: usize) -> i64;
}

impl RowExt for [Cell] {
    fn text_at(&self, index: usize) -> String {
        self.get(index)
            .and_then(Cell::as_text)
            .unwrap_or_default()
    }

    fn i64_at(&self, index: usize) -> i64 {
        self.text_at(index).trim().parse().unwrap_or(0)
    }
}
