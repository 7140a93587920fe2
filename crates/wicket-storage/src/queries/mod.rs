// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for conversations and messages.

pub mod conversations;
pub mod messages;

use chrono::{DateTime, Utc};

/// Canonical timestamp format written to the database.
///
/// Matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` so that
/// Rust-written and SQL-written timestamps stay lexicographically
/// comparable in `WHERE` clauses.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parse a stored timestamp back into `DateTime<Utc>`.
pub(crate) fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips() {
        let now = Utc::now();
        let s = fmt_ts(now);
        let parsed = parse_ts(0, &s).unwrap();
        // Sub-millisecond precision is dropped by the storage format.
        assert!((now - parsed).num_milliseconds().abs() <= 1);
        assert!(s.ends_with('Z'));
    }

    #[test]
    fn format_is_lexicographically_ordered() {
        let early = Utc::now();
        let late = early + chrono::Duration::seconds(90);
        assert!(fmt_ts(early) < fmt_ts(late));
    }
}
