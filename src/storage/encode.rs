//! Conversions between domain values and their SQLite text form.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::DateParse(format!("{s:?}: {e}")))
}

/// Column defaults come back from `pragma_table_info` as SQL literals.
pub fn strip_sql_quotes(literal: &str) -> &str {
    literal
        .trim()
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(literal.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert!(encode_dt(early) < encode_dt(late));
        assert_eq!(encode_dt(early), "2024-01-01T09:00:00.000Z");
        assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
    }

    #[test]
    fn strips_literal_quotes() {
        assert_eq!(strip_sql_quotes("'2024-01-01T00:00:00.000Z'"), "2024-01-01T00:00:00.000Z");
        assert_eq!(strip_sql_quotes("plain"), "plain");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_dt("yesterday").is_err());
    }
}
