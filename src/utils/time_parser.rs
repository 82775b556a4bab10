use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::errors::{HistoryError, Result};

/// 日期解析工具
///
/// Accepts RFC3339 instants or bare `YYYY-MM-DD` dates (read as UTC).
pub struct TimeParser;

impl TimeParser {
    /// Parse a range start. A bare date means the start of that day.
    pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        DateTime::parse_from_rfc3339(input)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NaiveDate::parse_from_str(input, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            })
    }

    /// Parse an inclusive range end. A bare date covers the whole day.
    pub fn parse_date_end(input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        DateTime::parse_from_rfc3339(input)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NaiveDate::parse_from_str(input, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_nano_opt(23, 59, 59, 999_999_999))
                    .map(|dt| dt.and_utc())
            })
    }

    /// Like [`TimeParser::parse_date`] but reports the bad input.
    pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
        Self::parse_date(input).ok_or_else(|| {
            HistoryError::date_parse(format!(
                "Invalid date format: '{}'. Supported formats: RFC3339 or YYYY-MM-DD",
                input
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_converts_to_utc() {
        let parsed = TimeParser::parse_date("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_bare_date_start_and_end() {
        let start = TimeParser::parse_date("2024-05-01").unwrap();
        let end = TimeParser::parse_date_end("2024-05-01").unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TimeParser::parse_date("yesterday").is_none());
        assert!(TimeParser::parse_date_end("2024-13-01").is_none());
        let err = TimeParser::parse_instant("01/05/2024").unwrap_err();
        assert_eq!(err.code(), "E010");
    }
}
