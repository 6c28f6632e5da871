use anyhow::{Context, Result};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use serde_json::Value;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Numeric timestamps below this are epoch seconds rather than milliseconds.
pub const EPOCH_SECONDS_THRESHOLD: i64 = 2_000_000_000;

/// ISO forms outside RFC 3339: offsets without a colon, or no seconds.
/// `%#z` also takes `Z`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Handles parsing timestamps from the encodings the supported tools write
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a raw JSON value into epoch milliseconds.
    ///
    /// Numbers below [`EPOCH_SECONDS_THRESHOLD`] are read as seconds. Strings
    /// may be RFC 3339, naive date-times (read in `offset`), bare dates, or
    /// digit strings. Anything else yields `None`.
    pub fn parse_value(raw: &Value, offset: FixedOffset) -> Option<i64> {
        match raw {
            Value::Number(number) => {
                let value = number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|float| float as i64))?;
                Some(Self::normalize_epoch(value))
            }
            Value::String(text) => Self::parse_str(text, offset),
            _ => None,
        }
    }

    pub fn parse_str(raw: &str, offset: FixedOffset) -> Option<i64> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.chars().all(|ch| ch.is_ascii_digit()) {
            return raw.parse::<i64>().ok().map(Self::normalize_epoch);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.timestamp_millis());
        }

        // Some writers emit a space instead of the `T` separator
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw.replacen(' ', "T", 1)) {
            return Some(dt.timestamp_millis());
        }

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                return Some(dt.timestamp_millis());
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.timestamp_millis());
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.timestamp_millis());
        }

        None
    }

    pub fn normalize_epoch(value: i64) -> i64 {
        if value < EPOCH_SECONDS_THRESHOLD {
            value.saturating_mul(1000)
        } else {
            value
        }
    }
}

/// Converts epoch milliseconds to local calendar values with a UTC offset
/// fixed at construction, so every conversion in a run agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    offset: FixedOffset,
}

impl LocalClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Capture the host's current offset.
    pub fn from_system() -> Self {
        Self::new(Local::now().offset().fix())
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Parse an offset such as `+09:00`, `-0530`, or `Z`.
    pub fn from_offset_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return Ok(Self::utc());
        }
        let probe = format!("2000-01-01T00:00:00{}", raw);
        let parsed = DateTime::parse_from_rfc3339(&probe)
            .or_else(|_| DateTime::parse_from_str(&probe, "%Y-%m-%dT%H:%M:%S%z"))
            .with_context(|| format!("Invalid UTC offset: {}", raw))?;
        Ok(Self::new(*parsed.offset()))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn parse(&self, raw: &Value) -> Option<i64> {
        TimestampParser::parse_value(raw, self.offset)
    }

    fn local(&self, epoch_ms: i64) -> Option<DateTime<FixedOffset>> {
        DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|dt| dt.with_timezone(&self.offset))
    }

    pub fn to_local_date(&self, epoch_ms: i64) -> Option<String> {
        self.local(epoch_ms)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
    }

    pub fn to_local_time(&self, epoch_ms: i64) -> Option<String> {
        self.local(epoch_ms).map(|dt| dt.format("%H:%M").to_string())
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }

    pub fn current_month(&self) -> String {
        self.now().format("%Y-%m").to_string()
    }
}

/// Last-modified time of `path` in epoch milliseconds.
pub fn file_modified_ms(path: &Path) -> Result<i64> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("Failed to read modification time: {}", path.display()))?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .with_context(|| format!("Modification time before epoch: {}", path.display()))?;
    Ok(since_epoch.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    #[test]
    fn test_parse_epoch_millis_passthrough() {
        let result = TimestampParser::parse_value(&json!(1_736_503_200_000i64), utc());
        assert_eq!(result, Some(1_736_503_200_000));
    }

    #[test]
    fn test_parse_epoch_seconds_heuristic() {
        let result = TimestampParser::parse_value(&json!(1_700_000_000), utc());
        assert_eq!(result, Some(1_700_000_000_000));
    }

    #[test]
    fn test_parse_z_suffix() {
        let result = TimestampParser::parse_str("2025-01-10T10:00:00Z", utc());
        assert_eq!(result, Some(1_736_503_200_000));
    }

    #[test]
    fn test_parse_timezone() {
        let result = TimestampParser::parse_str("2025-01-10T19:00:00.000+09:00", utc());
        assert_eq!(result, Some(1_736_503_200_000));
    }

    #[test]
    fn test_parse_offset_without_colon_or_seconds() {
        let expected = Some(1_736_503_200_000);
        assert_eq!(TimestampParser::parse_str("2025-01-10T10:00Z", utc()), expected);
        assert_eq!(TimestampParser::parse_str("2025-01-10T10:00:00+0000", utc()), expected);
        assert_eq!(TimestampParser::parse_str("2025-01-10T19:00:00.000+0900", utc()), expected);
        assert_eq!(TimestampParser::parse_str("2025-01-10T05:00-05:00", utc()), expected);
    }

    #[test]
    fn test_parse_naive_uses_offset() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let result = TimestampParser::parse_str("2025-01-10T19:00:00", tokyo);
        assert_eq!(result, Some(1_736_503_200_000));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(TimestampParser::parse_str("invalid", utc()), None);
        assert_eq!(TimestampParser::parse_value(&json!(null), utc()), None);
        assert_eq!(TimestampParser::parse_value(&json!({"a": 1}), utc()), None);
    }

    #[test]
    fn test_local_date_and_time_respect_offset() {
        let clock = LocalClock::from_offset_str("+09:00").unwrap();
        // 2025-01-10T20:30:00Z is the next morning in Tokyo
        let ms = TimestampParser::parse_str("2025-01-10T20:30:00Z", utc()).unwrap();
        assert_eq!(clock.to_local_date(ms).as_deref(), Some("2025-01-11"));
        assert_eq!(clock.to_local_time(ms).as_deref(), Some("05:30"));

        let utc_clock = LocalClock::utc();
        assert_eq!(utc_clock.to_local_date(ms).as_deref(), Some("2025-01-10"));
        assert_eq!(utc_clock.to_local_time(ms).as_deref(), Some("20:30"));
    }

    #[test]
    fn test_offset_parsing() {
        assert_eq!(LocalClock::from_offset_str("Z").unwrap(), LocalClock::utc());
        assert_eq!(
            LocalClock::from_offset_str("-05:30").unwrap().offset(),
            FixedOffset::west_opt(5 * 3600 + 1800).unwrap()
        );
        assert!(LocalClock::from_offset_str("tomorrow").is_err());
    }
}
