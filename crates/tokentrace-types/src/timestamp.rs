use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp as written by the backend, plus its UTC instant when parseable.
///
/// The raw text is kept verbatim so views can show exactly what the log said,
/// even when the value could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instant: Option<DateTime<Utc>>,
}

impl Timestamp {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            instant: parse_timestamp(raw),
        }
    }

    /// A timestamp for records that carried none at all.
    pub fn missing() -> Self {
        Self {
            raw: String::new(),
            instant: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    pub fn is_parsed(&self) -> bool {
        self.instant.is_some()
    }
}

/// Parse the two textual forms the instrumented backend emits.
///
/// Accepted:
/// - RFC 3339 / ISO-8601 (`2025-08-22T22:27:42.800Z`, offsets allowed)
/// - ISO-8601 without zone, interpreted as UTC
/// - `YYYY-MM-DD HH:mm:ss.mmm`: the space is replaced by `T`, UTC assumed
/// - a bare date, taken as midnight UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = if trimmed.contains('T') {
        trimmed.to_string()
    } else {
        trimmed.replacen(' ', "T", 1)
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(stripped) = normalized.strip_suffix('Z')
        && let Some(naive) = parse_naive(stripped)
    {
        return Some(naive.and_utc());
    }

    if let Some(naive) = parse_naive(&normalized) {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// Truncate an instant to the start of its minute.
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_iso_with_zone() {
        let parsed = parse_timestamp("2025-08-22T22:27:42.800Z").unwrap();
        assert_eq!(parsed.timestamp_millis() % 1000, 800);
        assert_eq!(
            truncate_to_minute(parsed),
            Utc.with_ymd_and_hms(2025, 8, 22, 22, 27, 0).unwrap()
        );
    }

    #[test]
    fn test_space_separated_form_matches_iso() {
        let spaced = parse_timestamp("2025-08-22 22:27:42.800");
        let iso = parse_timestamp("2025-08-22T22:27:42.800Z");
        assert!(spaced.is_some());
        assert_eq!(spaced, iso);
    }

    #[test]
    fn test_offset_is_converted_to_utc() {
        let parsed = parse_timestamp("2025-08-22T23:27:42+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 8, 22, 22, 27, 42).unwrap());
    }

    #[test]
    fn test_zoneless_iso_assumes_utc() {
        let parsed = parse_timestamp("2025-08-22T22:27:42").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 8, 22, 22, 27, 42).unwrap());
    }

    #[test]
    fn test_unparseable_values() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("1724365662800000").is_none());
    }

    #[test]
    fn test_timestamp_keeps_raw_text() {
        let ts = Timestamp::parse("not a time");
        assert_eq!(ts.raw(), "not a time");
        assert!(!ts.is_parsed());
    }
}
