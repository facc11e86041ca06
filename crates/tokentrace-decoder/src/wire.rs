use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Full-snapshot response of the log source: `{session_id, logs?, logs_b64?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_b64: Option<String>,
}

impl LogSnapshot {
    /// Log text carried by the snapshot
    pub fn text(&self) -> String {
        decode_container(self.logs_b64.as_deref(), self.logs.as_deref())
    }
}

/// Incremental response: lines from `from_line` onward, plus the total line
/// count the source holds after this batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalBatch {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub from_line: usize,
    #[serde(default)]
    pub new_lines: Vec<String>,
    pub total_lines: usize,
}

impl IncrementalBatch {
    /// Absolute index of `new_lines[0]`
    pub fn first_line(&self) -> usize {
        self.total_lines.saturating_sub(self.new_lines.len())
    }
}

/// Resolve the log text of a response.
///
/// `logs_b64` wins when present and decodable; its bytes are read as UTF-8
/// with invalid sequences replaced. Otherwise the plain `logs` text is used.
pub fn decode_container(logs_b64: Option<&str>, logs: Option<&str>) -> String {
    if let Some(encoded) = logs_b64 {
        match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => return String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!("logs_b64 is not valid base64 ({}); using plain logs", err);
            }
        }
    }
    logs.unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_preferred_over_plain() {
        let encoded = STANDARD.encode("{\"event\":\"session_start\"}\n");
        let text = decode_container(Some(&encoded), Some("ignored"));
        assert_eq!(text, "{\"event\":\"session_start\"}\n");
    }

    #[test]
    fn test_invalid_base64_falls_back() {
        assert_eq!(decode_container(Some("%%%"), Some("plain")), "plain");
        assert_eq!(decode_container(Some("%%%"), None), "");
    }

    #[test]
    fn test_multibyte_text_survives_base64() {
        let original = "{\"text\":\"\u{4f60}\u{597d} \u{1f600}\"}";
        let encoded = STANDARD.encode(original);
        assert_eq!(decode_container(Some(&encoded), None), original);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let encoded = STANDARD.encode([b'a', 0xff, b'b']);
        assert_eq!(decode_container(Some(&encoded), None), "a\u{fffd}b");
    }

    #[test]
    fn test_snapshot_deserialize() {
        let snapshot: LogSnapshot =
            serde_json::from_str(r#"{"session_id":"s1","logs":"line"}"#).unwrap();
        assert_eq!(snapshot.text(), "line");
    }

    #[test]
    fn test_incremental_first_line() {
        let batch: IncrementalBatch = serde_json::from_str(
            r#"{"session_id":"s1","from_line":3,"new_lines":["a","b"],"total_lines":5}"#,
        )
        .unwrap();
        assert_eq!(batch.first_line(), 3);
    }
}
