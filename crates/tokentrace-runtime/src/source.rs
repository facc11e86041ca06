use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokentrace_decoder::{IncrementalBatch, LogSnapshot, split_lines};

use crate::{Error, Result};

/// Where trace lines come from: full snapshots, or the tail from a line offset.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn snapshot(&self, session_id: &str) -> Result<LogSnapshot>;

    async fn incremental(&self, session_id: &str, from_line: usize) -> Result<IncrementalBatch>;

    /// Human-readable origin, for logs and status lines
    fn describe(&self) -> String;
}

/// JSONL trace file on disk.
///
/// The file may hold several sessions; the session id is carried through
/// but does not filter lines. An unterminated last line is still being
/// written and is not reported.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn complete_lines(&self) -> Result<Vec<String>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let mut lines: Vec<String> = split_lines(&text).into_iter().map(str::to_string).collect();
        if !text.is_empty() && !text.ends_with('\n') {
            lines.pop();
        }
        Ok(lines)
    }
}

#[async_trait]
impl LogSource for FileSource {
    async fn snapshot(&self, session_id: &str) -> Result<LogSnapshot> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(LogSnapshot {
            session_id: Some(session_id.to_string()),
            logs: Some(text),
            logs_b64: None,
        })
    }

    async fn incremental(&self, session_id: &str, from_line: usize) -> Result<IncrementalBatch> {
        let lines = self.complete_lines().await?;
        let start = from_line.min(lines.len());
        Ok(IncrementalBatch {
            session_id: Some(session_id.to_string()),
            from_line: start,
            total_lines: lines.len(),
            new_lines: lines[start..].to_vec(),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Monitoring server's log endpoints
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::trace!(url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map an error response `{error, details?}` (or any body) to `Error::Server`
pub(crate) fn server_error(status: u16, body: &str) -> Error {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error,
            details: Some(details),
        }) => format!("{} ({})", error, details),
        Ok(ErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    };
    Error::Server { status, message }
}

#[async_trait]
impl LogSource for HttpSource {
    async fn snapshot(&self, session_id: &str) -> Result<LogSnapshot> {
        let url = format!("{}/logs/{}", self.base_url, session_id);
        self.get_json(&url).await
    }

    async fn incremental(&self, session_id: &str, from_line: usize) -> Result<IncrementalBatch> {
        let url = format!(
            "{}/logs/{}/stream?from_line={}",
            self.base_url, session_id, from_line
        );
        self.get_json(&url).await
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokentrace_testing::TraceBuilder;

    #[tokio::test]
    async fn test_file_incremental_from_offset() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("trace.jsonl");
        let trace = TraceBuilder::new("s").session_start("p").token(1, "a", 0.5).session_end(1, 10.0);
        std::fs::write(&path, trace.build())?;

        let source = FileSource::new(&path);
        let batch = source.incremental("s", 1).await?;
        assert_eq!(batch.total_lines, 3);
        assert_eq!(batch.new_lines.len(), 2);
        assert_eq!(batch.first_line(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_incremental_skips_partial_line() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("trace.jsonl");
        std::fs::write(&path, "{\"event\":\"session_start\"}\n{\"event\":")?;

        let batch = FileSource::new(&path).incremental("s", 0).await?;
        assert_eq!(batch.total_lines, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_offset_past_end() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("trace.jsonl");
        std::fs::write(&path, "{}\n")?;

        let batch = FileSource::new(&path).incremental("s", 5).await?;
        assert!(batch.new_lines.is_empty());
        assert_eq!(batch.total_lines, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FileSource::new("/nonexistent/trace.jsonl");
        let err = source.snapshot("s").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport_failure());
    }

    #[test]
    fn test_server_error_body() {
        let err = server_error(404, r#"{"error":"Session not found"}"#);
        assert_eq!(err.to_string(), "Server returned 404: Session not found");
        assert!(!err.is_transport_failure());

        let err = server_error(500, r#"{"error":"Invalid JSON or processing error","details":"boom"}"#);
        assert!(err.to_string().contains("(boom)"));
        assert!(err.is_transport_failure());
    }
}
