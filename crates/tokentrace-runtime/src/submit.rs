use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokentrace_decoder::decode_container;
use tokentrace_types::SubmitRequest;

use crate::source::server_error;
use crate::Result;

/// Reply to `POST /log-monitoring`.
///
/// Only `session_id` is required; the server may inline the finished log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitResponse {
    pub session_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub log_file_path: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub logs_b64: Option<String>,
}

impl SubmitResponse {
    /// Inlined log text, if the server returned any
    pub fn log_text(&self) -> Option<String> {
        if self.logs.is_none() && self.logs_b64.is_none() {
            return None;
        }
        Some(decode_container(self.logs_b64.as_deref(), self.logs.as_deref()))
    }
}

/// Sends prompts to the monitoring server
#[derive(Debug, Clone)]
pub struct SubmitClient {
    client: Client,
    base_url: String,
}

impl SubmitClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/log-monitoring", self.base_url)
    }

    /// Submit a sanitized request. Blocks until the server answers, which
    /// for this endpoint means after inference has finished.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        let url = self.endpoint();
        tracing::debug!(url = %url, method = %request.sampling.method, "submitting prompt");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }

        let reply: SubmitResponse = serde_json::from_str(&body)?;
        tracing::info!(session_id = %reply.session_id, "prompt accepted");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_inline_logs() {
        let reply: SubmitResponse = serde_json::from_str(
            r#"{"session_id":"abc","log_file_path":"/tmp/abc.jsonl","logs":"{}\n","status":"completed"}"#,
        )
        .unwrap();
        assert_eq!(reply.session_id, "abc");
        assert_eq!(reply.status.as_deref(), Some("completed"));
        assert_eq!(reply.log_text().as_deref(), Some("{}\n"));
    }

    #[test]
    fn test_response_prefers_base64_logs() {
        let reply: SubmitResponse =
            serde_json::from_str(r#"{"session_id":"abc","logs":"plain","logs_b64":"ZW5jb2RlZA=="}"#)
                .unwrap();
        assert_eq!(reply.log_text().as_deref(), Some("encoded"));
    }

    #[test]
    fn test_response_without_logs() {
        let reply: SubmitResponse = serde_json::from_str(r#"{"session_id":"abc"}"#).unwrap();
        assert_eq!(reply.log_text(), None);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = SubmitClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/log-monitoring");
    }
}
