use serde::Serialize;
use tokentrace_types::EventKind;

use super::types::{Session, SessionStatus};

/// Serializable overview of one session for listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub event_count: usize,
    pub token_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
    pub generated_text: String,
    /// Summed per-token layer timings
    #[serde(skip_serializing_if = "is_zero")]
    pub layer_time_us: u64,
    /// Footer layer statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_layers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_layer_time_us: Option<f64>,
}

pub fn summarize(session: &Session) -> SessionSummary {
    SessionSummary {
        session_id: session.session_id.clone(),
        status: session.status,
        prompt: session.prompt.clone(),
        event_count: session.event_count(),
        token_count: session.count(EventKind::SamplingState),
        duration_ms: session.duration_ms(),
        tokens_per_second: session
            .tokens_per_second()
            .map(|tps| (tps * 100.0).round() / 100.0),
        generated_text: session.generated_text(),
        layer_time_us: session.layer_time_us(),
        total_layers: session.end().and_then(|end| end.total_layers),
        average_layer_time_us: session.end().and_then(|end| end.average_layer_time_us),
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
