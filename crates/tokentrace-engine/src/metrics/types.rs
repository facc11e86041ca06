use chrono::{DateTime, Utc};
use serde::Serialize;
use tokentrace_types::EventKind;

/// Number of trailing minute buckets kept in the time series
pub const DEFAULT_BUCKET_WINDOW: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetricsScope {
    #[default]
    All,
    Session(String),
}

/// Inputs that are not part of the event sequence.
///
/// `now` stands in for unparseable timestamps; passing it explicitly keeps
/// aggregation deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsOptions {
    pub now: DateTime<Utc>,
    pub window: usize,
}

impl MetricsOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            window: DEFAULT_BUCKET_WINDOW,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub total_events: usize,
    pub total_tokens: usize,
    pub latency_samples: usize,
    pub average_latency_ms: f64,
    pub average_step_ms: f64,
    pub tokens_per_second: f64,
    /// Events whose timestamp could not be parsed
    pub approximate_events: usize,
    pub time_series: Vec<TimeBucket>,
    pub distribution: Vec<KindShare>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSummary>,
}

/// One-minute window of the time series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub minute: DateTime<Utc>,
    /// `HH:MM`
    pub label: String,
    /// Built from the processing instant, not from logged timestamps
    pub approximate: bool,
    pub events: usize,
    pub tokens: usize,
    pub latency_samples: usize,
    /// Mean step latency in this minute, 0 when no samples
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindShare {
    pub kind: EventKind,
    pub count: usize,
    /// Share of all events in scope, 0-100
    pub percentage: f64,
}

/// Model shape from the first `model_metrics` record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub n_vocab: u64,
    pub n_layer: u64,
    pub n_embd: u64,
    pub n_head: u64,
    pub n_head_kv: u64,
    pub n_ctx_train: u64,
    pub model_size_mb: f64,
    pub n_ctx: u64,
    pub n_batch: u64,
    pub estimated_memory_gib: f64,
}
