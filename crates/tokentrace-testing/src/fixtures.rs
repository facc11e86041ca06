//! Fixtures for trace log generation.
//!
//! Provides a builder that writes records in the same shape the
//! instrumented inference backend emits, one JSON object per line.

use chrono::{Duration, NaiveDateTime};
use serde_json::{Value, json};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const DEFAULT_START: &str = "2025-08-22 22:27:42.000";

/// Fluent JSONL trace builder.
///
/// Every record advances an internal clock by `tick` (100 ms by default),
/// so timestamps are strictly increasing unless set explicitly.
///
/// # Example
/// ```
/// use tokentrace_testing::TraceBuilder;
///
/// let log = TraceBuilder::new("sess_1")
///     .session_start("Say hello")
///     .token(15043, "Hello", 0.42)
///     .session_end(1, 120.0)
///     .build();
/// assert_eq!(log.lines().count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    session_id: Option<String>,
    tag_tokens: bool,
    clock: NaiveDateTime,
    tick: Duration,
    lines: Vec<String>,
}

impl TraceBuilder {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            tag_tokens: true,
            clock: parse_clock(DEFAULT_START),
            tick: Duration::milliseconds(100),
            lines: Vec::new(),
        }
    }

    /// Switch the session id written on subsequent records.
    pub fn session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    /// Write `sampling_state` records without a `session_id`.
    pub fn untagged_tokens(mut self) -> Self {
        self.tag_tokens = false;
        self
    }

    /// Set the clock, `YYYY-MM-DD HH:MM:SS.mmm`.
    pub fn at(mut self, timestamp: &str) -> Self {
        self.clock = parse_clock(timestamp);
        self
    }

    /// Move the clock forward.
    pub fn advance_ms(mut self, ms: i64) -> Self {
        self.clock += Duration::milliseconds(ms);
        self
    }

    pub fn tick_ms(mut self, ms: i64) -> Self {
        self.tick = Duration::milliseconds(ms);
        self
    }

    pub fn session_start(self, prompt: &str) -> Self {
        self.record("session_start", json!({ "prompt": prompt }), true)
    }

    pub fn model_metrics(self) -> Self {
        self.record(
            "model_metrics",
            json!({
                "model_info": {
                    "n_vocab": 32000,
                    "n_layer": 32,
                    "n_embd": 4096,
                    "n_head": 32,
                    "n_head_kv": 8,
                    "n_ctx_train": 4096,
                    "model_size_mb": 4096.0
                },
                "context_info": {"n_ctx": 2048, "n_batch": 512, "n_ubatch": 512, "n_seq_max": 1},
                "memory_usage": {
                    "model_size_bytes": 4_294_967_296u64,
                    "context_size_estimate_bytes": 1_073_741_824u64
                }
            }),
            true,
        )
    }

    /// Greedy selection with a single candidate.
    pub fn token(self, token: i64, text: &str, prob: f64) -> Self {
        self.token_with(token, "greedy", &[(token, text, prob)])
    }

    /// Selection of `selected` among `candidates` (token, text, probability).
    pub fn token_with(self, selected: i64, method: &str, candidates: &[(i64, &str, f64)]) -> Self {
        let tokens: Vec<i64> = candidates.iter().map(|c| c.0).collect();
        let texts: Vec<&str> = candidates.iter().map(|c| c.1).collect();
        let probs: Vec<f64> = candidates.iter().map(|c| c.2).collect();
        let selected_prob = candidates
            .iter()
            .find(|c| c.0 == selected)
            .map(|c| c.2)
            .unwrap_or(0.0);
        let tag = self.tag_tokens;

        self.record(
            "sampling_state",
            json!({
                "sampling": {
                    "selected_token": selected,
                    "selected_prob": selected_prob,
                    "sampling_method": method,
                    "top_tokens": tokens,
                    "top_probs": probs,
                    "top_token_texts": texts,
                    "layer_details": [
                        {"layer_id": 0, "layer_type": "attention", "operation": "forward", "execution_time_us": 120},
                        {"layer_id": 1, "layer_type": "feed_forward", "operation": "forward", "execution_time_us": 80}
                    ]
                }
            }),
            tag,
        )
    }

    /// `step_begin` followed by a `step_end` carrying `duration_ms`.
    pub fn step(self, step_id: i64, duration_ms: f64) -> Self {
        self.record(
            "step_begin",
            json!({"step_id": step_id, "step_name": "decode", "layer_id": -1}),
            true,
        )
        .record(
            "step_end",
            json!({"step_id": step_id, "duration_ms": duration_ms}),
            true,
        )
    }

    /// `step_end` in the backend tracer's nested form.
    pub fn nested_step_end(self, execution_time_us: u64) -> Self {
        self.record(
            "step_end",
            json!({"metrics": {"step_name": "decode", "execution_time_us": execution_time_us}}),
            true,
        )
    }

    pub fn performance_metric(self, name: &str, value: f64, unit: &str) -> Self {
        self.record(
            "performance_metric",
            json!({"metric_name": name, "value": value, "unit": unit}),
            true,
        )
    }

    pub fn session_end(self, total_tokens: u64, total_time_ms: f64) -> Self {
        self.record(
            "session_end",
            json!({"total_tokens": total_tokens, "total_time_ms": total_time_ms}),
            true,
        )
    }

    /// Arbitrary record with the current timestamp.
    pub fn event(self, kind: &str, fields: Value) -> Self {
        self.record(kind, fields, true)
    }

    /// Append a line verbatim (malformed input, foreign timestamps).
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn blank(self) -> Self {
        self.raw("")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Newline-terminated log text.
    pub fn build(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    fn record(mut self, kind: &str, fields: Value, tag: bool) -> Self {
        let mut record = match fields {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        record.insert("event".into(), json!(kind));
        record.insert(
            "timestamp".into(),
            json!(self.clock.format(TIMESTAMP_FORMAT).to_string()),
        );
        if tag && let Some(id) = &self.session_id {
            record.insert("session_id".into(), json!(id));
        }

        self.lines.push(Value::Object(record).to_string());
        self.clock += self.tick;
        self
    }
}

fn parse_clock(timestamp: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).expect("Invalid fixture timestamp")
}

/// Session `S1`: start, two untagged tokens `"lo"` and `"!"`, end.
pub fn hello_trace() -> TraceBuilder {
    TraceBuilder::new("S1")
        .session_start("Say lo!")
        .untagged_tokens()
        .token(7, "lo", 0.9)
        .token(3, "!", 0.6)
        .session_end(2, 200.0)
}

/// Two sessions with step timings and a model header.
pub fn two_session_trace() -> TraceBuilder {
    TraceBuilder::new("sess_a")
        .session_start("first")
        .model_metrics()
        .token_with(
            100,
            "top_k",
            &[(100, "The", 0.5), (101, "A", 0.3), (102, "In", 0.2)],
        )
        .step(0, 40.0)
        .token_with(200, "top_k", &[(200, " cat", 0.7), (201, " dog", 0.3)])
        .step(1, 60.0)
        .session_end(2, 100.0)
        .session("sess_b")
        .advance_ms(60_000)
        .session_start("second")
        .token(300, "Hi", 0.8)
        .step(0, 25.0)
}
