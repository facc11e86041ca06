use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of record kinds the instrumented backend writes.
///
/// Ordering is the declaration order and is used wherever kinds are listed
/// (distribution tables, summaries) so output stays stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    ModelMetrics,
    SamplingState,
    SessionEnd,
    StepBegin,
    StepEnd,
    PerformanceMetric,
    Unknown,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::SessionStart,
        EventKind::ModelMetrics,
        EventKind::SamplingState,
        EventKind::SessionEnd,
        EventKind::StepBegin,
        EventKind::StepEnd,
        EventKind::PerformanceMetric,
        EventKind::Unknown,
    ];

    /// Match the `event` discriminant of a log record.
    /// Anything outside the closed set is `Unknown`.
    pub fn from_discriminant(value: &str) -> Self {
        match value {
            "session_start" => EventKind::SessionStart,
            "model_metrics" => EventKind::ModelMetrics,
            "sampling_state" => EventKind::SamplingState,
            "session_end" => EventKind::SessionEnd,
            "step_begin" => EventKind::StepBegin,
            "step_end" => EventKind::StepEnd,
            "performance_metric" => EventKind::PerformanceMetric,
            _ => EventKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "session_start",
            EventKind::ModelMetrics => "model_metrics",
            EventKind::SamplingState => "sampling_state",
            EventKind::SessionEnd => "session_end",
            EventKind::StepBegin => "step_begin",
            EventKind::StepEnd => "step_end",
            EventKind::PerformanceMetric => "performance_metric",
            EventKind::Unknown => "unknown",
        }
    }

    /// Human label, e.g. "sampling state"
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
