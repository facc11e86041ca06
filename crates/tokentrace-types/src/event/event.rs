use serde::{Deserialize, Serialize};

use super::kind::EventKind;
use super::payload::{EventPayload, SamplingPayload};
use crate::Timestamp;

/// One classified record of the inference trace log.
///
/// The kind is carried by the payload variant and is fixed when the record
/// is classified; nothing downstream reinterprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Zero-based line index in the source log (also the arrival order)
    pub seq: usize,

    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Event kind and content (flattened enum)
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::SessionStart(_) => EventKind::SessionStart,
            EventPayload::ModelMetrics(_) => EventKind::ModelMetrics,
            EventPayload::SamplingState(_) => EventKind::SamplingState,
            EventPayload::SessionEnd(_) => EventKind::SessionEnd,
            EventPayload::StepBegin(_) => EventKind::StepBegin,
            EventPayload::StepEnd(_) => EventKind::StepEnd,
            EventPayload::PerformanceMetric(_) => EventKind::PerformanceMetric,
            EventPayload::Unknown(_) => EventKind::Unknown,
        }
    }

    pub fn sampling(&self) -> Option<&SamplingPayload> {
        match &self.payload {
            EventPayload::SamplingState(sampling) => Some(sampling),
            _ => None,
        }
    }

    /// Latency sample of a `step_end` record
    pub fn step_duration_ms(&self) -> Option<f64> {
        match &self.payload {
            EventPayload::StepEnd(step) => step.duration_ms,
            _ => None,
        }
    }

    /// True for token selections that carry a token id
    pub fn is_generated_token(&self) -> bool {
        self.sampling()
            .is_some_and(|sampling| sampling.selected_token.is_some())
    }
}
