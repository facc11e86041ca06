use serde::{Deserialize, Serialize};
use std::fmt;
use tokentrace_types::{
    Event, EventKind, EventPayload, SamplingPayload, SessionEndPayload, SessionStartPayload,
};

/// Lifecycle of a session. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconstructed lifecycle of one prompt-to-completion interaction.
///
/// A derived view: rebuilt from the event log, never edited in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub status: SessionStatus,
    /// From the first `session_start` that carried a prompt
    pub prompt: Option<String>,
    /// Owned events in arrival order
    pub events: Vec<Event>,
}

impl Session {
    pub(crate) fn new(session_id: String) -> Self {
        Self {
            session_id,
            status: SessionStatus::Pending,
            prompt: None,
            events: Vec::new(),
        }
    }

    /// Fold one event into the state machine
    pub(crate) fn apply(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::SessionStart(start) => {
                if self.status == SessionStatus::Pending {
                    self.status = SessionStatus::Active;
                }
                if self.prompt.is_none() {
                    self.prompt = start.prompt.clone();
                }
            }
            EventPayload::SessionEnd(_) => self.status = SessionStatus::Completed,
            _ => {}
        }
        self.events.push(event.clone());
    }

    pub fn start(&self) -> Option<&SessionStartPayload> {
        self.events.iter().find_map(|event| match &event.payload {
            EventPayload::SessionStart(start) => Some(start),
            _ => None,
        })
    }

    pub fn end(&self) -> Option<&SessionEndPayload> {
        self.events.iter().find_map(|event| match &event.payload {
            EventPayload::SessionEnd(end) => Some(end),
            _ => None,
        })
    }

    /// Ordered `sampling_state` events (the token chain used by playback)
    pub fn token_chain(&self) -> Vec<&SamplingPayload> {
        self.events.iter().filter_map(Event::sampling).collect()
    }

    /// Concatenated selected texts of the token chain
    pub fn generated_text(&self) -> String {
        self.token_chain()
            .iter()
            .map(|step| step.selected_text())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// Events sorted by timestamp.
    ///
    /// Ties keep arrival order; events with unparseable timestamps follow all
    /// parseable ones, in arrival order.
    pub fn timeline(&self) -> Vec<&Event> {
        let mut ordered: Vec<&Event> = self.events.iter().collect();
        ordered.sort_by_key(|event| match event.timestamp.instant() {
            Some(instant) => (0, Some(instant)),
            None => (1, None),
        });
        ordered
    }

    /// Wall time between the start and end records, when both parse
    pub fn duration_ms(&self) -> Option<i64> {
        let instant_of = |kind: EventKind| {
            self.events
                .iter()
                .find(|e| e.kind() == kind)
                .and_then(|e| e.timestamp.instant())
        };
        let start = instant_of(EventKind::SessionStart)?;
        let end = instant_of(EventKind::SessionEnd)?;
        Some((end - start).num_milliseconds())
    }

    /// Layer execution time traced across the token chain, in microseconds
    pub fn layer_time_us(&self) -> u64 {
        self.token_chain()
            .iter()
            .map(|step| step.total_layer_time_us())
            .sum()
    }

    /// Generation speed reported by the session footer
    pub fn tokens_per_second(&self) -> Option<f64> {
        self.end().map(SessionEndPayload::tokens_per_second)
    }
}
