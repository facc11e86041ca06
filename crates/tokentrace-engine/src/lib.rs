// Engine module - Derived views over the append-only event log
// This layer sits between classified events (decoder) and CLI presentation

pub mod error;
pub mod log;
pub mod metrics;
pub mod playback;
pub mod session;

pub use error::{Error, Result};
pub use log::{ApplyOutcome, EventLog};
pub use metrics::{
    KindShare, MetricsOptions, MetricsReport, MetricsScope, ModelSummary, TimeBucket, aggregate,
};
pub use playback::{
    Candidate, CandidateSnapshot, ManualScheduler, PlaybackConfig, PlaybackEngine, PlaybackStatus,
    Scheduler, StepOutcome, TimerHandle, build_snapshot,
};
pub use session::{Session, SessionStatus, SessionSummary, attribute_sessions, reconstruct_sessions};

use tokentrace_types::Event;

// Façade API - Stable public interface for CLI layer

/// Sessions reconstructed from the log, in order of first appearance
pub fn sessions(log: &EventLog) -> Vec<Session> {
    reconstruct_sessions(log.events())
}

/// Find one session by id
pub fn find_session(events: &[Event], session_id: &str) -> Option<Session> {
    reconstruct_sessions(events)
        .into_iter()
        .find(|session| session.session_id == session_id)
}
