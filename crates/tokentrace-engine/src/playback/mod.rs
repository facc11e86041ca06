//! Time-scaled, cancellable replay of a session's token chain.

mod engine;
mod scheduler;
mod snapshot;

pub use engine::{PlaybackConfig, PlaybackEngine, PlaybackStatus, StepOutcome};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle};
pub use snapshot::{Candidate, CandidateSnapshot, build_snapshot};
