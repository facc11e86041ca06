use serde::Serialize;
use std::time::Duration;
use tokentrace_types::{SamplingConfig, SamplingPayload};

use super::scheduler::{ManualScheduler, Scheduler, TimerHandle};
use super::snapshot::{CandidateSnapshot, build_snapshot};
use crate::session::Session;
use crate::{Error, Result};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_FLOOR_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Inter-token delay at speed 1
    pub base_delay: Duration,
    /// Lower bound on the scaled delay
    pub floor_delay: Duration,
    pub speed: f64,
    /// Operator's sampling configuration for snapshots; None infers it per step
    pub sampling: Option<SamplingConfig>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            floor_delay: DEFAULT_FLOOR_DELAY,
            speed: 1.0,
            sampling: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not the pending timer (cancelled or superseded); nothing changed
    Stale,
    /// Appended `text`; the next timer is scheduled
    Advanced { text: String, next_index: usize },
    /// Appended the last step's `text` (empty when fired past the end) and stopped
    Completed { text: String },
}

/// Replays a token chain at `max(floor, base / speed)` per step.
///
/// Holds at most one pending timer. Every transition other than "keep
/// playing" cancels it, and a firing whose handle is not the pending one is
/// ignored, so no stale step can apply after pause or reset.
pub struct PlaybackEngine<S: Scheduler> {
    scheduler: S,
    chain: Vec<SamplingPayload>,
    config: PlaybackConfig,
    status: PlaybackStatus,
    step_index: usize,
    speed: f64,
    generated_text: String,
    snapshot: Option<CandidateSnapshot>,
    pending: Option<TimerHandle>,
}

impl<S: Scheduler> PlaybackEngine<S> {
    /// The chain is copied; later log growth does not affect this playback.
    pub fn new(chain: Vec<SamplingPayload>, scheduler: S, config: PlaybackConfig) -> Self {
        let speed = if valid_speed(config.speed) {
            config.speed
        } else {
            1.0
        };
        Self {
            scheduler,
            chain,
            config,
            status: PlaybackStatus::Idle,
            step_index: 0,
            speed,
            generated_text: String::new(),
            snapshot: None,
            pending: None,
        }
    }

    pub fn from_session(session: &Session, scheduler: S, config: PlaybackConfig) -> Self {
        let chain = session.token_chain().into_iter().cloned().collect();
        Self::new(chain, scheduler, config)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn generated_text(&self) -> &str {
        &self.generated_text
    }

    pub fn snapshot(&self) -> Option<&CandidateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Delay the next step will be scheduled with
    pub fn delay(&self) -> Duration {
        let base_ms = self.config.base_delay.as_secs_f64() * 1000.0;
        let scaled = Duration::from_millis((base_ms / self.speed).round() as u64);
        scaled.max(self.config.floor_delay)
    }

    /// Start or resume. No-op on an empty chain, while playing, or once completed.
    pub fn play(&mut self) -> bool {
        if self.chain.is_empty()
            || matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Completed)
        {
            return false;
        }

        if self.snapshot.is_none() {
            self.refresh_snapshot();
        }
        self.status = PlaybackStatus::Playing;
        self.schedule_next();
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        self.cancel_pending();
        self.status = PlaybackStatus::Paused;
        true
    }

    /// Back to `Idle` from any state. Speed is kept.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.status = PlaybackStatus::Idle;
        self.step_index = 0;
        self.generated_text.clear();
        self.snapshot = None;
    }

    /// Accepted only while not playing; applies from the next scheduled step.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if self.status == PlaybackStatus::Playing {
            return Err(Error::SpeedLocked);
        }
        if !valid_speed(speed) {
            return Err(Error::InvalidSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    /// Deliver a timer. Only the pending handle has any effect.
    pub fn fire(&mut self, handle: TimerHandle) -> StepOutcome {
        if self.pending != Some(handle) || self.status != PlaybackStatus::Playing {
            tracing::trace!(?handle, "ignoring stale playback timer");
            return StepOutcome::Stale;
        }
        self.pending = None;

        let Some(step) = self.chain.get(self.step_index) else {
            self.finish();
            return StepOutcome::Completed {
                text: String::new(),
            };
        };

        let text = step.selected_text().to_string();
        self.generated_text.push_str(&text);
        self.step_index += 1;

        if self.step_index >= self.chain.len() {
            self.finish();
            return StepOutcome::Completed { text };
        }

        self.refresh_snapshot();
        self.schedule_next();
        StepOutcome::Advanced {
            text,
            next_index: self.step_index,
        }
    }

    fn finish(&mut self) {
        self.status = PlaybackStatus::Completed;
        self.snapshot = None;
    }

    fn refresh_snapshot(&mut self) {
        self.snapshot = self.chain.get(self.step_index).map(|step| {
            build_snapshot(self.step_index, step, self.config.sampling.as_ref())
        });
    }

    fn schedule_next(&mut self) {
        self.cancel_pending();
        let delay = self.delay();
        self.pending = Some(self.scheduler.schedule_once(delay));
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl PlaybackEngine<ManualScheduler> {
    /// Play to completion on the virtual clock; returns the virtual time taken.
    pub fn run_to_end(&mut self) -> Duration {
        let started = self.scheduler.now();
        self.play();

        while self.status == PlaybackStatus::Playing {
            let Some(due) = self.scheduler.next_due() else {
                break;
            };
            let wait = due.saturating_sub(self.scheduler.now());
            for handle in self.scheduler.advance(wait) {
                self.fire(handle);
            }
        }

        self.scheduler.now() - started
    }
}

fn valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}
