use std::collections::HashMap;
use std::time::Duration;
use tokentrace_engine::{PlaybackEngine, PlaybackStatus, Scheduler, StepOutcome, TimerHandle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Real-time scheduler: one sleeping task per timer, delivering the handle
/// over a channel when it fires. Cancel aborts the task.
///
/// Must be used from within a tokio runtime.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerHandle>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerHandle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            tasks: HashMap::new(),
            next_id: 0,
        };
        (scheduler, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, delay: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(handle);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Play `engine` in real time until it completes or `cancel` fires.
///
/// `on_step` sees the engine after every applied step. Cancellation pauses
/// the engine, so the pending timer is dropped and progress is kept.
pub async fn drive_playback<F>(
    engine: &mut PlaybackEngine<TokioScheduler>,
    timers: &mut mpsc::UnboundedReceiver<TimerHandle>,
    cancel: &CancellationToken,
    mut on_step: F,
) -> PlaybackStatus
where
    F: FnMut(&PlaybackEngine<TokioScheduler>, &StepOutcome),
{
    engine.play();

    while engine.status() == PlaybackStatus::Playing {
        tokio::select! {
            _ = cancel.cancelled() => {
                engine.pause();
                break;
            }
            fired = timers.recv() => {
                let Some(handle) = fired else {
                    break;
                };
                let outcome = engine.fire(handle);
                if outcome != StepOutcome::Stale {
                    on_step(engine, &outcome);
                }
            }
        }
    }

    engine.status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokentrace_decoder::decode_block;
    use tokentrace_engine::{PlaybackConfig, find_session};
    use tokentrace_testing::fixtures::hello_trace;
    use tokio::time::Instant;

    fn hello_engine(
        config: PlaybackConfig,
    ) -> (PlaybackEngine<TokioScheduler>, mpsc::UnboundedReceiver<TimerHandle>) {
        let events = decode_block(&hello_trace().build()).into_events();
        let session = find_session(&events, "S1").unwrap();
        let (scheduler, timers) = TokioScheduler::new();
        (PlaybackEngine::from_session(&session, scheduler, config), timers)
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_completion_at_base_delay() {
        let (mut engine, mut timers) = hello_engine(PlaybackConfig::default());
        let started = Instant::now();
        let mut steps = Vec::new();

        let status = drive_playback(&mut engine, &mut timers, &CancellationToken::new(), |_, outcome| {
            steps.push(outcome.clone())
        })
        .await;

        assert_eq!(status, PlaybackStatus::Completed);
        assert_eq!(engine.generated_text(), "lo!");
        assert_eq!(steps.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(4000));
        assert!(started.elapsed() < Duration::from_millis(4100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_scales_delay() {
        let (mut engine, mut timers) = hello_engine(PlaybackConfig::default());
        engine.set_speed(5.0).unwrap();
        let started = Instant::now();

        drive_playback(&mut engine, &mut timers, &CancellationToken::new(), |_, _| {}).await;

        assert!(started.elapsed() >= Duration::from_millis(800));
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pauses_and_keeps_progress() {
        let (mut engine, mut timers) = hello_engine(PlaybackConfig::default());
        let cancel = CancellationToken::new();

        let status = drive_playback(&mut engine, &mut timers, &cancel, |_, _| cancel.cancel()).await;

        assert_eq!(status, PlaybackStatus::Paused);
        assert_eq!(engine.generated_text(), "lo");
        assert!(engine.pending_timer().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_is_not_delivered() {
        let (mut scheduler, mut timers) = TokioScheduler::new();
        let cancelled = scheduler.schedule_once(Duration::from_millis(100));
        let kept = scheduler.schedule_once(Duration::from_millis(200));
        scheduler.cancel(cancelled);

        assert_eq!(timers.recv().await, Some(kept));
    }
}
