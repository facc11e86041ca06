use std::ops::ControlFlow;
use std::time::Duration;
use tokentrace_engine::{ApplyOutcome, EventLog};
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;
use crate::source::LogSource;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Tail from the watermark (`/logs/{id}/stream?from_line=N`)
    #[default]
    Incremental,
    /// Re-fetch the whole log each cycle; lines below the watermark are skipped
    Snapshot,
}

/// Exponential retry delay, doubling up to a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(current) => (current * 2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Feeds one session's log from a source into an `EventLog`.
pub struct Ingestor<S: LogSource> {
    source: S,
    session_id: String,
    mode: IngestMode,
    log: EventLog,
    poll_interval: Duration,
    backoff: Backoff,
}

impl<S: LogSource> Ingestor<S> {
    pub fn new(source: S, session_id: impl Into<String>, config: &IngestConfig) -> Self {
        Self {
            source,
            session_id: session_id.into(),
            mode: IngestMode::default(),
            log: EventLog::new(),
            poll_interval: config.poll_interval(),
            backoff: Backoff::new(
                Duration::from_millis(config.retry_backoff_ms),
                Duration::from_millis(config.max_backoff_ms),
            ),
        }
    }

    pub fn with_mode(mut self, mode: IngestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn into_log(self) -> EventLog {
        self.log
    }

    /// Apply log text already in hand (e.g. returned by a submission)
    pub fn seed(&mut self, text: &str) -> ApplyOutcome {
        self.log.apply_snapshot(text)
    }

    /// One retrieval cycle. A stale response is not an error: it means
    /// no new events this cycle.
    pub async fn poll_once(&mut self) -> Result<ApplyOutcome> {
        match self.mode {
            IngestMode::Snapshot => {
                let snapshot = self.source.snapshot(&self.session_id).await?;
                Ok(self.log.apply_snapshot(&snapshot.text()))
            }
            IngestMode::Incremental => {
                let batch = self
                    .source
                    .incremental(&self.session_id, self.log.watermark())
                    .await?;
                match self.log.apply_incremental(&batch) {
                    Ok(outcome) => Ok(outcome),
                    Err(err) => {
                        if batch.total_lines < self.log.watermark() {
                            tracing::warn!("{}", err);
                        }
                        Ok(ApplyOutcome {
                            first_new_event: self.log.len(),
                            watermark: self.log.watermark(),
                            ..Default::default()
                        })
                    }
                }
            }
        }
    }

    /// Poll until `on_update` breaks or `cancel` fires.
    ///
    /// Transport failures are logged and retried with exponential backoff;
    /// any other error ends the loop.
    pub async fn run<F>(&mut self, cancel: &CancellationToken, mut on_update: F) -> Result<()>
    where
        F: FnMut(&EventLog, &ApplyOutcome) -> ControlFlow<()>,
    {
        loop {
            let delay = match self.poll_once().await {
                Ok(outcome) => {
                    self.backoff.reset();
                    if on_update(&self.log, &outcome).is_break() {
                        return Ok(());
                    }
                    self.poll_interval
                }
                Err(err) if err.is_transport_failure() => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        "Polling {} failed: {}; retrying in {:?}",
                        self.source.describe(),
                        err,
                        delay
                    );
                    delay
                }
                Err(err) => return Err(err),
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(session_id = %self.session_id, "ingestion cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokentrace_decoder::{IncrementalBatch, LogSnapshot};
    use tokentrace_engine::{SessionStatus, sessions};
    use tokentrace_testing::TraceBuilder;
    use tokentrace_testing::fixtures::hello_trace;

    /// Serves a fixed list of lines, revealing `visible` more on each call
    struct ScriptedSource {
        lines: Vec<String>,
        step: usize,
        visible: Mutex<usize>,
        failures: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(lines: Vec<String>, step: usize) -> Self {
            Self {
                lines,
                step,
                visible: Mutex::new(0),
                failures: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_first(self, n: usize) -> Self {
            self.failures.store(n, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn snapshot(&self, session_id: &str) -> Result<LogSnapshot> {
            let batch = self.incremental(session_id, 0).await?;
            let mut text = batch.new_lines.join("\n");
            text.push('\n');
            Ok(LogSnapshot {
                session_id: Some(session_id.to_string()),
                logs: Some(text),
                logs_b64: None,
            })
        }

        async fn incremental(&self, session_id: &str, from_line: usize) -> Result<IncrementalBatch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Io(std::io::Error::other("connection refused")));
            }

            let mut visible = self.visible.lock().unwrap();
            *visible = (*visible + self.step).min(self.lines.len());
            let start = from_line.min(*visible);
            Ok(IncrementalBatch {
                session_id: Some(session_id.to_string()),
                from_line: start,
                new_lines: self.lines[start..*visible].to_vec(),
                total_lines: *visible,
            })
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn config() -> IngestConfig {
        IngestConfig {
            poll_interval_ms: 100,
            retry_backoff_ms: 1000,
            max_backoff_ms: 4000,
        }
    }

    fn until_completed(log: &EventLog, _: &ApplyOutcome) -> ControlFlow<()> {
        match sessions(log).first() {
            Some(session) if session.status == SessionStatus::Completed => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_session_completes() {
        let source = ScriptedSource::new(hello_trace().lines().to_vec(), 1);
        let mut ingestor = Ingestor::new(source, "S1", &config());

        ingestor
            .run(&CancellationToken::new(), until_completed)
            .await
            .unwrap();

        assert_eq!(ingestor.log().len(), 4);
        assert_eq!(ingestor.log().watermark(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_are_retried() {
        let source = ScriptedSource::new(hello_trace().lines().to_vec(), 4).failing_first(2);
        let mut ingestor = Ingestor::new(source, "S1", &config());

        ingestor
            .run(&CancellationToken::new(), until_completed)
            .await
            .unwrap();

        assert_eq!(ingestor.log().len(), 4);
        assert_eq!(ingestor.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let trace = TraceBuilder::new("s").session_start("never ends");
        let source = ScriptedSource::new(trace.lines().to_vec(), 1);
        let mut ingestor = Ingestor::new(source, "s", &config());

        let cancel = CancellationToken::new();
        cancel.cancel();
        ingestor
            .run(&cancel, |_, _| ControlFlow::Continue(()))
            .await
            .unwrap();

        assert_eq!(ingestor.log().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_poll_is_not_an_error() {
        let trace = TraceBuilder::new("s").session_start("p");
        let source = ScriptedSource::new(trace.lines().to_vec(), 1);
        let mut ingestor = Ingestor::new(source, "s", &config());

        ingestor.poll_once().await.unwrap();
        let outcome = ingestor.poll_once().await.unwrap();
        assert_eq!(outcome.new_events, 0);
        assert_eq!(ingestor.log().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_mode_does_not_duplicate() {
        let source = ScriptedSource::new(hello_trace().lines().to_vec(), 2);
        let mut ingestor = Ingestor::new(source, "S1", &config()).with_mode(IngestMode::Snapshot);

        ingestor
            .run(&CancellationToken::new(), until_completed)
            .await
            .unwrap();

        assert_eq!(ingestor.log().len(), 4);
    }
}
