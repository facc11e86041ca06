use anyhow::Result;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tokentrace_engine::session::summarize;
use tokentrace_engine::{EventLog, SessionStatus, attribute_sessions, find_session};
use tokentrace_runtime::{Config, FileSource, HttpSource, IngestMode, Ingestor, LogSource};
use tokio_util::sync::CancellationToken;

use crate::types::OutputFormat;
use crate::views::{self, Painter};

pub async fn handle(
    config: &Config,
    session_id: &str,
    file: Option<PathBuf>,
    snapshot: bool,
    format: OutputFormat,
) -> Result<()> {
    let mode = if snapshot {
        IngestMode::Snapshot
    } else {
        IngestMode::Incremental
    };

    match file {
        Some(path) => {
            let ingestor = Ingestor::new(FileSource::new(path), session_id, &config.ingest);
            follow(ingestor.with_mode(mode), format).await
        }
        None => {
            let source = HttpSource::new(&config.server.base_url, config.server.request_timeout())?;
            let ingestor = Ingestor::new(source, session_id, &config.ingest);
            follow(ingestor.with_mode(mode), format).await
        }
    }
}

/// Print the session's events as they arrive until it completes or Ctrl-C.
/// Events already in the ingestor's log are printed first.
pub(crate) async fn follow<S: LogSource>(mut ingestor: Ingestor<S>, format: OutputFormat) -> Result<()> {
    let p = Painter::detect();
    let session_id = ingestor.session_id().to_string();

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    if format == OutputFormat::Plain {
        eprintln!("{}", p.dim(format!("Watching {} (Ctrl-C to stop)", session_id)));
    }

    let mut status = print_new_events(&p, ingestor.log(), &session_id, 0, None, format);
    if status != Some(SessionStatus::Completed) {
        ingestor
            .run(&cancel, |log, outcome| {
                status = print_new_events(&p, log, &session_id, outcome.first_new_event, status, format);
                if status == Some(SessionStatus::Completed) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await?;
    }
    ctrl_c.abort();

    match find_session(ingestor.log().events(), &session_id) {
        Some(session) => {
            let summary = summarize(&session);
            match format {
                OutputFormat::Json => views::print_json(&summary)?,
                OutputFormat::Plain => print!("\n{}", views::session_block(&p, &summary)),
            }
        }
        None => eprintln!("No events for session {}", session_id),
    }
    Ok(())
}

/// Print the session's events from `first_new_event` on. Returns the
/// session's status, announcing it when it changed.
fn print_new_events(
    p: &Painter,
    log: &EventLog,
    session_id: &str,
    first_new_event: usize,
    previous: Option<SessionStatus>,
    format: OutputFormat,
) -> Option<SessionStatus> {
    let session = find_session(log.events(), session_id)?;
    let owned = attribute_sessions(log.events());
    let fresh = log
        .events_since(first_new_event)
        .iter()
        .zip(&owned[first_new_event.min(owned.len())..])
        .filter(|(_, owner)| **owner == Some(session_id))
        .map(|(event, _)| event);

    for event in fresh {
        match format {
            OutputFormat::Json => {
                if let Ok(line) = serde_json::to_string(event) {
                    println!("{}", line);
                }
            }
            OutputFormat::Plain => println!("{}", views::event_line(p, event)),
        }
    }

    if format == OutputFormat::Plain && previous != Some(session.status) {
        eprintln!("{}", p.dim(format!("session {} is {}", session_id, p.status(session.status))));
    }
    Some(session.status)
}
