pub mod inspect;
pub mod metrics;
pub mod replay;
pub mod submit;
pub mod watch;

use anyhow::{Context, Result};
use std::path::Path;
use tokentrace_decoder::{DecodedBatch, decode_file};
use tokentrace_engine::{Session, reconstruct_sessions};
use tokentrace_types::Event;

fn load_trace(file: &Path) -> Result<DecodedBatch> {
    let batch = decode_file(file).with_context(|| format!("Failed to read {}", file.display()))?;
    tracing::debug!(
        file = %file.display(),
        parsed = batch.report.parsed,
        malformed = batch.report.malformed,
        "decoded trace"
    );
    Ok(batch)
}

/// The named session, or the first one in the log
fn select_session(events: &[Event], session_id: Option<&str>) -> Result<Session> {
    let sessions = reconstruct_sessions(events);
    match session_id {
        Some(id) => sessions
            .into_iter()
            .find(|session| session.session_id == id)
            .with_context(|| format!("Session not found: {}", id)),
        None => sessions
            .into_iter()
            .next()
            .context("No sessions found in trace"),
    }
}
