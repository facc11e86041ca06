//! Custom assertions for tokentrace-specific validation.
//!
//! Provides high-level assertions over the CLI's `--format json` output.

use anyhow::{Context, Result};
use serde_json::Value;

/// Assert that an `inspect` report lists the expected number of sessions.
pub fn assert_session_count(json: &Value, expected: usize) -> Result<()> {
    let sessions = json["sessions"]
        .as_array()
        .context("Expected 'sessions' array in JSON")?;

    if sessions.len() != expected {
        anyhow::bail!("Expected {} sessions, got {}", expected, sessions.len());
    }

    Ok(())
}

/// Assert the status string of one session in an `inspect` report.
pub fn assert_session_status(json: &Value, session_id: &str, expected: &str) -> Result<()> {
    let sessions = json["sessions"]
        .as_array()
        .context("Expected 'sessions' array in JSON")?;

    let session = sessions
        .iter()
        .find(|s| s["session_id"].as_str() == Some(session_id))
        .with_context(|| format!("Session {} not found", session_id))?;

    let status = session["status"]
        .as_str()
        .with_context(|| format!("Session {} missing status", session_id))?;

    if status != expected {
        anyhow::bail!(
            "Session {} has status {} but expected {}",
            session_id,
            status,
            expected
        );
    }

    Ok(())
}

/// Assert a numeric field of a JSON object, compared to two decimals.
pub fn assert_number(json: &Value, field: &str, expected: f64) -> Result<()> {
    let actual = json[field]
        .as_f64()
        .with_context(|| format!("Expected numeric field '{}'", field))?;

    if (actual - expected).abs() > 0.005 {
        anyhow::bail!("Field {} is {} but expected {}", field, actual, expected);
    }

    Ok(())
}
