use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokentrace_types::Event;

use crate::Result;
use crate::classify::classify;
use crate::error::{DecodeError, DecodeErrorKind, ShapeMismatch};
use crate::fields::json_type;

/// Result of decoding one raw line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Empty or whitespace-only; dropped without counting as malformed
    Blank,
    Event {
        event: Event,
        issues: Vec<ShapeMismatch>,
    },
    Malformed(DecodeError),
}

/// Counts for one decoded block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeReport {
    /// Raw lines seen, blank ones included
    pub lines: usize,
    pub parsed: usize,
    pub malformed: usize,
    pub blank: usize,
    pub shape_mismatches: usize,
}

impl DecodeReport {
    pub fn merge(&mut self, other: &DecodeReport) {
        self.lines += other.lines;
        self.parsed += other.parsed;
        self.malformed += other.malformed;
        self.blank += other.blank;
        self.shape_mismatches += other.shape_mismatches;
    }
}

/// Ordered decode results for a block of lines. Blank lines produce no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    pub entries: Vec<std::result::Result<Event, DecodeError>>,
    pub shape_mismatches: Vec<ShapeMismatch>,
    pub report: DecodeReport,
}

impl DecodedBatch {
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter().filter_map(|entry| entry.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &DecodeError> {
        self.entries.iter().filter_map(|entry| entry.as_ref().err())
    }

    pub fn into_events(self) -> Vec<Event> {
        self.entries.into_iter().filter_map(|entry| entry.ok()).collect()
    }

    fn push(&mut self, outcome: LineOutcome) {
        self.report.lines += 1;
        match outcome {
            LineOutcome::Blank => self.report.blank += 1,
            LineOutcome::Event { event, issues } => {
                self.report.parsed += 1;
                self.report.shape_mismatches += issues.len();
                self.shape_mismatches.extend(issues);
                self.entries.push(Ok(event));
            }
            LineOutcome::Malformed(err) => {
                tracing::debug!(line = err.line, "skipping malformed line: {}", err);
                self.report.malformed += 1;
                self.entries.push(Err(err));
            }
        }
    }
}

/// Split a text block into lines on `\n`, dropping a trailing `\r` from each.
/// A final empty segment after a trailing newline is not a line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines
}

/// Decode a single line at zero-based index `line`
pub fn decode_line(line: usize, raw: &str) -> LineOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(record)) => {
            let mut issues = Vec::new();
            let event = classify(line, &record, &mut issues);
            LineOutcome::Event { event, issues }
        }
        Ok(other) => LineOutcome::Malformed(DecodeError {
            line,
            kind: DecodeErrorKind::NotAnObject(json_type(&other)),
        }),
        Err(err) => LineOutcome::Malformed(DecodeError {
            line,
            kind: DecodeErrorKind::InvalidJson(err.to_string()),
        }),
    }
}

/// Decode an already-split sequence of lines. `first_line` is the absolute
/// index of the first element, so `seq` stays meaningful across batches.
pub fn decode_lines<'a, I>(lines: I, first_line: usize) -> DecodedBatch
where
    I: IntoIterator<Item = &'a str>,
{
    let mut batch = DecodedBatch::default();
    for (offset, raw) in lines.into_iter().enumerate() {
        batch.push(decode_line(first_line + offset, raw));
    }
    batch
}

/// Decode a whole text block starting at line 0
pub fn decode_block(text: &str) -> DecodedBatch {
    decode_lines(split_lines(text), 0)
}

/// Read and decode a JSONL trace file
pub fn decode_file(path: &Path) -> Result<DecodedBatch> {
    let text = std::fs::read_to_string(path)?;
    Ok(decode_block(&text))
}
