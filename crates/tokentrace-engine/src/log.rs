use tokentrace_decoder::{
    DecodeReport, IncrementalBatch, LineOutcome, decode_line, decode_lines, split_lines,
};
use tokentrace_types::Event;

use crate::{Error, Result};

/// What one application of a source response changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Index into `EventLog::events()` of the first event appended
    pub first_new_event: usize,
    /// Events appended by this application
    pub new_events: usize,
    /// Decode counts for the lines actually applied
    pub report: DecodeReport,
    /// Watermark after the application
    pub watermark: usize,
}

/// Append-only classified event sequence plus a line-count watermark.
///
/// Lines below the watermark have been applied and are never applied again,
/// whichever retrieval mode delivers them. All views are derived from
/// `events()`; nothing else mutates it.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    watermark: usize,
    report: DecodeReport,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of source lines already applied
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Cumulative decode counts since the last reset.
    ///
    /// Covers lines below the watermark only. A trailing line held back by
    /// `apply_snapshot` is not counted until a later snapshot terminates it,
    /// so for such a log `parsed + malformed` is one short of the non-blank
    /// lines in the text.
    pub fn report(&self) -> &DecodeReport {
        &self.report
    }

    /// Events appended at or after `index`
    pub fn events_since(&self, index: usize) -> &[Event] {
        self.events.get(index..).unwrap_or(&[])
    }

    /// Apply a full snapshot of the log text.
    ///
    /// Lines below the watermark are skipped. A final line without a newline
    /// that does not decode is treated as still being written and left for
    /// the next snapshot.
    pub fn apply_snapshot(&mut self, text: &str) -> ApplyOutcome {
        let mut lines = split_lines(text);
        if !text.ends_with('\n')
            && let Some(last) = lines.last()
            && matches!(decode_line(lines.len() - 1, last), LineOutcome::Malformed(_))
        {
            tracing::debug!(line = lines.len() - 1, "holding back partial trailing line");
            lines.pop();
        }

        let start = self.watermark.min(lines.len());
        let fresh = lines[start..].to_vec();
        self.apply_lines(start, fresh.into_iter(), lines.len().max(self.watermark))
    }

    /// Apply an incremental response `{new_lines, total_lines}`.
    ///
    /// `total_lines` is the next watermark. A response that does not pass the
    /// current watermark is rejected with `WatermarkRegression` and changes
    /// nothing, so re-applying a response is a no-op.
    pub fn apply_incremental(&mut self, batch: &IncrementalBatch) -> Result<ApplyOutcome> {
        if batch.total_lines <= self.watermark {
            return Err(Error::WatermarkRegression {
                watermark: self.watermark,
                total_lines: batch.total_lines,
            });
        }

        let first_line = batch.first_line();
        let skip = self.watermark.saturating_sub(first_line);
        if first_line > self.watermark {
            tracing::warn!(
                watermark = self.watermark,
                first_line,
                "incremental response skips lines; gap will not be refetched"
            );
        }

        let lines = batch.new_lines.iter().skip(skip).map(String::as_str);
        Ok(self.apply_lines(first_line + skip, lines, batch.total_lines))
    }

    /// Discard everything (a new submission starts a new viewing session).
    pub fn reset(&mut self) {
        self.events.clear();
        self.watermark = 0;
        self.report = DecodeReport::default();
    }

    fn apply_lines<'a>(
        &mut self,
        first_line: usize,
        lines: impl Iterator<Item = &'a str>,
        next_watermark: usize,
    ) -> ApplyOutcome {
        let batch = decode_lines(lines, first_line);
        for mismatch in &batch.shape_mismatches {
            tracing::debug!("{}", mismatch);
        }

        let first_new_event = self.events.len();
        self.report.merge(&batch.report);
        let report = batch.report;
        self.events.extend(batch.into_events());
        self.watermark = next_watermark;

        ApplyOutcome {
            first_new_event,
            new_events: self.events.len() - first_new_event,
            report,
            watermark: self.watermark,
        }
    }
}
