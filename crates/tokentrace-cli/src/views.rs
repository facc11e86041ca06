//! Plain-text rendering. Every function returns a `String` so handlers
//! decide where it goes and tests can compare it without a terminal.

use anyhow::Result;
use is_terminal::IsTerminal;
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use std::fmt::{Display, Write};
use tokentrace_decoder::DecodeReport;
use tokentrace_engine::{CandidateSnapshot, MetricsReport, SessionStatus, SessionSummary};
use tokentrace_types::{Event, EventPayload};

/// Applies colour only when stdout is a terminal
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn detect() -> Self {
        Self {
            enabled: std::io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn paint(&self, text: impl Display, style: Style) -> String {
        if self.enabled {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: impl Display) -> String {
        self.paint(text, Style::new().bold())
    }

    pub fn dim(&self, text: impl Display) -> String {
        self.paint(text, Style::new().dimmed())
    }

    pub fn status(&self, status: SessionStatus) -> String {
        let style = match status {
            SessionStatus::Completed => Style::new().green(),
            SessionStatus::Active => Style::new().yellow(),
            SessionStatus::Pending => Style::new().dimmed(),
        };
        self.paint(status, style)
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn decode_report(p: &Painter, report: &DecodeReport) -> String {
    let mut out = format!(
        "{} lines: {} parsed, {} malformed, {} blank",
        report.lines, report.parsed, report.malformed, report.blank
    );
    if report.malformed > 0 {
        out = p.paint(out, Style::new().yellow());
    }
    if report.shape_mismatches > 0 {
        let _ = write!(out, " ({} shape mismatches)", report.shape_mismatches);
    }
    out
}

pub fn session_block(p: &Painter, summary: &SessionSummary) -> String {
    let mut out = format!("{}  {}\n", p.bold(&summary.session_id), p.status(summary.status));

    if let Some(prompt) = &summary.prompt {
        let _ = writeln!(out, "  prompt:  {}", truncate(prompt, 72));
    }
    let _ = write!(
        out,
        "  events:  {}   tokens: {}",
        summary.event_count, summary.token_count
    );
    if let Some(ms) = summary.duration_ms {
        let _ = write!(out, "   duration: {}ms", ms);
    }
    if let Some(tps) = summary.tokens_per_second {
        let _ = write!(out, "   {:.2} tok/s", tps);
    }
    out.push('\n');
    if let Some(line) = layer_stats(summary) {
        let _ = writeln!(out, "  layers:  {}", line);
    }
    if !summary.generated_text.is_empty() {
        let _ = writeln!(out, "  output:  {}", truncate(&summary.generated_text, 72));
    }
    out
}

fn layer_stats(summary: &SessionSummary) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(total) = summary.total_layers {
        parts.push(format!("{} total", total));
    }
    if let Some(avg) = summary.average_layer_time_us {
        parts.push(format!("avg {:.2}us", avg));
    }
    if summary.layer_time_us > 0 {
        parts.push(format!("{}us traced", summary.layer_time_us));
    }
    (!parts.is_empty()).then(|| parts.join("   "))
}

pub fn metrics(p: &Painter, report: &MetricsReport) -> String {
    let mut out = String::new();

    let scope = report.session_id.as_deref().unwrap_or("all sessions");
    let _ = writeln!(out, "{}", p.bold(format!("Metrics ({})", scope)));
    let _ = writeln!(out, "  events:           {}", report.total_events);
    let _ = writeln!(out, "  tokens:           {}", report.total_tokens);
    let _ = writeln!(
        out,
        "  avg latency:      {:.2}ms ({} samples)",
        report.average_latency_ms, report.latency_samples
    );
    let _ = writeln!(out, "  avg step:         {:.2}ms", report.average_step_ms);
    let _ = writeln!(out, "  throughput:       {:.2} tok/s", report.tokens_per_second);
    if report.approximate_events > 0 {
        let _ = writeln!(
            out,
            "  {}",
            p.paint(
                format!("{} events with unparseable timestamps", report.approximate_events),
                Style::new().yellow()
            )
        );
    }

    if let Some(model) = &report.model {
        let _ = writeln!(out, "\n{}", p.bold("Model"));
        let _ = writeln!(
            out,
            "  vocab {}  layers {}  embd {}  heads {}/{}  ctx {}",
            model.n_vocab, model.n_layer, model.n_embd, model.n_head, model.n_head_kv, model.n_ctx
        );
        let _ = writeln!(out, "  estimated memory: {:.2} GiB", model.estimated_memory_gib);
    }

    if !report.distribution.is_empty() {
        let _ = writeln!(out, "\n{}", p.bold("Events by kind"));
        for share in &report.distribution {
            let _ = writeln!(
                out,
                "  {:<20} {:>6}  {:>6.2}%",
                share.kind.label(),
                share.count,
                share.percentage
            );
        }
    }

    if !report.time_series.is_empty() {
        let _ = writeln!(out, "\n{}", p.bold("Per minute"));
        for bucket in &report.time_series {
            let marker = if bucket.approximate { "~" } else { " " };
            let _ = writeln!(
                out,
                "  {}{}  events {:>4}  tokens {:>4}  latency {:>8.2}ms",
                bucket.label, marker, bucket.events, bucket.tokens, bucket.latency_ms
            );
        }
    }

    out
}

pub fn snapshot(p: &Painter, snapshot: &CandidateSnapshot) -> String {
    let mut out = format!(
        "step {}  {}\n",
        snapshot.step_index + 1,
        p.dim(&snapshot.label)
    );

    for candidate in &snapshot.candidates {
        let marker = if candidate.selected { ">" } else { " " };
        let mut line = format!(
            "{} {:>2}. {:<16} {:>6.2}%",
            marker,
            candidate.rank + 1,
            format!("{:?}", candidate.text),
            candidate.probability * 100.0
        );
        if let Some(weight) = candidate.relative_weight {
            let _ = write!(line, "  w={:.2}", weight);
        }

        let styled = if candidate.selected {
            p.paint(line, Style::new().green().bold())
        } else if candidate.eliminated {
            p.paint(line, Style::new().dimmed().strikethrough())
        } else {
            line
        };
        let _ = writeln!(out, "  {}", styled);
    }

    if !snapshot.layers.is_empty() {
        let _ = writeln!(
            out,
            "  {}",
            p.dim(format!("layers ({}us)", snapshot.layer_time_us))
        );
        for layer in &snapshot.layers {
            let _ = writeln!(
                out,
                "    L{:<3} {:<14} {:<10} {:>6}us",
                layer.layer_id, layer.layer_type, layer.operation, layer.execution_time_us
            );
        }
    }
    out
}

/// One line per event for `watch`
pub fn event_line(p: &Painter, event: &Event) -> String {
    let time = match event.timestamp.instant() {
        Some(instant) => instant.format("%H:%M:%S%.3f").to_string(),
        None => format!("{:>12}", "?"),
    };

    let detail = match &event.payload {
        EventPayload::SessionStart(start) => start
            .prompt
            .as_deref()
            .map(|prompt| format!("prompt {:?}", truncate(prompt, 60)))
            .unwrap_or_default(),
        EventPayload::ModelMetrics(metrics) => format!(
            "{} layers, {:.2} GiB",
            metrics.model_info.n_layer,
            metrics.estimated_memory_gib()
        ),
        EventPayload::SamplingState(sampling) => format!(
            "{:?} p={:.3} ({})",
            sampling.selected_text(),
            sampling.selected_prob,
            sampling.sampling_method
        ),
        EventPayload::SessionEnd(end) => format!(
            "{} tokens, {:.2} tok/s",
            end.total_tokens.unwrap_or(0),
            end.tokens_per_second()
        ),
        EventPayload::StepBegin(step) => format!("#{} {}", step.step_id, step.step_name),
        EventPayload::StepEnd(step) => step
            .duration_ms
            .map(|ms| format!("{:.2}ms", ms))
            .unwrap_or_default(),
        EventPayload::PerformanceMetric(metric) => {
            format!("{} = {} {}", metric.metric_name, metric.value, metric.unit)
        }
        EventPayload::Unknown(unknown) => unknown.event.clone().unwrap_or_default(),
    };

    format!(
        "{} {} {:<18} {}",
        p.dim(format!("{:>5}", event.seq)),
        p.dim(time),
        event.kind().as_str(),
        detail
    )
    .trim_end()
    .to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let kept: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
