use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokentrace_types::{Event, EventKind, EventPayload, truncate_to_minute};

use super::types::{KindShare, MetricsOptions, MetricsReport, MetricsScope, ModelSummary, TimeBucket};
use crate::session::attribute_sessions;

#[derive(Default)]
struct BucketAcc {
    events: usize,
    tokens: usize,
    latency_sum: f64,
    latency_samples: usize,
}

/// Compute the metrics report for `events` within `scope`.
pub fn aggregate(events: &[Event], scope: &MetricsScope, options: &MetricsOptions) -> MetricsReport {
    let scoped: Vec<&Event> = match scope {
        MetricsScope::All => events.iter().collect(),
        MetricsScope::Session(id) => events
            .iter()
            .zip(attribute_sessions(events))
            .filter(|(_, owner)| *owner == Some(id.as_str()))
            .map(|(event, _)| event)
            .collect(),
    };

    let samples: Vec<f64> = scoped.iter().filter_map(|e| latency_sample(e)).collect();
    let average = mean(&samples);
    let tokens_per_second = if average > 0.0 { 1000.0 / average } else { 0.0 };

    let total_tokens = scoped.iter().filter(|e| e.is_generated_token()).count();
    let approximate_events = scoped.iter().filter(|e| !e.timestamp.is_parsed()).count();

    MetricsReport {
        session_id: match scope {
            MetricsScope::All => None,
            MetricsScope::Session(id) => Some(id.clone()),
        },
        total_events: scoped.len(),
        total_tokens,
        latency_samples: samples.len(),
        average_latency_ms: round2(average),
        average_step_ms: round2(average),
        tokens_per_second: round2(tokens_per_second),
        approximate_events,
        time_series: time_series(&scoped, options),
        distribution: distribution(&scoped),
        model: model_summary(&scoped),
    }
}

/// Minute buckets, chronological, most recent `window` kept.
///
/// Fallback buckets (unparseable timestamps) are keyed apart from authentic
/// buckets of the same minute and sort after them.
fn time_series(events: &[&Event], options: &MetricsOptions) -> Vec<TimeBucket> {
    let fallback_minute = truncate_to_minute(options.now);
    let mut buckets: BTreeMap<(DateTime<Utc>, bool), BucketAcc> = BTreeMap::new();

    for event in events {
        let key = match event.timestamp.instant() {
            Some(instant) => (truncate_to_minute(instant), false),
            None => (fallback_minute, true),
        };
        let acc = buckets.entry(key).or_default();
        acc.events += 1;
        if event.kind() == EventKind::SamplingState {
            acc.tokens += 1;
        }
        if let Some(ms) = latency_sample(event) {
            acc.latency_sum += ms;
            acc.latency_samples += 1;
        }
    }

    let skip = buckets.len().saturating_sub(options.window);
    buckets
        .into_iter()
        .skip(skip)
        .map(|((minute, approximate), acc)| TimeBucket {
            minute,
            label: minute.format("%H:%M").to_string(),
            approximate,
            events: acc.events,
            tokens: acc.tokens,
            latency_samples: acc.latency_samples,
            latency_ms: if acc.latency_samples > 0 {
                round2(acc.latency_sum / acc.latency_samples as f64)
            } else {
                0.0
            },
        })
        .collect()
}

/// Observed kinds in fixed kind order, shares against all events in scope
fn distribution(events: &[&Event]) -> Vec<KindShare> {
    let mut counts: BTreeMap<EventKind, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.kind()).or_default() += 1;
    }

    let total = events.len();
    counts
        .into_iter()
        .map(|(kind, count)| KindShare {
            kind,
            count,
            percentage: round2(count as f64 * 100.0 / total as f64),
        })
        .collect()
}

fn model_summary(events: &[&Event]) -> Option<ModelSummary> {
    events.iter().find_map(|event| match &event.payload {
        EventPayload::ModelMetrics(metrics) => Some(ModelSummary {
            n_vocab: metrics.model_info.n_vocab,
            n_layer: metrics.model_info.n_layer,
            n_embd: metrics.model_info.n_embd,
            n_head: metrics.model_info.n_head,
            n_head_kv: metrics.model_info.n_head_kv,
            n_ctx_train: metrics.model_info.n_ctx_train,
            model_size_mb: metrics.model_info.model_size_mb,
            n_ctx: metrics.context_info.n_ctx,
            n_batch: metrics.context_info.n_batch,
            estimated_memory_gib: round2(metrics.estimated_memory_gib()),
        }),
        _ => None,
    })
}

/// Zero, negative and non-finite durations are not samples
fn latency_sample(event: &Event) -> Option<f64> {
    event
        .step_duration_ms()
        .filter(|ms| ms.is_finite() && *ms > 0.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
