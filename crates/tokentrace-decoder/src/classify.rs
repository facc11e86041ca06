use serde_json::{Map, Value};
use tokentrace_types::{
    ContextInfo, Event, EventKind, EventPayload, LayerDetail, MemoryUsage, ModelInfo,
    ModelMetricsPayload, PerformanceMetricPayload, SamplingPayload, SessionEndPayload,
    SessionStartPayload, StepBeginPayload, StepEndPayload, Timestamp, UnknownPayload,
};

use crate::error::{ShapeMismatch, ShapeProblem};
use crate::fields::{Diagnostics, Fields};

/// Classify one parsed record into an `Event`.
///
/// Never fails. The kind is decided by the `event` discriminant alone;
/// anything outside the closed set becomes `Unknown`. Payload fields of the
/// wrong shape are defaulted and pushed onto `issues`.
pub fn classify(seq: usize, record: &Map<String, Value>, issues: &mut Vec<ShapeMismatch>) -> Event {
    let mut diag = Diagnostics::new(seq, issues);
    let fields = Fields::new(record);

    let timestamp = match fields.opt_string("timestamp", &mut diag) {
        Some(raw) => Timestamp::parse(&raw),
        None => Timestamp::missing(),
    };

    let session_id = fields
        .opt_string("session_id", &mut diag)
        .filter(|id| !id.trim().is_empty());

    let discriminant = fields.opt_string("event", &mut diag);
    let kind = discriminant
        .as_deref()
        .map(EventKind::from_discriminant)
        .unwrap_or(EventKind::Unknown);

    let payload = match kind {
        EventKind::SessionStart => EventPayload::SessionStart(session_start(&fields, &mut diag)),
        EventKind::ModelMetrics => EventPayload::ModelMetrics(model_metrics(&fields, &mut diag)),
        EventKind::SamplingState => EventPayload::SamplingState(sampling_state(&fields, &mut diag)),
        EventKind::SessionEnd => EventPayload::SessionEnd(session_end(&fields, &mut diag)),
        EventKind::StepBegin => EventPayload::StepBegin(StepBeginPayload {
            step_id: fields.i64("step_id", &mut diag),
            step_name: fields.string("step_name", &mut diag),
            layer_id: fields.i64("layer_id", &mut diag),
        }),
        EventKind::StepEnd => EventPayload::StepEnd(step_end(&fields, &mut diag)),
        EventKind::PerformanceMetric => EventPayload::PerformanceMetric(PerformanceMetricPayload {
            metric_name: fields.string("metric_name", &mut diag),
            value: fields.f64("value", &mut diag),
            unit: fields.string("unit", &mut diag),
            duration_ms: fields.opt_f64("duration_ms", &mut diag),
        }),
        EventKind::Unknown => EventPayload::Unknown(UnknownPayload {
            event: discriminant,
        }),
    };

    Event {
        seq,
        timestamp,
        session_id,
        payload,
    }
}

fn session_start(fields: &Fields, diag: &mut Diagnostics) -> SessionStartPayload {
    SessionStartPayload {
        prompt: fields.opt_string("prompt", diag),
        model_info: fields
            .object("model_info", diag)
            .map(|info| model_info(&info, diag)),
    }
}

fn model_info(info: &Fields, diag: &mut Diagnostics) -> ModelInfo {
    ModelInfo {
        n_vocab: info.u64("n_vocab", diag),
        n_layer: info.u64("n_layer", diag),
        n_embd: info.u64("n_embd", diag),
        n_head: info.u64("n_head", diag),
        n_head_kv: info.u64("n_head_kv", diag),
        n_ctx_train: info.u64("n_ctx_train", diag),
        model_size_mb: info.f64("model_size_mb", diag),
    }
}

fn model_metrics(fields: &Fields, diag: &mut Diagnostics) -> ModelMetricsPayload {
    for section in ["model_info", "context_info", "memory_usage"] {
        if !fields.has(section) {
            diag.record(section.to_string(), ShapeProblem::MissingField);
        }
    }

    let info = fields.object_or_empty("model_info", diag);
    let context = fields.object_or_empty("context_info", diag);
    let memory = fields.object_or_empty("memory_usage", diag);

    ModelMetricsPayload {
        model_info: model_info(&info, diag),
        context_info: ContextInfo {
            n_ctx: context.u64("n_ctx", diag),
            n_batch: context.u64("n_batch", diag),
            n_ubatch: context.u64("n_ubatch", diag),
            n_seq_max: context.u64("n_seq_max", diag),
        },
        memory_usage: MemoryUsage {
            model_size_bytes: memory.u64("model_size_bytes", diag),
            context_size_estimate_bytes: memory.u64("context_size_estimate_bytes", diag),
        },
    }
}

fn sampling_state(fields: &Fields, diag: &mut Diagnostics) -> SamplingPayload {
    if !fields.has("sampling") {
        diag.record("sampling".to_string(), ShapeProblem::MissingField);
    }
    let sampling = fields.object_or_empty("sampling", diag);

    let top_tokens = sampling.i64_array("top_tokens", diag);
    let top_probs = sampling.f64_array("top_probs", diag);
    let top_token_texts = sampling.string_array("top_token_texts", diag);

    if top_tokens.len() != top_probs.len() || top_probs.len() != top_token_texts.len() {
        diag.record(
            "sampling.top_*".to_string(),
            ShapeProblem::LengthMismatch {
                tokens: top_tokens.len(),
                probs: top_probs.len(),
                texts: top_token_texts.len(),
            },
        );
    }

    let layer_details = sampling
        .object_array("layer_details", diag)
        .iter()
        .map(|layer| LayerDetail {
            layer_id: layer.i64("layer_id", diag),
            layer_type: layer.string("layer_type", diag),
            operation: layer.string("operation", diag),
            execution_time_us: layer.u64("execution_time_us", diag),
            layer_metrics: layer.number_map("layer_metrics", diag),
        })
        .collect();

    SamplingPayload {
        selected_token: sampling.opt_i64("selected_token", diag),
        selected_prob: sampling.f64("selected_prob", diag),
        sampling_method: sampling.string("sampling_method", diag),
        top_tokens,
        top_probs,
        top_token_texts,
        layer_details,
        sampling_params: sampling.number_map("sampling_params", diag),
    }
}

fn session_end(fields: &Fields, diag: &mut Diagnostics) -> SessionEndPayload {
    SessionEndPayload {
        total_tokens: fields.opt_u64("total_tokens", diag),
        total_time_ms: fields.opt_f64("total_time_ms", diag),
        average_layer_time_us: fields.opt_f64("average_layer_time_us", diag),
        total_layers: fields.opt_u64("total_layers", diag),
        duration_ms: fields.opt_f64("duration_ms", diag),
        total_steps: fields.opt_u64("total_steps", diag),
        input_token_count: fields.opt_u64("input_token_count", diag),
        output_token_count: fields.opt_u64("output_token_count", diag),
    }
}

/// `duration_ms` at the top level wins; otherwise the nested
/// `metrics.execution_time_us` written by the step tracer is converted.
fn step_end(fields: &Fields, diag: &mut Diagnostics) -> StepEndPayload {
    let metrics = fields.object("metrics", diag);

    let duration_ms = fields.opt_f64("duration_ms", diag).or_else(|| {
        metrics
            .as_ref()
            .and_then(|m| m.opt_f64("execution_time_us", diag))
            .map(|us| us / 1000.0)
    });

    let step_name = fields
        .opt_string("step_name", diag)
        .or_else(|| metrics.as_ref().and_then(|m| m.opt_string("step_name", diag)));

    StepEndPayload {
        duration_ms,
        step_name,
    }
}
