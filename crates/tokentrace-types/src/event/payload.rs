use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event payload variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// 1. Session header: prompt and (optionally) model shape
    SessionStart(SessionStartPayload),

    /// 2. Model, context and memory figures
    ModelMetrics(ModelMetricsPayload),

    /// 3. One token selection with its candidate distribution
    SamplingState(SamplingPayload),

    /// 4. Session footer with totals
    SessionEnd(SessionEndPayload),

    /// 5. Start of a compute step
    StepBegin(StepBeginPayload),

    /// 6. End of a compute step (carries the step latency)
    StepEnd(StepEndPayload),

    /// 7. Free-form named metric
    PerformanceMetric(PerformanceMetricPayload),

    /// Anything outside the closed set. Counted, never interpreted.
    Unknown(UnknownPayload),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStartPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Written by the backend's session header alongside the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub n_vocab: u64,
    pub n_layer: u64,
    pub n_embd: u64,
    pub n_head: u64,
    pub n_head_kv: u64,
    pub n_ctx_train: u64,
    pub model_size_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub n_ctx: u64,
    pub n_batch: u64,
    pub n_ubatch: u64,
    pub n_seq_max: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub model_size_bytes: u64,
    pub context_size_estimate_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetricsPayload {
    pub model_info: ModelInfo,
    pub context_info: ContextInfo,
    pub memory_usage: MemoryUsage,
}

impl ModelMetricsPayload {
    /// Model weights plus estimated context, in GiB
    pub fn estimated_memory_gib(&self) -> f64 {
        self.model_info.model_size_mb / 1024.0
            + self.memory_usage.context_size_estimate_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingPayload {
    /// None when the record did not carry a usable token id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_token: Option<i64>,
    pub selected_prob: f64,
    pub sampling_method: String,

    /// Parallel arrays. Positions correspond across all three; only the
    /// prefix shared by all of them is meaningful (see `aligned_len`).
    pub top_tokens: Vec<i64>,
    pub top_probs: Vec<f64>,
    pub top_token_texts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layer_details: Vec<LayerDetail>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sampling_params: BTreeMap<String, f64>,
}

/// One aligned entry of the candidate arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateRef<'a> {
    pub token: i64,
    pub text: &'a str,
    pub probability: f64,
}

impl SamplingPayload {
    /// Length of the prefix shared by `top_tokens`, `top_probs` and `top_token_texts`.
    pub fn aligned_len(&self) -> usize {
        self.top_tokens
            .len()
            .min(self.top_probs.len())
            .min(self.top_token_texts.len())
    }

    /// Candidates in log order, truncated to the shortest parallel array.
    pub fn candidates(&self) -> impl Iterator<Item = CandidateRef<'_>> {
        (0..self.aligned_len()).map(move |i| CandidateRef {
            token: self.top_tokens[i],
            text: &self.top_token_texts[i],
            probability: self.top_probs[i],
        })
    }

    /// Text emitted by this step.
    ///
    /// The text aligned with `selected_token` in `top_tokens` when it is listed,
    /// otherwise the first candidate text, otherwise empty.
    pub fn selected_text(&self) -> &str {
        if let Some(selected) = self.selected_token
            && let Some(pos) = self.top_tokens.iter().position(|t| *t == selected)
            && let Some(text) = self.top_token_texts.get(pos)
        {
            return text;
        }
        self.top_token_texts
            .first()
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Summed execution time of the layers traced for this token
    pub fn total_layer_time_us(&self) -> u64 {
        self.layer_details.iter().map(|l| l.execution_time_us).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerDetail {
    pub layer_id: i64,
    pub layer_type: String,
    pub operation: String,
    pub execution_time_us: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layer_metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionEndPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_layer_time_us: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_layers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_token_count: Option<u64>,
}

impl SessionEndPayload {
    /// Generation speed reported by the footer; 0 when time is missing or zero
    pub fn tokens_per_second(&self) -> f64 {
        let tokens = self.total_tokens.unwrap_or(0) as f64;
        match self.total_time_ms.or(self.duration_ms) {
            Some(ms) if ms > 0.0 => tokens * 1000.0 / ms,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBeginPayload {
    pub step_id: i64,
    pub step_name: String,
    pub layer_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepEndPayload {
    /// Step latency; None when the record carried no duration at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetricPayload {
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnknownPayload {
    /// Raw discriminant, if the record had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}
