use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TOP_K: u32 = 40;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
pub const DEFAULT_MIN_P: f64 = 0.05;

/// Sampling strategy requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMethod {
    #[default]
    Greedy,
    TopK,
    TopP,
    MinP,
    Temperature,
}

impl SamplingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingMethod::Greedy => "greedy",
            SamplingMethod::TopK => "top-k",
            SamplingMethod::TopP => "top-p",
            SamplingMethod::MinP => "min-p",
            SamplingMethod::Temperature => "temperature",
        }
    }
}

impl fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SamplingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "greedy" | "" => Ok(SamplingMethod::Greedy),
            "top-k" | "topk" => Ok(SamplingMethod::TopK),
            "top-p" | "topp" | "nucleus" => Ok(SamplingMethod::TopP),
            "min-p" | "minp" => Ok(SamplingMethod::MinP),
            "temperature" | "temp" => Ok(SamplingMethod::Temperature),
            _ => Err(Error::UnknownSamplingMethod(s.to_string())),
        }
    }
}

/// Sampling configuration submitted with a prompt.
///
/// Wire shape: `{method, top_k?, top_p?, temperature?, min_p?, seed?}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub method: SamplingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SamplingConfig {
    pub fn new(method: SamplingMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn greedy() -> Self {
        Self::new(SamplingMethod::Greedy)
    }

    pub fn top_k(k: u32) -> Self {
        Self {
            top_k: Some(k),
            ..Self::new(SamplingMethod::TopK)
        }
    }

    pub fn top_p(p: f64) -> Self {
        Self {
            top_p: Some(p),
            ..Self::new(SamplingMethod::TopP)
        }
    }

    pub fn min_p(p: f64) -> Self {
        Self {
            min_p: Some(p),
            ..Self::new(SamplingMethod::MinP)
        }
    }

    pub fn temperature(t: f64) -> Self {
        Self {
            temperature: Some(t),
            ..Self::new(SamplingMethod::Temperature)
        }
    }

    /// Rebuild a configuration from what a `sampling_state` record reports.
    /// Unrecognised method names fall back to greedy.
    pub fn from_trace(method_name: &str, params: &BTreeMap<String, f64>) -> Self {
        let method = method_name.parse().unwrap_or_default();
        Self {
            method,
            top_k: params.get("top_k").map(|k| k.max(0.0) as u32),
            top_p: params.get("top_p").copied(),
            temperature: params
                .get("temperature")
                .or_else(|| params.get("temp"))
                .copied(),
            min_p: params.get("min_p").copied(),
            seed: params.get("seed").map(|s| s.max(0.0) as u64),
        }
    }

    pub fn effective_top_k(&self) -> u32 {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn effective_top_p(&self) -> f64 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }

    pub fn effective_temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn effective_min_p(&self) -> f64 {
        self.min_p.unwrap_or(DEFAULT_MIN_P)
    }

    /// Value of the method's governing parameter; None for greedy
    pub fn parameter(&self) -> Option<f64> {
        match self.method {
            SamplingMethod::Greedy => None,
            SamplingMethod::TopK => Some(self.effective_top_k() as f64),
            SamplingMethod::TopP => Some(self.effective_top_p()),
            SamplingMethod::MinP => Some(self.effective_min_p()),
            SamplingMethod::Temperature => Some(self.effective_temperature()),
        }
    }

    /// Display label, e.g. `Top-K (k=40)`
    pub fn label(&self) -> String {
        match self.method {
            SamplingMethod::Greedy => "Greedy".to_string(),
            SamplingMethod::TopK => format!("Top-K (k={})", self.effective_top_k()),
            SamplingMethod::TopP => format!("Top-P (p={})", self.effective_top_p()),
            SamplingMethod::MinP => format!("Min-P (p={})", self.effective_min_p()),
            SamplingMethod::Temperature => {
                format!("Temperature (T={})", self.effective_temperature())
            }
        }
    }

    /// Reject parameters the backend could not honour
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.top_p
            && !(p > 0.0 && p <= 1.0)
        {
            return Err(invalid("top_p", p));
        }
        if let Some(p) = self.min_p
            && !(0.0..=1.0).contains(&p)
        {
            return Err(invalid("min_p", p));
        }
        if let Some(t) = self.temperature
            && !(t.is_finite() && t >= 0.0)
        {
            return Err(invalid("temperature", t));
        }
        if self.top_k == Some(0) {
            return Err(invalid("top_k", 0));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: impl fmt::Display) -> Error {
    Error::InvalidSamplingParameter {
        name,
        value: value.to_string(),
    }
}
