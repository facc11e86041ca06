use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokentrace_engine::PlaybackConfig;
use tokentrace_types::SamplingConfig;

/// Resolve the config file path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. TOKENTRACE_CONFIG environment variable (with tilde expansion)
/// 3. XDG config directory
pub fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("TOKENTRACE_CONFIG") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("tokentrace").join("config.toml"));
    }

    Err(Error::Config(
        "Could not determine config path: no XDG config directory found".to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Monitoring server serving `/logs` and `/log-monitoring`
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Submission blocks until inference finishes
    pub submit_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            submit_timeout_ms: 120_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub poll_interval_ms: u64,
    /// First retry delay after a transport failure
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            retry_backoff_ms: 2000,
            max_backoff_ms: 30_000,
        }
    }
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub base_delay_ms: u64,
    pub floor_delay_ms: u64,
    pub default_speed: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 2000,
            floor_delay_ms: 200,
            default_speed: 1.0,
        }
    }
}

impl PlaybackSettings {
    pub fn engine_config(&self, speed: Option<f64>, sampling: Option<SamplingConfig>) -> PlaybackConfig {
        PlaybackConfig {
            base_delay: Duration::from_millis(self.base_delay_ms),
            floor_delay: Duration::from_millis(self.floor_delay_ms),
            speed: speed.unwrap_or(self.default_speed),
            sampling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Trailing minute buckets kept in the time series
    pub bucket_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { bucket_window: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub playback: PlaybackSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load from the resolved path; a missing file yields the defaults
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let config_path = resolve_config_path(explicit_path)?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
