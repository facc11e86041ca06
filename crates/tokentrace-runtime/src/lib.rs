pub mod config;
pub mod error;
pub mod ingest;
pub mod playback;
pub mod source;
pub mod submit;

pub use config::{Config, IngestConfig, MetricsConfig, PlaybackSettings, ServerConfig, resolve_config_path};
pub use error::{Error, Result};
pub use ingest::{Backoff, IngestMode, Ingestor};
pub use playback::{TokioScheduler, drive_playback};
pub use source::{FileSource, HttpSource, LogSource};
pub use submit::{SubmitClient, SubmitResponse};
