use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokentrace_types::{SamplingConfig, SamplingMethod};

use crate::types::{LogLevel, OutputFormat};

#[derive(Parser)]
#[command(name = "tokentrace")]
#[command(about = "Reconstruct, measure and replay token-level inference traces", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: $TOKENTRACE_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Diagnostics written to stderr (falls back to RUST_LOG, then warn)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Decode a trace log and list its sessions")]
    Inspect {
        file: PathBuf,

        /// List every malformed line and shape mismatch
        #[arg(long)]
        verbose: bool,
    },

    #[command(about = "Aggregate latency, throughput and event metrics")]
    Metrics {
        file: PathBuf,

        /// Restrict to one session
        #[arg(long)]
        session: Option<String>,

        /// Trailing one-minute buckets to keep
        #[arg(long)]
        window: Option<usize>,
    },

    #[command(about = "Replay a session's token chain step by step")]
    Replay {
        file: PathBuf,

        /// Session to replay (default: the first one in the log)
        #[arg(long)]
        session: Option<String>,

        /// Playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        #[command(flatten)]
        sampling: SamplingArgs,

        /// Run on a virtual clock and print the result without waiting
        #[arg(long)]
        instant: bool,
    },

    #[command(about = "Follow a session's log until it completes")]
    Watch {
        #[arg(long)]
        session: String,

        /// Tail a local JSONL file instead of the monitoring server
        #[arg(long)]
        file: Option<PathBuf>,

        /// Re-fetch the whole log every cycle instead of the stream endpoint
        #[arg(long)]
        snapshot: bool,
    },

    #[command(about = "Submit a prompt to the monitoring server")]
    Submit {
        #[arg(long)]
        prompt: String,

        #[command(flatten)]
        sampling: SamplingArgs,

        /// Keep following the session after submission
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SamplingArgs {
    /// greedy, top-k, top-p, min-p or temperature
    #[arg(long)]
    pub method: Option<SamplingMethod>,

    #[arg(long)]
    pub top_k: Option<u32>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub min_p: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl SamplingArgs {
    /// None when no sampling flag was given.
    ///
    /// Without `--method`, the method follows the first parameter given.
    pub fn resolve(&self) -> Option<SamplingConfig> {
        let inferred = if self.top_k.is_some() {
            Some(SamplingMethod::TopK)
        } else if self.top_p.is_some() {
            Some(SamplingMethod::TopP)
        } else if self.min_p.is_some() {
            Some(SamplingMethod::MinP)
        } else if self.temperature.is_some() {
            Some(SamplingMethod::Temperature)
        } else {
            None
        };

        let method = self.method.or(inferred);
        if method.is_none() && self.seed.is_none() {
            return None;
        }

        Some(SamplingConfig {
            method: method.unwrap_or_default(),
            top_k: self.top_k,
            top_p: self.top_p,
            temperature: self.temperature,
            min_p: self.min_p,
            seed: self.seed,
        })
    }
}
