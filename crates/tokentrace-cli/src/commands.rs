use anyhow::Result;
use tokentrace_runtime::Config;
use tracing_subscriber::EnvFilter;

use super::args::{Cli, Commands};
use super::handlers;
use crate::types::LogLevel;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_level);

    let config = Config::load(cli.config.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Inspect { file, verbose } => handlers::inspect::handle(&file, verbose, format),

        Commands::Metrics {
            file,
            session,
            window,
        } => {
            let window = window.unwrap_or(config.metrics.bucket_window);
            handlers::metrics::handle(&file, session, window, format)
        }

        Commands::Replay {
            file,
            session,
            speed,
            sampling,
            instant,
        } => {
            let options = handlers::replay::ReplayOptions {
                session,
                speed,
                sampling: sampling.resolve(),
            };
            if instant {
                handlers::replay::handle_instant(&file, &config, options, format)
            } else {
                runtime()?.block_on(handlers::replay::handle(&file, &config, options, format))
            }
        }

        Commands::Watch {
            session,
            file,
            snapshot,
        } => runtime()?.block_on(handlers::watch::handle(
            &config, &session, file, snapshot, format,
        )),

        Commands::Submit {
            prompt,
            sampling,
            follow,
        } => runtime()?.block_on(handlers::submit::handle(
            &config,
            &prompt,
            sampling.resolve().unwrap_or_default(),
            follow,
            format,
        )),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Diagnostics go to stderr so stdout stays parseable with `--format json`
fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
