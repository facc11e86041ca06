use anyhow::Result;
use serde::Serialize;
use tokentrace_decoder::decode_block;
use tokentrace_engine::find_session;
use tokentrace_engine::session::{SessionSummary, summarize};
use tokentrace_runtime::{Config, HttpSource, Ingestor, SubmitClient};
use tokentrace_types::{SamplingConfig, SubmitRequest};

use super::watch;
use crate::types::OutputFormat;
use crate::views::{self, Painter};

#[derive(Serialize)]
struct SubmitOutcome {
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionSummary>,
}

pub async fn handle(
    config: &Config,
    prompt: &str,
    sampling: SamplingConfig,
    follow: bool,
    format: OutputFormat,
) -> Result<()> {
    let request = SubmitRequest::new(prompt, sampling)?;
    let client = SubmitClient::new(&config.server.base_url, config.server.submit_timeout())?;

    let p = Painter::detect();
    if format == OutputFormat::Plain {
        eprintln!(
            "{}",
            p.dim(format!("Submitting to {} ({})", client.endpoint(), request.sampling.label()))
        );
    }

    let reply = client.submit(&request).await?;
    let inline_log = reply.log_text();

    if follow {
        let source = HttpSource::new(&config.server.base_url, config.server.request_timeout())?;
        let mut ingestor = Ingestor::new(source, &reply.session_id, &config.ingest);
        if let Some(text) = &inline_log {
            ingestor.seed(text);
        }
        return watch::follow(ingestor, format).await;
    }

    let session = inline_log.as_deref().and_then(|text| {
        let events = decode_block(text).into_events();
        find_session(&events, &reply.session_id).map(|session| summarize(&session))
    });

    let outcome = SubmitOutcome {
        session_id: reply.session_id,
        status: reply.status,
        log_file_path: reply.log_file_path,
        session,
    };

    match format {
        OutputFormat::Json => views::print_json(&outcome),
        OutputFormat::Plain => {
            println!("{} {}", p.bold("Session:"), outcome.session_id);
            if let Some(path) = &outcome.log_file_path {
                println!("{} {}", p.bold("Log:"), path);
            }
            if let Some(summary) = &outcome.session {
                print!("\n{}", views::session_block(&p, summary));
            }
            Ok(())
        }
    }
}
