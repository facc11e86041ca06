use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tokentrace_decoder::DecodeReport;
use tokentrace_engine::reconstruct_sessions;
use tokentrace_engine::session::{SessionSummary, summarize};

use super::load_trace;
use crate::types::OutputFormat;
use crate::views::{self, Painter};

#[derive(Serialize)]
struct InspectReport {
    file: String,
    report: DecodeReport,
    sessions: Vec<SessionSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<String>,
}

pub fn handle(file: &Path, verbose: bool, format: OutputFormat) -> Result<()> {
    let batch = load_trace(file)?;
    let events: Vec<_> = batch.events().cloned().collect();
    let sessions: Vec<SessionSummary> = reconstruct_sessions(&events).iter().map(summarize).collect();

    let issues: Vec<String> = if verbose {
        batch
            .errors()
            .map(ToString::to_string)
            .chain(batch.shape_mismatches.iter().map(ToString::to_string))
            .collect()
    } else {
        Vec::new()
    };

    let inspect = InspectReport {
        file: file.display().to_string(),
        report: batch.report,
        sessions,
        issues,
    };

    match format {
        OutputFormat::Json => views::print_json(&inspect),
        OutputFormat::Plain => {
            let p = Painter::detect();
            println!("{}", p.bold(&inspect.file));
            println!("{}", views::decode_report(&p, &inspect.report));

            if inspect.sessions.is_empty() {
                println!("\nNo sessions found");
            }
            for summary in &inspect.sessions {
                print!("\n{}", views::session_block(&p, summary));
            }

            if !inspect.issues.is_empty() {
                println!("\n{}", p.bold("Issues"));
                for issue in &inspect.issues {
                    println!("  {}", issue);
                }
            }
            Ok(())
        }
    }
}
