use anyhow::Result;
use std::path::Path;
use tokentrace_engine::{MetricsOptions, MetricsScope, aggregate};

use super::{load_trace, select_session};
use crate::types::OutputFormat;
use crate::views::{self, Painter};

pub fn handle(
    file: &Path,
    session: Option<String>,
    window: usize,
    format: OutputFormat,
) -> Result<()> {
    let batch = load_trace(file)?;
    let events: Vec<_> = batch.into_events();

    let scope = match session {
        Some(id) => {
            select_session(&events, Some(&id))?;
            MetricsScope::Session(id)
        }
        None => MetricsScope::All,
    };

    let report = aggregate(&events, &scope, &MetricsOptions::default().with_window(window));

    match format {
        OutputFormat::Json => views::print_json(&report),
        OutputFormat::Plain => {
            print!("{}", views::metrics(&Painter::detect(), &report));
            Ok(())
        }
    }
}
