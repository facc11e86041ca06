use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tokentrace_engine::{
    CandidateSnapshot, ManualScheduler, PlaybackEngine, PlaybackStatus, Scheduler, Session,
    StepOutcome, build_snapshot,
};
use tokentrace_runtime::{Config, TokioScheduler, drive_playback};
use tokentrace_types::SamplingConfig;
use tokio_util::sync::CancellationToken;

use super::{load_trace, select_session};
use crate::types::OutputFormat;
use crate::views::{self, Painter};

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub session: Option<String>,
    pub speed: Option<f64>,
    pub sampling: Option<SamplingConfig>,
}

#[derive(Serialize)]
struct ReplayReport {
    session_id: String,
    status: PlaybackStatus,
    steps_played: usize,
    chain_len: usize,
    speed: f64,
    delay_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    virtual_duration_ms: Option<u128>,
    generated_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    snapshots: Vec<CandidateSnapshot>,
}

fn build_engine<S: Scheduler>(
    file: &Path,
    config: &Config,
    options: &ReplayOptions,
    scheduler: S,
) -> Result<(Session, PlaybackEngine<S>)> {
    if let Some(sampling) = &options.sampling {
        sampling.validate()?;
    }

    let batch = load_trace(file)?;
    let session = select_session(&batch.into_events(), options.session.as_deref())?;

    let playback = config
        .playback
        .engine_config(options.speed, options.sampling.clone());
    let speed = playback.speed;
    let mut engine = PlaybackEngine::from_session(&session, scheduler, playback);
    engine.set_speed(speed)?;

    if engine.chain_len() == 0 {
        anyhow::bail!("Session {} has no token selections to replay", session.session_id);
    }
    Ok((session, engine))
}

fn report<S: Scheduler>(
    session: &Session,
    engine: &PlaybackEngine<S>,
    virtual_duration_ms: Option<u128>,
    snapshots: Vec<CandidateSnapshot>,
) -> ReplayReport {
    ReplayReport {
        session_id: session.session_id.clone(),
        status: engine.status(),
        steps_played: engine.step_index(),
        chain_len: engine.chain_len(),
        speed: engine.speed(),
        delay_ms: engine.delay().as_millis(),
        virtual_duration_ms,
        generated_text: engine.generated_text().to_string(),
        snapshots,
    }
}

/// Run the whole chain on the virtual clock and print the result.
pub fn handle_instant(
    file: &Path,
    config: &Config,
    options: ReplayOptions,
    format: OutputFormat,
) -> Result<()> {
    let (session, mut engine) = build_engine(file, config, &options, ManualScheduler::new())?;

    let snapshots: Vec<CandidateSnapshot> = session
        .token_chain()
        .into_iter()
        .enumerate()
        .map(|(index, step)| build_snapshot(index, step, options.sampling.as_ref()))
        .collect();
    let elapsed = engine.run_to_end();
    let result = report(&session, &engine, Some(elapsed.as_millis()), snapshots);

    match format {
        OutputFormat::Json => views::print_json(&result),
        OutputFormat::Plain => {
            let p = Painter::detect();
            for snapshot in &result.snapshots {
                print!("{}", views::snapshot(&p, snapshot));
            }
            println!();
            println!("{} {}", p.bold("Generated:"), result.generated_text);
            println!(
                "{}",
                p.dim(format!(
                    "{} steps at {}x ({}ms per step, {}ms total)",
                    result.steps_played,
                    result.speed,
                    result.delay_ms,
                    elapsed.as_millis()
                ))
            );
            Ok(())
        }
    }
}

/// Animate the chain in real time; Ctrl-C pauses and prints progress.
pub async fn handle(
    file: &Path,
    config: &Config,
    options: ReplayOptions,
    format: OutputFormat,
) -> Result<()> {
    let (scheduler, mut timers) = TokioScheduler::new();
    let (session, mut engine) = build_engine(file, config, &options, scheduler)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let p = Painter::detect();
    let plain = format == OutputFormat::Plain;

    engine.play();
    let mut snapshots: Vec<CandidateSnapshot> = Vec::new();
    if plain {
        println!(
            "{} {} ({} steps, {}ms per step)",
            p.bold("Replaying"),
            session.session_id,
            engine.chain_len(),
            engine.delay().as_millis()
        );
        if let Some(snapshot) = engine.snapshot() {
            print!("{}", views::snapshot(&p, snapshot));
        }
    } else {
        snapshots.extend(engine.snapshot().cloned());
    }

    let status = drive_playback(&mut engine, &mut timers, &cancel, |engine, outcome| {
        if plain && let StepOutcome::Advanced { text, .. } | StepOutcome::Completed { text } = outcome {
            println!("  {} {:?}", p.dim("selected"), text);
        }
        if let Some(snapshot) = engine.snapshot() {
            if plain {
                print!("{}", views::snapshot(&p, snapshot));
            } else {
                snapshots.push(snapshot.clone());
            }
        }
    })
    .await;

    ctrl_c.abort();

    let result = report(&session, &engine, None, snapshots);
    match format {
        OutputFormat::Json => views::print_json(&result),
        OutputFormat::Plain => {
            println!();
            println!("{} {}", p.bold("Generated:"), result.generated_text);
            if status == PlaybackStatus::Paused {
                println!(
                    "{}",
                    p.dim(format!(
                        "Paused at step {}/{}",
                        result.steps_played, result.chain_len
                    ))
                );
            }
            Ok(())
        }
    }
}
