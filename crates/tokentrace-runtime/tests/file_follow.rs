use tokentrace_engine::{SessionStatus, sessions};
use tokentrace_runtime::{FileSource, IngestConfig, IngestMode, Ingestor};
use tokentrace_testing::fixtures::hello_trace;
use tokentrace_testing::{TestWorld, TraceBuilder};

#[tokio::test]
async fn test_follow_growing_file() -> anyhow::Result<()> {
    let lines = hello_trace().lines().to_vec();
    let world = TestWorld::new().with_log_text("run.jsonl", "");
    world.append_lines("run.jsonl", &lines[..2])?;

    let source = FileSource::new(world.path("run.jsonl"));
    let mut ingestor = Ingestor::new(source, "S1", &IngestConfig::default());

    let first = ingestor.poll_once().await?;
    assert_eq!(first.new_events, 2);
    assert_eq!(sessions(ingestor.log())[0].status, SessionStatus::Active);

    world.append_lines("run.jsonl", &lines[2..])?;
    let second = ingestor.poll_once().await?;
    assert_eq!(second.first_new_event, 2);
    assert_eq!(second.new_events, 2);

    let idle = ingestor.poll_once().await?;
    assert_eq!(idle.new_events, 0);

    let log = ingestor.into_log();
    assert_eq!(log.len(), 4);
    assert_eq!(sessions(&log)[0].status, SessionStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_mode_over_file() -> anyhow::Result<()> {
    let trace = TraceBuilder::new("s")
        .session_start("p")
        .raw("not-json")
        .token(1, "a", 0.5);
    let world = TestWorld::new().with_trace("run.jsonl", &trace);

    let source = FileSource::new(world.path("run.jsonl"));
    let mut ingestor =
        Ingestor::new(source, "s", &IngestConfig::default()).with_mode(IngestMode::Snapshot);

    let outcome = ingestor.poll_once().await?;
    assert_eq!(outcome.new_events, 2);
    assert_eq!(outcome.report.malformed, 1);
    assert_eq!(ingestor.log().watermark(), 3);

    let again = ingestor.poll_once().await?;
    assert_eq!(again.new_events, 0);
    Ok(())
}
