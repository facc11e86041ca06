// NOTE: Command layout
//
// Every command reads the same append-only event log and derives its view
// (sessions, metrics, playback) from it. File commands decode once and run
// synchronously; `watch`, `submit` and timed `replay` run on a current-thread
// tokio runtime built per invocation.

mod args;
mod commands;
mod handlers;
pub mod types;
mod views;

pub use args::{Cli, Commands, SamplingArgs};
pub use commands::run;
