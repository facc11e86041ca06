//! Derived performance figures over the event log.
//!
//! Everything here is a pure function of (events, scope, options). No
//! accumulator survives between calls, so recomputing from the same input
//! yields identical output.

mod aggregate;
mod types;

pub use aggregate::aggregate;
pub use types::{
    KindShare, MetricsOptions, MetricsReport, MetricsScope, ModelSummary, TimeBucket,
    DEFAULT_BUCKET_WINDOW,
};
