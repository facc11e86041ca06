pub mod assembler;
pub mod summary;
pub mod types;

pub use assembler::{attribute_sessions, reconstruct_sessions};
pub use summary::{SessionSummary, summarize};
pub use types::{Session, SessionStatus};
