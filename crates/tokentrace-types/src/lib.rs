pub mod error;
pub mod event;
pub mod sampling;
pub mod submission;
mod timestamp;

pub use error::{Error, Result};
pub use event::*;
pub use sampling::{SamplingConfig, SamplingMethod};
pub use submission::{MAX_PROMPT_CHARS, SubmitRequest, sanitize_prompt};
pub use timestamp::{Timestamp, parse_timestamp, truncate_to_minute};
