//! Raw trace text → classified events.
//!
//! The decoder never fails a batch: lines that are not JSON objects become
//! `DecodeError`s, payload fields of the wrong shape are defaulted and
//! reported as `ShapeMismatch`es, and everything else becomes an `Event`.

mod classify;
mod decode;
pub mod error;
mod fields;
mod wire;

pub use classify::classify;
pub use decode::{DecodeReport, DecodedBatch, LineOutcome, decode_block, decode_file, decode_line, decode_lines, split_lines};
pub use error::{DecodeError, DecodeErrorKind, Error, Result, ShapeMismatch, ShapeProblem};
pub use wire::{IncrementalBatch, LogSnapshot, decode_container};
