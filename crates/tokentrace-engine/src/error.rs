use std::fmt;

/// Result type for tokentrace-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types raised by engine state transitions.
///
/// None of these are fatal: callers log them and keep the previous state.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// An incremental response did not move past the applied watermark
    WatermarkRegression { watermark: usize, total_lines: usize },

    /// Speed can only be changed while playback is not running
    SpeedLocked,

    /// Speed multiplier must be positive and finite
    InvalidSpeed(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WatermarkRegression {
                watermark,
                total_lines,
            } => write!(
                f,
                "Stale log response: total_lines {} does not pass watermark {}",
                total_lines, watermark
            ),
            Error::SpeedLocked => write!(f, "Speed cannot be changed while playing"),
            Error::InvalidSpeed(speed) => write!(f, "Invalid playback speed: {}", speed),
        }
    }
}

impl std::error::Error for Error {}
