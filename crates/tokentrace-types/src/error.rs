use std::fmt;

/// Result type for tokentrace-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Prompt was empty once control and zero-width characters were removed
    EmptyPrompt,

    /// Sampling method name not recognised
    UnknownSamplingMethod(String),

    /// Sampling parameter outside its valid range
    InvalidSamplingParameter { name: &'static str, value: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyPrompt => write!(f, "Prompt cannot be empty after sanitization"),
            Error::UnknownSamplingMethod(name) => {
                write!(f, "Unknown sampling method: {}", name)
            }
            Error::InvalidSamplingParameter { name, value } => {
                write!(f, "Invalid sampling parameter {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for Error {}
