use std::fmt;

/// Result type for tokentrace-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Request could not be sent or timed out
    Transport(reqwest::Error),

    /// Server answered with a non-success status
    Server { status: u16, message: String },

    /// Response body was not the expected JSON
    Json(serde_json::Error),

    /// Rejected request (prompt or sampling configuration)
    InvalidRequest(tokentrace_types::Error),
}

impl Error {
    /// Retrieval failures the ingestion loop retries with backoff
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Io(_) => true,
            Error::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Transport(err) if err.is_timeout() => write!(f, "Request timed out: {}", err),
            Error::Transport(err) => write!(f, "Connection failed: {}", err),
            Error::Server { status, message } => write!(f, "Server returned {}: {}", status, message),
            Error::Json(err) => write!(f, "Invalid response: {}", err),
            Error::InvalidRequest(err) => write!(f, "Invalid request: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Transport(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::InvalidRequest(err) => Some(err),
            Error::Config(_) | Error::Server { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<tokentrace_types::Error> for Error {
    fn from(err: tokentrace_types::Error) -> Self {
        Error::InvalidRequest(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
