use std::fmt;

/// Result type for tokentrace-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading trace sources
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A non-blank line that could not be parsed as a structured record.
/// Skipped and counted; never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Zero-based line index in the source
    pub line: usize,
    pub kind: DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Not valid JSON
    InvalidJson(String),

    /// Valid JSON, but not an object (e.g. a bare number or array)
    NotAnObject(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DecodeErrorKind::InvalidJson(msg) => {
                write!(f, "line {}: invalid JSON: {}", self.line, msg)
            }
            DecodeErrorKind::NotAnObject(found) => {
                write!(f, "line {}: expected a JSON object, found {}", self.line, found)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A payload field that was missing or had the wrong shape.
/// The field was replaced by its default; this is a diagnostic, not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub line: usize,
    /// Dotted field path, e.g. `sampling.top_probs`
    pub field: String,
    pub problem: ShapeProblem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeProblem {
    MissingField,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// Parallel candidate arrays of different lengths (truncated to the shortest)
    LengthMismatch {
        tokens: usize,
        probs: usize,
        texts: usize,
    },
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            ShapeProblem::MissingField => {
                write!(f, "line {}: missing field {}", self.line, self.field)
            }
            ShapeProblem::WrongType { expected, found } => write!(
                f,
                "line {}: field {} expected {}, found {}",
                self.line, self.field, expected, found
            ),
            ShapeProblem::LengthMismatch {
                tokens,
                probs,
                texts,
            } => write!(
                f,
                "line {}: {} arrays differ in length (tokens={}, probs={}, texts={})",
                self.line, self.field, tokens, probs, texts
            ),
        }
    }
}
