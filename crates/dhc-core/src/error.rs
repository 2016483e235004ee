//! Error types for HL7 message processing

use thiserror::Error;

/// Result type alias for dhc-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the core HL7 model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid delimiter configuration: {0}")]
    InvalidDelimiters(String),

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Invalid field access: {0}")]
    InvalidFieldAccess(String),

    #[error("Invalid field path: {0}")]
    FieldPath(String),
}

impl Error {
    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a field path error
    pub fn field_path<S: Into<String>>(msg: S) -> Self {
        Error::FieldPath(msg.into())
    }
}
