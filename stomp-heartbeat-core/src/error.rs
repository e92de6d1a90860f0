//! Error types for stomp-heartbeat

use thiserror::Error;

use crate::heartbeat::spec::{HeaderField, HeaderSide};

/// The main error type for stomp-heartbeat operations
#[derive(Error, Debug)]
pub enum Error {
    /// A heart-beat header did not split into exactly two fields
    #[error("invalid {side} heart-beat header: {value:?}")]
    HeaderFormat { side: HeaderSide, value: String },

    /// A heart-beat header field was not a non-negative base-10 integer
    #[error("non-numeric {side} heart-beat {field} value: {value:?}")]
    HeaderField {
        side: HeaderSide,
        field: HeaderField,
        value: String,
    },

    /// A frame could not be written to the wire
    #[error("Wire error: {0}")]
    Wire(String),

    /// The connection's frame writer is no longer accepting frames
    #[error("Frame writer closed")]
    WriterClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error came out of heart-beat header negotiation
    pub fn is_negotiation(&self) -> bool {
        matches!(self, Error::HeaderFormat { .. } | Error::HeaderField { .. })
    }
}

/// A specialized Result type for stomp-heartbeat operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_field_message_names_side_and_field() {
        let err = Error::HeaderField {
            side: HeaderSide::Client,
            field: HeaderField::X,
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "non-numeric client heart-beat x value: \"abc\""
        );
        assert!(err.is_negotiation());
    }

    #[test]
    fn test_runtime_errors_are_not_negotiation() {
        assert!(!Error::WriterClosed.is_negotiation());
        assert!(!Error::Wire("broken pipe".into()).is_negotiation());
    }
}
