//! Client error types.

use crate::config::ConfigError;
use thiserror::Error;
use widerow_core::ParserError;
use widerow_protocol::StatusCode;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] widerow_protocol::WireError),

    #[error("{0}")]
    Parser(#[from] ParserError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connection closed before end of stream")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,

    #[error("server error: {code} - {message}")]
    Status { code: StatusCode, message: String },

    #[error("expected at most one row, got {0}")]
    TooManyRows(usize),
}

impl ClientError {
    /// Returns whether re-issuing the read, resuming after the last row
    /// received, could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) => true,
            ClientError::Timeout => true,
            ClientError::ConnectionClosed => true,
            ClientError::Status { code, .. } => code.is_retryable(),
            ClientError::Parser(e) => e.is_protocol(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use widerow_core::{ProtocolViolation, UsageError};

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(ClientError::Status {
            code: StatusCode::Unavailable,
            message: String::new(),
        }
        .is_retryable());
        assert!(ClientError::from(ParserError::from(ProtocolViolation::RowKeyChanged)).is_retryable());

        assert!(!ClientError::TooManyRows(2).is_retryable());
        assert!(!ClientError::Status {
            code: StatusCode::PermissionDenied,
            message: "no".to_string(),
        }
        .is_retryable());
        assert!(!ClientError::from(ParserError::from(UsageError::NoRowAvailable)).is_retryable());
    }

    #[test]
    fn test_status_display() {
        let err = ClientError::Status {
            code: StatusCode::NotFound,
            message: "table missing".to_string(),
        };
        assert_eq!(err.to_string(), "server error: NOT_FOUND - table missing");
    }
}
