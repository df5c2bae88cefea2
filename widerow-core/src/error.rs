//! Parser error types.

use thiserror::Error;

/// Broad classification of a [`ParserError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server sent a chunk sequence that breaks the chunking rules.
    Protocol,
    /// The parser was called out of order.
    Usage,
}

/// A chunk sequence that breaks the chunking rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("row keys must be strictly increasing")]
    RowKeyNotIncreasing,

    #[error("row key must not be empty")]
    EmptyRowKey,

    #[error("row key changed in the middle of a row")]
    RowKeyChanged,

    #[error("missing row key for a new row")]
    MissingRowKey,

    #[error("reset_row with no row in progress")]
    ResetWithoutRow,

    #[error("reset_row chunk must not carry cell data")]
    ResetWithPayload,

    #[error("reset_row and commit_row in the same chunk")]
    ResetWithCommit,

    #[error("family name without a column qualifier")]
    FamilyWithoutQualifier,

    #[error("cell data with no family or qualifier in this row")]
    MissingCellContext,

    #[error("new cell started before the previous value was complete")]
    NewCellDuringValue,

    #[error("negative value_size {0}")]
    NegativeValueSize(i32),

    #[error("commit_row with no row in progress")]
    CommitWithoutRow,

    #[error("commit_row in the middle of a split value")]
    CommitDuringValue,

    #[error("end of stream with an uncommitted row")]
    UnfinishedRowAtEnd,
}

/// The parser was driven outside its contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("chunk received after end of stream")]
    ChunkAfterEndOfStream,

    #[error("end of stream signalled twice")]
    EndOfStreamTwice,

    #[error("no row available")]
    NoRowAvailable,

    #[error("parser is unusable after a protocol error")]
    ParserFailed,
}

/// Errors from [`ReadRowsParser`](crate::ReadRowsParser).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("parser misuse: {0}")]
    Usage(#[from] UsageError),
}

impl ParserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParserError::Protocol(_) => ErrorKind::Protocol,
            ParserError::Usage(_) => ErrorKind::Usage,
        }
    }

    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// Returns a stable code for logs and CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            ParserError::Protocol(v) => match v {
                ProtocolViolation::RowKeyNotIncreasing => "ROW_KEY_NOT_INCREASING",
                ProtocolViolation::EmptyRowKey => "EMPTY_ROW_KEY",
                ProtocolViolation::RowKeyChanged => "ROW_KEY_CHANGED",
                ProtocolViolation::MissingRowKey => "MISSING_ROW_KEY",
                ProtocolViolation::ResetWithoutRow => "RESET_WITHOUT_ROW",
                ProtocolViolation::ResetWithPayload => "RESET_WITH_PAYLOAD",
                ProtocolViolation::ResetWithCommit => "RESET_WITH_COMMIT",
                ProtocolViolation::FamilyWithoutQualifier => "FAMILY_WITHOUT_QUALIFIER",
                ProtocolViolation::MissingCellContext => "MISSING_CELL_CONTEXT",
                ProtocolViolation::NewCellDuringValue => "NEW_CELL_DURING_VALUE",
                ProtocolViolation::NegativeValueSize(_) => "NEGATIVE_VALUE_SIZE",
                ProtocolViolation::CommitWithoutRow => "COMMIT_WITHOUT_ROW",
                ProtocolViolation::CommitDuringValue => "COMMIT_DURING_VALUE",
                ProtocolViolation::UnfinishedRowAtEnd => "UNFINISHED_ROW_AT_END",
            },
            ParserError::Usage(u) => match u {
                UsageError::ChunkAfterEndOfStream => "CHUNK_AFTER_END_OF_STREAM",
                UsageError::EndOfStreamTwice => "END_OF_STREAM_TWICE",
                UsageError::NoRowAvailable => "NO_ROW_AVAILABLE",
                UsageError::ParserFailed => "PARSER_FAILED",
            },
        }
    }
}
