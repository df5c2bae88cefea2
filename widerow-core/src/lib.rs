//! # widerow-core
//!
//! Row assembly for the widerow read path.
//!
//! This crate provides:
//! - `Cell` and `Row`, the immutable results of a read
//! - `ReadRowsParser`, which turns a stream of `CellChunk`s into rows
//! - Parser error types separating protocol violations from misuse

pub mod cell;
pub mod error;
pub mod parser;
pub mod row;

pub use cell::Cell;
pub use error::{ErrorKind, ParserError, ProtocolViolation, UsageError};
pub use parser::ReadRowsParser;
pub use row::Row;
