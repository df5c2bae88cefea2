//! # widerow-client
//!
//! Client library for widerow.
//!
//! This crate provides:
//! - Async TCP connection with framed request and response streams
//! - `RowReader`, which assembles streamed chunks into rows
//! - `Table`, the high-level read API
//! - YAML and environment configuration
//!
//! Reads are never retried automatically. Use [`ClientError::is_retryable`]
//! and [`RowReader::last_row_key`] to resume a read that failed midway.

pub mod config;
pub mod connection;
pub mod error;
pub mod reader;
pub mod stream;
pub mod table;

pub use config::{ClientConfig, ConfigError};
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use reader::RowReader;
pub use stream::{FramedResponseStream, ResponseStream};
pub use table::Table;
