//! # widerow-protocol
//!
//! Wire protocol for the widerow read path.
//!
//! This crate provides:
//! - `CellChunk`, the fragment unit servers use to stream cells
//! - Read requests, row sets and filter expressions
//! - Binary framing with length prefix and CRC32C validation
//! - JSON and line-delimited JSON codecs
//! - Wire error types and stream status codes

pub mod codec;
pub mod error;
pub mod filter;
pub mod frame;
mod hex_bytes;
pub mod message;
pub mod row_set;

pub use codec::{Decoder, Encoder};
pub use error::{StatusCode, WireError};
pub use filter::Filter;
pub use frame::{Frame, FrameFlags, FRAME_HEADER_SIZE, MAGIC};
pub use message::{
    table_name, CellChunk, ReadRowsRequest, ReadRowsResponse, Status, StreamMessage,
};
pub use row_set::{Bound, RowRange, RowSet};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for a widerow data endpoint.
pub const DEFAULT_PORT: u16 = 8086;

/// Maximum frame payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
