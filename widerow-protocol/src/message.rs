//! Message types exchanged on a read-rows stream.
//!
//! A client sends one [`ReadRowsRequest`]. The server answers with any number
//! of [`StreamMessage::Rows`] messages, each carrying a batch of
//! [`CellChunk`]s, and closes the stream with exactly one
//! [`StreamMessage::Status`].

use crate::error::StatusCode;
use crate::filter::Filter;
use crate::hex_bytes;
use crate::row_set::RowSet;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Builds the fully qualified name of a table.
pub fn table_name(project: &str, instance: &str, table: &str) -> String {
    format!("projects/{project}/instances/{instance}/tables/{table}")
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

/// One wire fragment describing all or part of one cell.
///
/// Absent optional fields mean "unchanged from the previous chunk"; a field
/// that is present but empty (for example an empty qualifier) is a real value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChunk {
    /// Present only when starting a row, or confirming the current one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_bytes::option"
    )]
    pub row_key: Option<Bytes>,

    /// Present only when starting a new family scope within the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Present only when starting a new column.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_bytes::option"
    )]
    pub qualifier: Option<Bytes>,

    /// Present only on the first fragment of a new cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_micros: Option<i64>,

    /// Labels applied by the server filter. Empty means absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// This fragment's payload.
    #[serde(default, skip_serializing_if = "Bytes::is_empty", with = "hex_bytes")]
    pub value: Bytes,

    /// Nonzero while more fragments of the same value follow; it is then a
    /// hint of the full value length.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub value_size: i32,

    /// Drop everything received for the row in progress.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reset_row: bool,

    /// The row in progress is complete.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub commit_row: bool,
}

impl CellChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_key(mut self, row_key: impl Into<Bytes>) -> Self {
        self.row_key = Some(row_key.into());
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family_name = Some(family.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<Bytes>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp_micros: i64) -> Self {
        self.timestamp_micros = Some(timestamp_micros);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_value_size(mut self, value_size: i32) -> Self {
        self.value_size = value_size;
        self
    }

    pub fn reset(mut self) -> Self {
        self.reset_row = true;
        self
    }

    pub fn commit(mut self) -> Self {
        self.commit_row = true;
        self
    }

    /// Returns true if the chunk carries any field that opens a new cell.
    pub fn opens_cell(&self) -> bool {
        self.family_name.is_some()
            || self.qualifier.is_some()
            || self.timestamp_micros.is_some()
            || !self.labels.is_empty()
    }

    /// Returns true if the chunk carries value bytes or announces more of them.
    pub fn has_value(&self) -> bool {
        !self.value.is_empty() || self.value_size != 0
    }
}

/// Request to stream rows of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRowsRequest {
    /// Fully qualified table name, see [`table_name`].
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_profile_id: Option<String>,

    /// Rows to read. An empty set reads the whole table.
    #[serde(default)]
    pub rows: RowSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// Maximum number of rows to return, 0 for no limit.
    #[serde(default)]
    pub rows_limit: u64,
}

impl ReadRowsRequest {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            app_profile_id: None,
            rows: RowSet::default(),
            filter: None,
            rows_limit: 0,
        }
    }

    pub fn with_rows(mut self, rows: RowSet) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_rows_limit(mut self, limit: u64) -> Self {
        self.rows_limit = limit;
        self
    }

    pub fn with_app_profile(mut self, app_profile_id: impl Into<String>) -> Self {
        self.app_profile_id = Some(app_profile_id.into());
        self
    }
}

/// One batch of chunks from the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRowsResponse {
    #[serde(default)]
    pub chunks: Vec<CellChunk>,

    /// Highest key the server has scanned, possibly beyond the last row
    /// returned because of filtering.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "hex_bytes::option"
    )]
    pub last_scanned_row_key: Option<Bytes>,
}

impl ReadRowsResponse {
    pub fn new(chunks: Vec<CellChunk>) -> Self {
        Self {
            chunks,
            last_scanned_row_key: None,
        }
    }
}

/// Final status of a read stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn error(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

/// A message on the server-to-client half of a read stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Rows(ReadRowsResponse),
    Status(Status),
}

impl StreamMessage {
    /// Returns true if this message terminates the stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamMessage::Status(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_name() {
        assert_eq!(
            table_name("p", "i", "t"),
            "projects/p/instances/i/tables/t"
        );
    }

    #[test]
    fn test_chunk_serializes_only_present_fields() {
        let chunk = CellChunk::new()
            .with_row_key("RK")
            .with_family("F")
            .with_qualifier("C")
            .with_timestamp(42)
            .with_value("V")
            .commit();

        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(
            value,
            json!({
                "row_key": "524b",
                "family_name": "F",
                "qualifier": "43",
                "timestamp_micros": 42,
                "value": "56",
                "commit_row": true,
            })
        );
    }

    #[test]
    fn test_chunk_empty_qualifier_is_distinct_from_absent() {
        let empty: CellChunk = serde_json::from_str(r#"{"qualifier":""}"#).unwrap();
        assert_eq!(empty.qualifier, Some(Bytes::new()));
        assert!(empty.opens_cell());

        let absent: CellChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.qualifier, None);
        assert!(!absent.opens_cell());
    }

    #[test]
    fn test_chunk_rejects_bad_hex() {
        let result: Result<CellChunk, _> = serde_json::from_str(r#"{"row_key":"zz"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_has_value() {
        assert!(!CellChunk::new().has_value());
        assert!(CellChunk::new().with_value("x").has_value());
        assert!(CellChunk::new().with_value_size(10).has_value());
    }

    #[test]
    fn test_stream_message_tagging() {
        let msg = StreamMessage::Status(Status::error(StatusCode::Unavailable, "try again"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "status");
        assert_eq!(value["code"], "UNAVAILABLE");
        assert!(msg.is_end_of_stream());

        let msg = StreamMessage::Rows(ReadRowsResponse::new(vec![CellChunk::new().commit()]));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "rows");
        assert_eq!(value["chunks"][0]["commit_row"], true);
        assert!(!msg.is_end_of_stream());
    }

    #[test]
    fn test_request_builder() {
        let request = ReadRowsRequest::new(table_name("p", "i", "t"))
            .with_rows(RowSet::single("r1"))
            .with_rows_limit(1)
            .with_filter(Filter::pass_all())
            .with_app_profile("batch");

        let json = serde_json::to_string(&request).unwrap();
        let parsed: ReadRowsRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request);
        assert_eq!(parsed.rows.row_keys.len(), 1);
        assert_eq!(parsed.rows_limit, 1);
    }
}
