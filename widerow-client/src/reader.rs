//! Row reader: turns a response stream into rows.

use crate::error::ClientError;
use crate::stream::ResponseStream;
use bytes::Bytes;
use widerow_core::{ReadRowsParser, Row};

/// Pulls responses from a [`ResponseStream`] and yields complete rows.
///
/// Rows committed before a failure are still handed out; the error is
/// returned once they are drained. After an error or the end of the stream,
/// `next_row` keeps returning `Ok(None)`.
pub struct RowReader<S> {
    stream: S,
    parser: ReadRowsParser,
    /// Maximum rows to hand out, 0 for no limit.
    rows_limit: u64,
    rows_read: u64,
    last_row_key: Option<Bytes>,
    pending_error: Option<ClientError>,
    done: bool,
}

impl<S: ResponseStream> RowReader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            parser: ReadRowsParser::new(),
            rows_limit: 0,
            rows_read: 0,
            last_row_key: None,
            pending_error: None,
            done: false,
        }
    }

    /// Stops after `limit` rows without reading further. 0 means no limit.
    pub fn with_rows_limit(mut self, limit: u64) -> Self {
        self.rows_limit = limit;
        self
    }

    /// Returns the next row, or `Ok(None)` once the read is complete.
    pub async fn next_row(&mut self) -> Result<Option<Row>, ClientError> {
        loop {
            if self.rows_limit > 0 && self.rows_read >= self.rows_limit {
                return Ok(None);
            }
            if self.parser.has_next() {
                let row = self.parser.next_row()?;
                self.rows_read += 1;
                self.last_row_key = Some(row.row_key().clone());
                return Ok(Some(row));
            }
            if let Some(err) = self.pending_error.take() {
                return Err(err);
            }
            if self.done {
                return Ok(None);
            }
            self.advance().await;
        }
    }

    /// Reads every remaining row.
    pub async fn collect_rows(&mut self) -> Result<Vec<Row>, ClientError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Key of the last row returned, where a retried read should resume.
    pub fn last_row_key(&self) -> Option<&Bytes> {
        self.last_row_key.as_ref()
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Fetches one response and feeds it to the parser. Any failure is
    /// parked in `pending_error` so that rows queued before it come first.
    async fn advance(&mut self) {
        let result = match self.stream.next_response().await {
            Ok(Some(response)) => response
                .chunks
                .into_iter()
                .try_for_each(|chunk| self.parser.handle_chunk(chunk)),
            Ok(None) => {
                self.done = true;
                self.parser.handle_end_of_stream()
            }
            Err(err) => {
                tracing::debug!(error = %err, rows_read = self.rows_read, "read stream failed");
                self.done = true;
                self.pending_error = Some(err);
                return;
            }
        };

        if let Err(err) = result {
            tracing::warn!(
                error = %err,
                code = err.error_code(),
                last_row_key = ?self.parser.last_committed_row_key(),
                "row stream violated the chunking protocol"
            );
            self.done = true;
            self.pending_error = Some(err.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use widerow_core::{ParserError, ProtocolViolation};
    use widerow_protocol::{CellChunk, ReadRowsResponse, StatusCode};

    /// Replays canned responses.
    struct Scripted {
        responses: VecDeque<Result<Option<ReadRowsResponse>, ClientError>>,
        calls: usize,
    }

    impl Scripted {
        fn new(responses: Vec<Result<Option<ReadRowsResponse>, ClientError>>) -> Self {
            Self {
                responses: responses.into(),
                calls: 0,
            }
        }
    }

    impl ResponseStream for Scripted {
        async fn next_response(&mut self) -> Result<Option<ReadRowsResponse>, ClientError> {
            self.calls += 1;
            self.responses.pop_front().unwrap_or(Ok(None))
        }
    }

    fn row_chunk(key: &'static str) -> CellChunk {
        CellChunk::new()
            .with_row_key(key)
            .with_family("cf")
            .with_qualifier("c")
            .with_value("v")
            .commit()
    }

    fn response(chunks: Vec<CellChunk>) -> Result<Option<ReadRowsResponse>, ClientError> {
        Ok(Some(ReadRowsResponse::new(chunks)))
    }

    #[tokio::test]
    async fn test_rows_across_responses() {
        let stream = Scripted::new(vec![
            response(vec![row_chunk("a"), row_chunk("b")]),
            response(vec![CellChunk::new()
                .with_row_key("c")
                .with_family("cf")
                .with_qualifier("c")
                .with_value("v")
                .with_value_size(2)]),
            response(vec![CellChunk::new().with_value("w").commit()]),
            Ok(None),
        ]);
        let mut reader = RowReader::new(stream);

        let rows = reader.collect_rows().await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.row_key().clone()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(rows[2].cells()[0].value().as_ref(), b"vw");
        assert_eq!(reader.rows_read(), 3);
        assert_eq!(reader.last_row_key().map(|k| k.as_ref()), Some(&b"c"[..]));
        assert!(reader.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rows_limit_stops_reading() {
        let stream = Scripted::new(vec![
            response(vec![row_chunk("a"), row_chunk("b")]),
            response(vec![row_chunk("c")]),
            Ok(None),
        ]);
        let mut reader = RowReader::new(stream).with_rows_limit(2);

        let rows = reader.collect_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(reader.stream.calls, 1);
    }

    #[tokio::test]
    async fn test_violation_after_good_rows() {
        let stream = Scripted::new(vec![response(vec![
            row_chunk("b"),
            row_chunk("a"),
        ])]);
        let mut reader = RowReader::new(stream);

        let row = reader.next_row().await.unwrap().unwrap();
        assert_eq!(row.row_key().as_ref(), b"b");

        let err = reader.next_row().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Parser(ParserError::Protocol(ProtocolViolation::RowKeyNotIncreasing))
        ));
        assert!(err.is_retryable());
        assert_eq!(reader.last_row_key().map(|k| k.as_ref()), Some(&b"b"[..]));
        assert!(reader.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unfinished_row_at_end() {
        let mut partial = row_chunk("a");
        partial.commit_row = false;
        let stream = Scripted::new(vec![response(vec![partial]), Ok(None)]);
        let mut reader = RowReader::new(stream);

        let err = reader.collect_rows().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Parser(ParserError::Protocol(ProtocolViolation::UnfinishedRowAtEnd))
        ));
    }

    #[tokio::test]
    async fn test_stream_error_after_rows() {
        let stream = Scripted::new(vec![
            response(vec![row_chunk("a")]),
            Err(ClientError::Status {
                code: StatusCode::Aborted,
                message: "retry".to_string(),
            }),
        ]);
        let mut reader = RowReader::new(stream);

        assert!(reader.next_row().await.unwrap().is_some());
        let err = reader.next_row().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(reader.rows_read(), 1);
    }

    #[tokio::test]
    async fn test_empty_read() {
        let mut reader = RowReader::new(Scripted::new(vec![Ok(None)]));
        assert!(reader.collect_rows().await.unwrap().is_empty());
        assert!(reader.last_row_key().is_none());
    }
}
