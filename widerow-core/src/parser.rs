//! Read-rows chunk parser.
//!
//! A server streams a read as a sequence of [`CellChunk`]s. Each chunk holds
//! all or part of one cell; row key, family and qualifier are only sent when
//! they change, and a large value may be split over several chunks. The
//! parser reassembles the chunks into complete [`Row`]s and validates the
//! stream as it goes.
//!
//! Rules enforced for every chunk:
//! - rows are committed in strictly increasing key order;
//! - a row key may only be repeated while the same row is in progress;
//! - `reset_row` drops the row in progress and carries nothing else;
//! - `commit_row` is only valid once every split value is complete;
//! - a new cell may not start while a split value is still open.
//!
//! The first protocol violation leaves the parser failed. Rows committed
//! before the violation stay available through [`ReadRowsParser::next_row`].

use crate::cell::Cell;
use crate::error::{ParserError, ProtocolViolation, UsageError};
use crate::row::Row;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use tracing::{debug, trace};
use widerow_protocol::{CellChunk, MAX_PAYLOAD_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Open,
    /// End of stream was handled.
    Closed,
    /// A protocol violation was raised.
    Failed,
}

/// Column coordinates inherited by chunks that omit them.
///
/// The timestamp sticks only for chunks that carry no cell field; opening a
/// cell without a timestamp resets it to 0.
#[derive(Debug, Clone)]
struct CellContext {
    family: String,
    qualifier: Bytes,
    timestamp: i64,
}

/// Reassembles rows from a stream of cell chunks.
///
/// The parser does no I/O and never blocks. Feed it chunks in arrival order
/// with [`handle_chunk`](Self::handle_chunk), drain completed rows with
/// [`next_row`](Self::next_row), and call
/// [`handle_end_of_stream`](Self::handle_end_of_stream) once the server
/// closes the stream.
#[derive(Debug)]
pub struct ReadRowsParser {
    lifecycle: Lifecycle,
    pending_row_key: Option<Bytes>,
    pending_cells: Vec<Cell>,
    context: Option<CellContext>,
    /// Labels of the cell being assembled.
    labels: Vec<String>,
    /// Fragments of a split value. `Some` while the value is incomplete.
    value: Option<BytesMut>,
    last_committed_row_key: Option<Bytes>,
    completed_rows: VecDeque<Row>,
}

impl ReadRowsParser {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Open,
            pending_row_key: None,
            pending_cells: Vec::new(),
            context: None,
            labels: Vec::new(),
            value: None,
            last_committed_row_key: None,
            completed_rows: VecDeque::new(),
        }
    }

    /// Processes the next chunk of the stream.
    ///
    /// The chunk is consumed so its value bytes can move into the resulting
    /// cell without a copy.
    pub fn handle_chunk(&mut self, chunk: CellChunk) -> Result<(), ParserError> {
        match self.lifecycle {
            Lifecycle::Closed => return Err(UsageError::ChunkAfterEndOfStream.into()),
            Lifecycle::Failed => return Err(UsageError::ParserFailed.into()),
            Lifecycle::Open => {}
        }

        self.apply(chunk).map_err(|violation| self.fail(violation))
    }

    /// Returns true if at least one completed row is queued.
    pub fn has_next(&self) -> bool {
        !self.completed_rows.is_empty()
    }

    /// Removes and returns the oldest completed row.
    pub fn next_row(&mut self) -> Result<Row, ParserError> {
        self.completed_rows
            .pop_front()
            .ok_or_else(|| UsageError::NoRowAvailable.into())
    }

    /// Signals that the server closed the stream.
    ///
    /// Fails if a row was started but never committed. Rows already queued
    /// remain available afterwards.
    pub fn handle_end_of_stream(&mut self) -> Result<(), ParserError> {
        match self.lifecycle {
            Lifecycle::Closed => return Err(UsageError::EndOfStreamTwice.into()),
            Lifecycle::Failed => return Err(UsageError::ParserFailed.into()),
            Lifecycle::Open => {}
        }

        if self.pending_row_key.is_some() {
            return Err(self.fail(ProtocolViolation::UnfinishedRowAtEnd));
        }
        self.lifecycle = Lifecycle::Closed;
        trace!(rows_queued = self.completed_rows.len(), "end of stream");
        Ok(())
    }

    /// Key of the most recently committed row, the point a retried read
    /// resumes after.
    pub fn last_committed_row_key(&self) -> Option<&Bytes> {
        self.last_committed_row_key.as_ref()
    }

    /// Key of the row in progress, if any.
    pub fn pending_row_key(&self) -> Option<&Bytes> {
        self.pending_row_key.as_ref()
    }

    /// Returns true once end of stream was handled successfully.
    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    /// Returns true once a protocol violation was raised.
    pub fn is_failed(&self) -> bool {
        self.lifecycle == Lifecycle::Failed
    }

    fn fail(&mut self, violation: ProtocolViolation) -> ParserError {
        debug!(
            error = %violation,
            pending_row_key = ?self.pending_row_key,
            "read-rows parser failed"
        );
        self.lifecycle = Lifecycle::Failed;
        self.clear_row();
        ParserError::Protocol(violation)
    }

    fn apply(&mut self, chunk: CellChunk) -> Result<(), ProtocolViolation> {
        if chunk.value_size < 0 {
            return Err(ProtocolViolation::NegativeValueSize(chunk.value_size));
        }
        if chunk.reset_row {
            return self.reset(&chunk);
        }

        let opens_cell = chunk.opens_cell();
        let has_value = chunk.has_value();
        let CellChunk {
            row_key,
            family_name,
            qualifier,
            timestamp_micros,
            labels,
            value,
            value_size,
            commit_row,
            ..
        } = chunk;

        let row_key = self.enter_row(row_key, commit_row && !opens_cell && !has_value)?;

        if opens_cell {
            if self.value.is_some() {
                return Err(ProtocolViolation::NewCellDuringValue);
            }
            if family_name.is_some() && qualifier.is_none() {
                return Err(ProtocolViolation::FamilyWithoutQualifier);
            }
            let sticky = self.context.take();
            let family = match family_name {
                Some(family) => family,
                None => sticky
                    .as_ref()
                    .map(|c| c.family.clone())
                    .ok_or(ProtocolViolation::MissingCellContext)?,
            };
            let qualifier = match qualifier {
                Some(qualifier) => qualifier,
                None => sticky
                    .map(|c| c.qualifier)
                    .ok_or(ProtocolViolation::MissingCellContext)?,
            };
            self.context = Some(CellContext {
                family,
                qualifier,
                timestamp: timestamp_micros.unwrap_or(0),
            });
            self.labels = labels;
        }

        // Once a cell context is open every chunk completes or extends a
        // cell, even one with no value bytes. Before that, a chunk without
        // cell fields or value only carries row status.
        if opens_cell || has_value || self.context.is_some() {
            self.append_value(row_key, value, value_size)?;
        }

        if commit_row {
            self.commit()?;
        }
        Ok(())
    }

    /// Validates the chunk's row key against the row in progress, starting a
    /// new row if none is. Returns the key of the current row.
    fn enter_row(
        &mut self,
        row_key: Option<Bytes>,
        bare_commit: bool,
    ) -> Result<Bytes, ProtocolViolation> {
        if let Some(pending) = &self.pending_row_key {
            return match row_key {
                Some(key) if key != *pending => Err(ProtocolViolation::RowKeyChanged),
                _ => Ok(pending.clone()),
            };
        }

        let Some(key) = row_key else {
            return Err(if bare_commit {
                ProtocolViolation::CommitWithoutRow
            } else {
                ProtocolViolation::MissingRowKey
            });
        };
        if key.is_empty() {
            return Err(ProtocolViolation::EmptyRowKey);
        }
        if self
            .last_committed_row_key
            .as_ref()
            .is_some_and(|last| key <= *last)
        {
            return Err(ProtocolViolation::RowKeyNotIncreasing);
        }
        trace!(row_key = ?key, "row started");
        self.pending_row_key = Some(key.clone());
        Ok(key)
    }

    fn append_value(
        &mut self,
        row_key: Bytes,
        value: Bytes,
        value_size: i32,
    ) -> Result<(), ProtocolViolation> {
        let context = self
            .context
            .as_ref()
            .ok_or(ProtocolViolation::MissingCellContext)?;

        if value_size > 0 {
            let buffer = self.value.get_or_insert_with(|| {
                // The size is only a hint; cap the up-front reservation.
                let hint = (value_size as u32).min(MAX_PAYLOAD_SIZE) as usize;
                BytesMut::with_capacity(hint.max(value.len()))
            });
            buffer.extend_from_slice(&value);
            return Ok(());
        }

        let value = match self.value.take() {
            Some(mut buffer) => {
                buffer.extend_from_slice(&value);
                buffer.freeze()
            }
            None => value,
        };
        let cell = Cell::new(
            row_key,
            context.family.clone(),
            context.qualifier.clone(),
            context.timestamp,
            value,
            std::mem::take(&mut self.labels),
        );
        trace!(cell = %cell, "cell complete");
        self.pending_cells.push(cell);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ProtocolViolation> {
        if self.value.is_some() {
            return Err(ProtocolViolation::CommitDuringValue);
        }
        let row_key = self
            .pending_row_key
            .take()
            .ok_or(ProtocolViolation::CommitWithoutRow)?;
        let cells = std::mem::take(&mut self.pending_cells);
        trace!(row_key = ?row_key, cells = cells.len(), "row committed");

        self.last_committed_row_key = Some(row_key.clone());
        self.completed_rows.push_back(Row::new(row_key, cells));
        self.clear_row();
        Ok(())
    }

    fn reset(&mut self, chunk: &CellChunk) -> Result<(), ProtocolViolation> {
        let Some(pending) = &self.pending_row_key else {
            return Err(ProtocolViolation::ResetWithoutRow);
        };
        if chunk.commit_row {
            return Err(ProtocolViolation::ResetWithCommit);
        }
        if chunk.row_key.as_ref().is_some_and(|key| key != pending) {
            return Err(ProtocolViolation::RowKeyChanged);
        }
        if chunk.opens_cell() || chunk.has_value() {
            return Err(ProtocolViolation::ResetWithPayload);
        }

        trace!(row_key = ?pending, "row reset");
        self.clear_row();
        Ok(())
    }

    fn clear_row(&mut self) {
        self.pending_row_key = None;
        self.pending_cells.clear();
        self.context = None;
        self.labels.clear();
        self.value = None;
    }
}

impl Default for ReadRowsParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn full_chunk() -> CellChunk {
        CellChunk::new()
            .with_row_key("RK")
            .with_family("F")
            .with_qualifier("C")
            .with_timestamp(42)
            .with_value("V")
            .commit()
    }

    fn protocol_error(err: ParserError) -> ProtocolViolation {
        match err {
            ParserError::Protocol(v) => v,
            other => panic!("expected a protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn test_no_chunks_no_rows() {
        let mut parser = ReadRowsParser::new();
        assert!(!parser.has_next());
        parser.handle_end_of_stream().unwrap();
        assert!(!parser.has_next());
        assert!(parser.is_closed());
    }

    #[test]
    fn test_end_of_stream_twice() {
        let mut parser = ReadRowsParser::new();
        parser.handle_end_of_stream().unwrap();
        let err = parser.handle_end_of_stream().unwrap_err();
        assert_eq!(err, ParserError::Usage(UsageError::EndOfStreamTwice));
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_chunk_after_end_of_stream() {
        let mut parser = ReadRowsParser::new();
        parser.handle_end_of_stream().unwrap();
        let err = parser
            .handle_chunk(CellChunk::new().with_value_size(1))
            .unwrap_err();
        assert_eq!(err, ParserError::Usage(UsageError::ChunkAfterEndOfStream));
    }

    #[test]
    fn test_single_chunk() {
        let mut parser = ReadRowsParser::new();
        parser.handle_chunk(full_chunk()).unwrap();
        assert!(parser.has_next());

        let row = parser.next_row().unwrap();
        assert!(!parser.has_next());
        assert_eq!(row.row_key().as_ref(), b"RK");
        assert_eq!(
            row.cells(),
            [Cell::new("RK", "F", "C", 42, "V", vec![])]
        );

        parser.handle_end_of_stream().unwrap();
        assert_eq!(
            parser.next_row().unwrap_err(),
            ParserError::Usage(UsageError::NoRowAvailable)
        );
    }

    #[test]
    fn test_next_after_end_of_stream() {
        let mut parser = ReadRowsParser::new();
        parser.handle_chunk(full_chunk()).unwrap();
        parser.handle_end_of_stream().unwrap();

        assert!(parser.has_next());
        let row = parser.next_row().unwrap();
        assert_eq!(row.len(), 1);
        assert!(!parser.has_next());
    }

    #[test]
    fn test_next_with_no_data() {
        let mut parser = ReadRowsParser::new();
        assert!(parser.next_row().is_err());
        parser.handle_end_of_stream().unwrap();
        assert!(parser.next_row().is_err());
    }

    #[test]
    fn test_single_chunk_value_is_moved() {
        let value = Bytes::from(vec![b'x'; 1024]);
        let ptr = value.as_ptr();

        let mut parser = ReadRowsParser::new();
        parser
            .handle_chunk(full_chunk().with_value(value))
            .unwrap();
        let row = parser.next_row().unwrap();
        assert_eq!(row.cells()[0].value().as_ptr(), ptr);
    }

    #[test]
    fn test_split_value_reserves_hint() {
        let mut parser = ReadRowsParser::new();
        parser
            .handle_chunk(
                CellChunk::new()
                    .with_row_key("RK")
                    .with_family("F")
                    .with_qualifier("C")
                    .with_value("ab")
                    .with_value_size(6),
            )
            .unwrap();
        assert!(parser.value.as_ref().is_some_and(|b| b.capacity() >= 6));

        parser
            .handle_chunk(CellChunk::new().with_value("cd").with_value_size(6))
            .unwrap();
        parser
            .handle_chunk(CellChunk::new().with_value("ef").commit())
            .unwrap();

        let row = parser.next_row().unwrap();
        assert_eq!(row.cells()[0].value().as_ref(), b"abcdef");
        assert_eq!(row.cells()[0].timestamp(), 0);
    }

    #[test]
    fn test_protocol_error_fails_parser() {
        let mut parser = ReadRowsParser::new();
        parser.handle_chunk(full_chunk()).unwrap();

        let err = parser.handle_chunk(full_chunk()).unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::RowKeyNotIncreasing);
        assert!(parser.is_failed());

        // The row committed before the failure is still good.
        assert!(parser.has_next());
        assert_eq!(parser.next_row().unwrap().row_key().as_ref(), b"RK");

        let next = full_chunk().with_row_key("RL");
        assert_eq!(
            parser.handle_chunk(next).unwrap_err(),
            ParserError::Usage(UsageError::ParserFailed)
        );
        assert_eq!(
            parser.handle_end_of_stream().unwrap_err(),
            ParserError::Usage(UsageError::ParserFailed)
        );
    }

    #[test]
    fn test_end_of_stream_with_pending_row() {
        let mut parser = ReadRowsParser::new();
        let mut chunk = full_chunk();
        chunk.commit_row = false;
        parser.handle_chunk(chunk).unwrap();
        assert_eq!(parser.pending_row_key().map(|k| k.as_ref()), Some(&b"RK"[..]));

        let err = parser.handle_end_of_stream().unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::UnfinishedRowAtEnd);
        assert!(!parser.has_next());
    }

    #[test]
    fn test_last_committed_row_key() {
        let mut parser = ReadRowsParser::new();
        assert!(parser.last_committed_row_key().is_none());
        parser.handle_chunk(full_chunk()).unwrap();
        assert_eq!(
            parser.last_committed_row_key().map(|k| k.as_ref()),
            Some(&b"RK"[..])
        );
        assert!(parser.pending_row_key().is_none());
    }

    #[test]
    fn test_negative_value_size() {
        let mut parser = ReadRowsParser::new();
        let err = parser
            .handle_chunk(full_chunk().with_value_size(-1))
            .unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::NegativeValueSize(-1));
    }

    #[test]
    fn test_empty_row_key() {
        let mut parser = ReadRowsParser::new();
        let err = parser
            .handle_chunk(full_chunk().with_row_key(""))
            .unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::EmptyRowKey);
    }

    #[test]
    fn test_empty_chunk_completes_cell_in_context() {
        let mut parser = ReadRowsParser::new();
        let mut chunk = full_chunk();
        chunk.commit_row = false;
        parser.handle_chunk(chunk).unwrap();
        parser.handle_chunk(CellChunk::new()).unwrap();
        parser.handle_chunk(CellChunk::new().commit()).unwrap();

        let row = parser.next_row().unwrap();
        assert_eq!(row.len(), 3);
        for cell in &row.cells()[1..] {
            assert_eq!(cell.family_name(), "F");
            assert_eq!(cell.column_qualifier().as_ref(), b"C");
            assert_eq!(cell.timestamp(), 42);
            assert!(cell.value().is_empty());
        }
    }

    #[test]
    fn test_key_only_chunks_without_context_add_no_cells() {
        let mut parser = ReadRowsParser::new();
        parser
            .handle_chunk(CellChunk::new().with_row_key("RK"))
            .unwrap();
        parser.handle_chunk(CellChunk::new().commit()).unwrap();

        let row = parser.next_row().unwrap();
        assert_eq!(row.row_key().as_ref(), b"RK");
        assert!(row.is_empty());
    }

    #[test]
    fn test_bare_commit_without_row() {
        let mut parser = ReadRowsParser::new();
        let err = parser.handle_chunk(CellChunk::new().commit()).unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::CommitWithoutRow);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut parser = ReadRowsParser::new();
        parser
            .handle_chunk(
                CellChunk::new()
                    .with_row_key("RK")
                    .with_family("F")
                    .with_qualifier("C")
                    .with_value("partial")
                    .with_value_size(20),
            )
            .unwrap();
        parser.handle_chunk(CellChunk::new().reset()).unwrap();
        assert!(parser.pending_row_key().is_none());
        assert!(parser.value.is_none());

        // The same key may start again after a reset.
        parser.handle_chunk(full_chunk()).unwrap();
        let row = parser.next_row().unwrap();
        assert_eq!(row.cells()[0].value().as_ref(), b"V");
    }

    #[test]
    fn test_reset_with_matching_key_allowed() {
        let mut parser = ReadRowsParser::new();
        let mut chunk = full_chunk();
        chunk.commit_row = false;
        parser.handle_chunk(chunk).unwrap();
        parser
            .handle_chunk(CellChunk::new().with_row_key("RK").reset())
            .unwrap();

        let mut parser = ReadRowsParser::new();
        let mut chunk = full_chunk();
        chunk.commit_row = false;
        parser.handle_chunk(chunk).unwrap();
        let err = parser
            .handle_chunk(CellChunk::new().with_row_key("OTHER").reset())
            .unwrap_err();
        assert_eq!(protocol_error(err), ProtocolViolation::RowKeyChanged);
    }

    #[test]
    fn test_parser_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ReadRowsParser>();
    }
}
