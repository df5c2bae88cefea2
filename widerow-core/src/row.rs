//! A complete row as assembled by the parser.

use crate::cell::Cell;
use bytes::Bytes;
use widerow_protocol::CellChunk;

/// All cells returned for one row key, in the order the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    row_key: Bytes,
    cells: Vec<Cell>,
}

impl Row {
    /// Every cell must carry `row_key`; the parser guarantees this.
    pub(crate) fn new(row_key: Bytes, cells: Vec<Cell>) -> Self {
        debug_assert!(cells.iter().all(|c| *c.row_key() == row_key));
        Self { row_key, cells }
    }

    pub fn row_key(&self) -> &Bytes {
        &self.row_key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells of the given family, in row order.
    pub fn cells_in_family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |c| c.family_name() == family)
    }

    /// Encodes the row as one unsplit chunk per cell, committing on the last.
    ///
    /// Every chunk repeats the full cell key, so the chunks parse back into an
    /// identical row. A row without cells encodes as a single key-and-commit
    /// chunk.
    pub fn to_chunks(&self) -> Vec<CellChunk> {
        if self.cells.is_empty() {
            return vec![CellChunk::new().with_row_key(self.row_key.clone()).commit()];
        }

        let mut chunks: Vec<CellChunk> = self
            .cells
            .iter()
            .map(|cell| {
                CellChunk::new()
                    .with_row_key(self.row_key.clone())
                    .with_family(cell.family_name())
                    .with_qualifier(cell.column_qualifier().clone())
                    .with_timestamp(cell.timestamp())
                    .with_labels(cell.labels().iter().cloned())
                    .with_value(cell.value().clone())
            })
            .collect();
        if let Some(last) = chunks.last_mut() {
            last.commit_row = true;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        let key = Bytes::from_static(b"r1");
        Row::new(
            key.clone(),
            vec![
                Cell::new(key.clone(), "a", "c1", 1, "v1", vec![]),
                Cell::new(key.clone(), "b", "c2", 2, "v2", vec!["L".into()]),
                Cell::new(key, "a", "c3", 3, "v3", vec![]),
            ],
        )
    }

    #[test]
    fn test_accessors() {
        let row = sample_row();
        assert_eq!(row.row_key().as_ref(), b"r1");
        assert_eq!(row.len(), 3);
        assert!(!row.is_empty());

        let family_a: Vec<_> = row
            .cells_in_family("a")
            .map(|c| c.column_qualifier().clone())
            .collect();
        assert_eq!(family_a, vec![Bytes::from("c1"), Bytes::from("c3")]);
        assert_eq!(row.cells_in_family("zzz").count(), 0);
    }

    #[test]
    fn test_to_chunks() {
        let chunks = sample_row().to_chunks();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.row_key.as_deref() == Some(&b"r1"[..])));
        assert!(!chunks[0].commit_row);
        assert!(!chunks[1].commit_row);
        assert!(chunks[2].commit_row);
        assert_eq!(chunks[1].labels, vec!["L".to_string()]);
        assert_eq!(chunks[2].timestamp_micros, Some(3));
    }

    #[test]
    fn test_empty_row_to_chunks() {
        let row = Row::new(Bytes::from_static(b"k"), Vec::new());
        let chunks = row.to_chunks();
        assert_eq!(chunks, vec![CellChunk::new().with_row_key("k").commit()]);
    }
}
