//! Row keys and key ranges selecting the rows of a read.

use crate::hex_bytes;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One end of a key or value interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    #[default]
    Unbounded,
    Closed(#[serde(with = "hex_bytes")] Bytes),
    Open(#[serde(with = "hex_bytes")] Bytes),
}

impl Bound {
    pub fn closed(key: impl Into<Bytes>) -> Self {
        Bound::Closed(key.into())
    }

    pub fn open(key: impl Into<Bytes>) -> Self {
        Bound::Open(key.into())
    }
}

/// Returns the smallest key greater than every key starting with `prefix`,
/// or `None` if no such key exists.
fn prefix_successor(prefix: &[u8]) -> Option<Bytes> {
    let end = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut successor = prefix[..=end].to_vec();
    successor[end] += 1;
    Some(Bytes::from(successor))
}

/// A contiguous interval of row keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRange {
    #[serde(default)]
    pub start: Bound,
    #[serde(default)]
    pub end: Bound,
}

impl RowRange {
    /// The range of all keys.
    pub fn infinite() -> Self {
        Self::default()
    }

    /// All keys `>= begin`.
    pub fn starting_at(begin: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::closed(begin),
            end: Bound::Unbounded,
        }
    }

    /// All keys `<= end`.
    pub fn ending_at(end: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::closed(end),
        }
    }

    /// `[begin, end)`
    pub fn right_open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::closed(begin),
            end: Bound::open(end),
        }
    }

    /// `(begin, end]`
    pub fn left_open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::open(begin),
            end: Bound::closed(end),
        }
    }

    /// `(begin, end)`
    pub fn open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::open(begin),
            end: Bound::open(end),
        }
    }

    /// `[begin, end]`
    pub fn closed(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: Bound::closed(begin),
            end: Bound::closed(end),
        }
    }

    /// All keys starting with `prefix`.
    pub fn prefix(prefix: impl Into<Bytes>) -> Self {
        let prefix = prefix.into();
        let end = match prefix_successor(&prefix) {
            Some(successor) => Bound::Open(successor),
            None => Bound::Unbounded,
        };
        Self {
            start: Bound::Closed(prefix),
            end,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let after_start = match &self.start {
            Bound::Unbounded => true,
            Bound::Closed(start) => key >= start.as_ref(),
            Bound::Open(start) => key > start.as_ref(),
        };
        let before_end = match &self.end {
            Bound::Unbounded => true,
            Bound::Closed(end) => key <= end.as_ref(),
            Bound::Open(end) => key < end.as_ref(),
        };
        after_start && before_end
    }

    /// Returns true if no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        // Normalize the start to the smallest key it admits.
        let first: Vec<u8> = match &self.start {
            Bound::Unbounded => Vec::new(),
            Bound::Closed(start) => start.to_vec(),
            Bound::Open(start) => {
                let mut k = start.to_vec();
                k.push(0);
                k
            }
        };
        match &self.end {
            Bound::Unbounded => false,
            Bound::Closed(end) => first.as_slice() > end.as_ref(),
            Bound::Open(end) => first.as_slice() >= end.as_ref(),
        }
    }
}

/// A set of explicit row keys and row ranges.
///
/// An empty set selects every row of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "hex_bytes::vec")]
    pub row_keys: Vec<Bytes>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_ranges: Vec<RowRange>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set containing exactly one key.
    pub fn single(key: impl Into<Bytes>) -> Self {
        Self {
            row_keys: vec![key.into()],
            row_ranges: Vec::new(),
        }
    }

    pub fn append_key(mut self, key: impl Into<Bytes>) -> Self {
        self.row_keys.push(key.into());
        self
    }

    pub fn append_range(mut self, range: RowRange) -> Self {
        self.row_ranges.push(range);
        self
    }

    pub fn is_full_table(&self) -> bool {
        self.row_keys.is_empty() && self.row_ranges.is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.is_full_table()
            || self.row_keys.iter().any(|k| k.as_ref() == key)
            || self.row_ranges.iter().any(|r| r.contains(key))
    }
}

impl From<RowRange> for RowSet {
    fn from(range: RowRange) -> Self {
        Self::new().append_range(range)
    }
}
