//! Filter expressions evaluated by the server while streaming rows.
//!
//! Filters compose: [`Filter::chain`] feeds the output of each filter into
//! the next, [`Filter::interleave`] unions the outputs of all its members,
//! and [`Filter::condition`] picks a branch per row.
//!
//! ```
//! use widerow_protocol::Filter;
//!
//! // Only the "fam" column family, and only the latest version of each column.
//! let filter = Filter::chain([Filter::family_regex("fam"), Filter::latest(1)]);
//! assert!(matches!(filter, Filter::Chain(ref f) if f.len() == 2));
//! ```
//!
//! Patterns use RE2 syntax. Keys and values may contain arbitrary bytes, so
//! use `\C` for a true single-byte wildcard: `.` does not match `\n`.

use crate::error::WireError;
use crate::row_set::Bound;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Qualifiers of one family within a key interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub family: String,
    pub start: Bound,
    pub end: Bound,
}

/// Interval of cell values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub start: Bound,
    pub end: Bound,
}

/// A row filter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    PassAll,
    BlockAll,
    Sink,
    Chain(Vec<Filter>),
    Interleave(Vec<Filter>),
    Condition {
        predicate: Box<Filter>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        true_filter: Option<Box<Filter>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        false_filter: Option<Box<Filter>>,
    },
    RowKeyRegex(String),
    RowSample(f64),
    FamilyNameRegex(String),
    ColumnQualifierRegex(String),
    ColumnRange(ColumnRange),
    /// Right-open interval `[start, end)` in microseconds.
    TimestampRange { start_micros: i64, end_micros: i64 },
    ValueRegex(String),
    ValueRange(ValueRange),
    CellsPerRowOffset(u32),
    CellsPerRowLimit(u32),
    CellsPerColumnLimit(u32),
    StripValueTransformer,
    ApplyLabelTransformer(String),
}

impl Filter {
    pub fn pass_all() -> Self {
        Filter::PassAll
    }

    pub fn block_all() -> Self {
        Filter::BlockAll
    }

    /// Outputs the row directly to the caller, bypassing the rest of a chain.
    pub fn sink() -> Self {
        Filter::Sink
    }

    /// Only the latest `n` versions of each column.
    pub fn latest(n: u32) -> Self {
        Filter::CellsPerColumnLimit(n)
    }

    /// Families matching `pattern`. The pattern must not contain `:`.
    pub fn family_regex(pattern: impl Into<String>) -> Self {
        Filter::FamilyNameRegex(pattern.into())
    }

    pub fn column_regex(pattern: impl Into<String>) -> Self {
        Filter::ColumnQualifierRegex(pattern.into())
    }

    /// Columns of `family` in `[begin, end)`.
    pub fn column_range(
        family: impl Into<String>,
        begin: impl Into<Bytes>,
        end: impl Into<Bytes>,
    ) -> Self {
        Filter::ColumnRange(ColumnRange {
            family: family.into(),
            start: Bound::closed(begin),
            end: Bound::open(end),
        })
    }

    /// Cells with timestamps in `[start, end)` microseconds.
    pub fn timestamp_range_micros(start: i64, end: i64) -> Self {
        Filter::TimestampRange {
            start_micros: start,
            end_micros: end,
        }
    }

    /// Cells with timestamps in `[start, end)`, both measured from the epoch.
    pub fn timestamp_range(start: Duration, end: Duration) -> Self {
        let micros = |d: Duration| i64::try_from(d.as_micros()).unwrap_or(i64::MAX);
        Self::timestamp_range_micros(micros(start), micros(end))
    }

    pub fn row_keys_regex(pattern: impl Into<String>) -> Self {
        Filter::RowKeyRegex(pattern.into())
    }

    pub fn value_regex(pattern: impl Into<String>) -> Self {
        Filter::ValueRegex(pattern.into())
    }

    /// Values in `[begin, end)`.
    pub fn value_range(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self::value_range_bounds(Bound::closed(begin), Bound::open(end))
    }

    /// Values in `(begin, end]`.
    pub fn value_range_left_open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self::value_range_bounds(Bound::open(begin), Bound::closed(end))
    }

    /// Values in `[begin, end)`.
    pub fn value_range_right_open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self::value_range(begin, end)
    }

    /// Values in `[begin, end]`.
    pub fn value_range_closed(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self::value_range_bounds(Bound::closed(begin), Bound::closed(end))
    }

    /// Values in `(begin, end)`.
    pub fn value_range_open(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self::value_range_bounds(Bound::open(begin), Bound::open(end))
    }

    fn value_range_bounds(start: Bound, end: Bound) -> Self {
        Filter::ValueRange(ValueRange { start, end })
    }

    /// Only the first `n` cells of each row.
    ///
    /// Cells are counted in the order the server emits them (family, then
    /// qualifier, then timestamp), and may repeat under [`Filter::interleave`].
    pub fn cells_row_limit(n: u32) -> Self {
        Filter::CellsPerRowLimit(n)
    }

    /// Skips the first `n` cells of each row.
    pub fn cells_row_offset(n: u32) -> Self {
        Filter::CellsPerRowOffset(n)
    }

    /// Keeps each row with the given probability, which must be in (0, 1).
    pub fn row_sample(probability: f64) -> Result<Self, WireError> {
        if !(probability > 0.0 && probability < 1.0) {
            return Err(WireError::InvalidArgument(format!(
                "row sample probability must be in (0, 1), got {probability}"
            )));
        }
        Ok(Filter::RowSample(probability))
    }

    /// Replaces every value with the empty string.
    pub fn strip_value_transformer() -> Self {
        Filter::StripValueTransformer
    }

    pub fn apply_label_transformer(label: impl Into<String>) -> Self {
        Filter::ApplyLabelTransformer(label.into())
    }

    /// Applies `filters` in sequence, each one to the output of the previous.
    pub fn chain(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Chain(filters.into_iter().collect())
    }

    /// Applies each of `filters` to the input and unions the results.
    pub fn interleave(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Interleave(filters.into_iter().collect())
    }

    /// Applies `true_filter` to rows where `predicate` outputs any cell and
    /// `false_filter` to the rest.
    pub fn condition(predicate: Filter, true_filter: Filter, false_filter: Filter) -> Self {
        Filter::Condition {
            predicate: Box::new(predicate),
            true_filter: Some(Box::new(true_filter)),
            false_filter: Some(Box::new(false_filter)),
        }
    }
}
