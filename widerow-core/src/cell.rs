//! A single versioned cell.

use bytes::Bytes;
use std::fmt;

/// One version of one column of one row.
///
/// Cells are immutable. Ordering compares row key, family, qualifier,
/// timestamp, value and labels, in that order; the parser itself keeps cells
/// in wire-arrival order and never sorts them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    row_key: Bytes,
    family_name: String,
    column_qualifier: Bytes,
    timestamp: i64,
    value: Bytes,
    labels: Vec<String>,
}

impl Cell {
    pub fn new(
        row_key: impl Into<Bytes>,
        family_name: impl Into<String>,
        column_qualifier: impl Into<Bytes>,
        timestamp: i64,
        value: impl Into<Bytes>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            row_key: row_key.into(),
            family_name: family_name.into(),
            column_qualifier: column_qualifier.into(),
            timestamp,
            value: value.into(),
            labels,
        }
    }

    pub fn row_key(&self) -> &Bytes {
        &self.row_key
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    pub fn column_qualifier(&self) -> &Bytes {
        &self.column_qualifier
    }

    /// Timestamp in microseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Consumes the cell, returning its value without copying it.
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}@{} = {}",
            self.row_key.escape_ascii(),
            self.family_name,
            self.column_qualifier.escape_ascii(),
            self.timestamp,
            self.value.escape_ascii(),
        )?;
        if !self.labels.is_empty() {
            write!(f, " [{}]", self.labels.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let cell = Cell::new("r", "cf", "q", 42, "v", vec!["l1".to_string()]);
        assert_eq!(cell.row_key().as_ref(), b"r");
        assert_eq!(cell.family_name(), "cf");
        assert_eq!(cell.column_qualifier().as_ref(), b"q");
        assert_eq!(cell.timestamp(), 42);
        assert_eq!(cell.value().as_ref(), b"v");
        assert_eq!(cell.labels(), ["l1"]);
    }

    #[test]
    fn test_ordering() {
        let a = Cell::new("r", "a", "q", 10, "", vec![]);
        let b = Cell::new("r", "b", "a", 0, "", vec![]);
        let c = Cell::new("r", "b", "a", 5, "", vec![]);
        let mut cells = vec![c.clone(), a.clone(), b.clone()];
        cells.sort();
        assert_eq!(cells, vec![a, b, c]);
    }

    #[test]
    fn test_display() {
        let cell = Cell::new("row\x01", "cf", "col", 7, "val", vec![]);
        assert_eq!(cell.to_string(), "row\\x01/cf:col@7 = val");

        let cell = Cell::new("r", "cf", "c", 0, "", vec!["a".into(), "b".into()]);
        assert_eq!(cell.to_string(), "r/cf:c@0 =  [a,b]");
    }

    #[test]
    fn test_into_value_keeps_storage() {
        let value = Bytes::from_static(b"payload");
        let ptr = value.as_ptr();
        let cell = Cell::new("r", "cf", "c", 0, value, vec![]);
        assert_eq!(cell.into_value().as_ptr(), ptr);
    }
}
