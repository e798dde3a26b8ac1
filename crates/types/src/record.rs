//! Input records as returned by the query collaborator
//!
//! A [`RecordSet`] is the materialized result of one database query: a
//! declared column list plus rows of dynamically typed [`Value`]s. The
//! engine never sees SQL; it only sees these rows.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single cell value
///
/// Grouping treats values with exact equality; `Null` is its own
/// equivalence class, and `Integer(2)` is distinct from `Number(2.0)`.
/// Numbers order with `total_cmp`, so values are usable as sorted map
/// keys even when NaN appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Read this value as a float, coercing where the original data
    /// would have (numeric text parses, everything else is `None`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Null | Value::Timestamp(_) => None,
        }
    }

    /// Read this value as a timestamp
    ///
    /// Text values are parsed leniently (`YYYY-MM-DD`, with optional
    /// `T` or space-separated time and fractional seconds). Malformed
    /// text coerces to `None` rather than erroring, matching the
    /// "coerce and drop with a warning" input policy.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
            Value::Timestamp(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Timestamp(d.and_hms_opt(0, 0, 0).expect("midnight is valid"))
    }
}

/// Parse a timestamp from text, returning `None` on malformed input
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One input row: a mapping from column name to value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Build a record from (column, value) pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a cell by column name; absent columns read as `Null`
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }

    /// Set a cell, replacing any existing value
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Whether the record carries the given column (even if null)
    pub fn has_column(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Read a cell as a timestamp, coercing text
    pub fn timestamp(&self, column: &str) -> Option<NaiveDateTime> {
        self.get(column).as_timestamp()
    }

    /// Read a cell as a float, coercing numeric text
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).as_f64()
    }
}

/// A materialized query result: declared columns plus rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordSet {
    /// Create an empty record set with the given column list
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    /// Build from rows, taking the column list from the first row
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.values.keys().cloned().collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the declared column list includes the given name
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Keep only rows matching the predicate
    pub fn retain<F: FnMut(&Record) -> bool>(&mut self, f: F) {
        self.rows.retain(f);
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_grouping_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Integer(0));
        assert_ne!(Value::Integer(2), Value::Number(2.0));
        assert_eq!(Value::Text("A".into()), Value::Text("A".into()));
    }

    #[test]
    fn test_value_nan_is_orderable() {
        // NaN must not break map-key ordering
        let nan = Value::Number(f64::NAN);
        assert_eq!(nan.cmp(&nan), Ordering::Equal);
        assert!(Value::Number(1.0) < Value::Number(f64::NAN));
    }

    #[test]
    fn test_numeric_text_coerces() {
        assert_eq!(Value::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Value::Text("n/a".into()).as_f64(), None);
    }

    #[test]
    fn test_timestamp_parsing() {
        assert!(parse_timestamp("2024-01-03").is_some());
        assert!(parse_timestamp("2024-01-03 10:30:00").is_some());
        assert!(parse_timestamp("2024-01-03T10:30:00.250").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn test_record_missing_column_reads_null() {
        let rec = Record::from_pairs([("amt", 10.0)]);
        assert!(rec.get("vendor_name").is_null());
        assert_eq!(rec.number("amt"), Some(10.0));
    }

    #[test]
    fn test_record_set_from_rows() {
        let rs = RecordSet::from_rows(vec![
            Record::from_pairs([("amt", Value::from(10.0)), ("vendor", "A".into())]),
            Record::from_pairs([("amt", Value::from(20.0)), ("vendor", "B".into())]),
        ]);
        assert_eq!(rs.len(), 2);
        assert!(rs.has_column("vendor"));
        assert!(!rs.has_column("driver"));
    }
}
