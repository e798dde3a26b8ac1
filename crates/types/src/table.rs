//! Output boundary table
//!
//! A [`Table`] is what the engine hands to the presentation collaborator:
//! a stable column order plus rows of [`Value`]s, ready for tabular
//! display, charting, or records-oriented JSON.
//!
//! NaN handling is deliberate: derived series keep NaN for undefined
//! ratios all the way through the pipeline, and [`Table::for_display`]
//! is the single place where NaN is coerced to zero for rendering.

use crate::errors::{Result, TypesError};
use crate::record::Value;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

/// Row-type tag applied to ordinary data rows by [`Table::with_totals`]
pub const ROW_TYPE_DATA: &str = "Data";

/// Row-type tag applied to the appended summary row
pub const ROW_TYPE_TOTAL: &str = "Total";

/// An ordered, column-named result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column order
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

    /// Append a row; arity must match the column list
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TypesError::RowArity {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| TypesError::UnknownColumn {
                column: column.to_string(),
            })
    }

    /// Read a cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Result<&Value> {
        let idx = self.column_index(column)?;
        Ok(self.rows.get(row).map(|r| &r[idx]).unwrap_or(&Value::Null))
    }

    /// Values of one column, in row order
    pub fn column_values(&self, column: &str) -> Result<Vec<Value>> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Display copy: NaN cells become zero
    ///
    /// This is the only NaN-to-zero coercion point in the system; stored
    /// series keep NaN so that undefined ratios stay distinguishable
    /// from true zeros.
    pub fn for_display(&self) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| match v {
                        Value::Number(n) if n.is_nan() => Value::Number(0.0),
                        other => other.clone(),
                    })
                    .collect()
            })
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Copy of this table with a row-type column and an appended summary
    /// row: `summed` columns are totalled, `averaged` columns get the
    /// mean of their non-null cells (NaN when there are none). Averaged
    /// measures are kept out of `summed` so a consumer re-summing the
    /// table cannot silently double-count rate-like values.
    pub fn with_totals(
        &self,
        row_type_column: &str,
        summed: &[&str],
        averaged: &[&str],
    ) -> Result<Table> {
        for col in summed.iter().chain(averaged) {
            self.column_index(col)?;
        }

        let mut columns = self.columns.clone();
        columns.push(row_type_column.to_string());

        let mut rows: Vec<Vec<Value>> = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.push(Value::Text(ROW_TYPE_DATA.to_string()));
                row
            })
            .collect();

        let mut total_row: Vec<Value> = Vec::with_capacity(columns.len());
        for name in &self.columns {
            let cell = if summed.contains(&name.as_str()) {
                Value::Number(self.numeric_column(name).iter().sum())
            } else if averaged.contains(&name.as_str()) {
                let vals = self.numeric_column(name);
                if vals.is_empty() {
                    Value::Number(f64::NAN)
                } else {
                    Value::Number(vals.iter().sum::<f64>() / vals.len() as f64)
                }
            } else {
                Value::Null
            };
            total_row.push(cell);
        }
        total_row.push(Value::Text(ROW_TYPE_TOTAL.to_string()));
        rows.push(total_row);

        Ok(Table { columns, rows })
    }

    /// Records-oriented JSON, the shape the dashboard consumes
    ///
    /// NaN cells serialize as JSON null.
    pub fn to_json_records(&self) -> serde_json::Value {
        let records: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut map = Map::new();
                for (name, value) in self.columns.iter().zip(row) {
                    let cell = match value {
                        Value::Null => serde_json::Value::Null,
                        Value::Integer(i) => json!(i),
                        Value::Number(n) => json!(n),
                        Value::Text(s) => json!(s),
                        Value::Timestamp(ts) => json!(ts.format("%Y-%m-%d").to_string()),
                    };
                    map.insert(name.clone(), cell);
                }
                serde_json::Value::Object(map)
            })
            .collect();
        serde_json::Value::Array(records)
    }

    fn numeric_column(&self, column: &str) -> Vec<f64> {
        let idx = match self.column_index(column) {
            Ok(idx) => idx,
            Err(_) => return Vec::new(),
        };
        self.rows
            .iter()
            .filter_map(|r| r[idx].as_f64())
            .filter(|n| !n.is_nan())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(["vendor_name", "total_sales", "delivered_percentage"]);
        t.push_row(vec!["A".into(), Value::Number(100.0), Value::Number(50.0)])
            .unwrap();
        t.push_row(vec!["B".into(), Value::Number(40.0), Value::Number(f64::NAN)])
            .unwrap();
        t
    }

    #[test]
    fn test_arity_checked() {
        let mut t = Table::new(["a", "b"]);
        let err = t.push_row(vec![Value::Null]).unwrap_err();
        assert!(matches!(err, TypesError::RowArity { .. }));
    }

    #[test]
    fn test_for_display_coerces_nan_only() {
        let shown = sample().for_display();
        assert_eq!(
            shown.get(1, "delivered_percentage").unwrap(),
            &Value::Number(0.0)
        );
        // true values untouched
        assert_eq!(shown.get(0, "total_sales").unwrap(), &Value::Number(100.0));
        // the source table still carries NaN
        let raw = sample();
        match raw.get(1, "delivered_percentage").unwrap() {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn test_with_totals_sums_and_averages() {
        let t = sample()
            .with_totals("row_type", &["total_sales"], &["delivered_percentage"])
            .unwrap();
        assert_eq!(t.len(), 3);
        let total = &t.rows()[2];
        let sales_idx = t.column_index("total_sales").unwrap();
        let pct_idx = t.column_index("delivered_percentage").unwrap();
        assert_eq!(total[sales_idx], Value::Number(140.0));
        // mean over non-NaN cells only
        assert_eq!(total[pct_idx], Value::Number(50.0));
        assert_eq!(*total.last().unwrap(), Value::Text(ROW_TYPE_TOTAL.into()));
    }

    #[test]
    fn test_totals_unknown_column_is_error() {
        assert!(sample().with_totals("row_type", &["nope"], &[]).is_err());
    }

    #[test]
    fn test_json_records_shape() {
        let json = sample().to_json_records();
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["vendor_name"], "A");
        assert_eq!(records[0]["total_sales"], 100.0);
        // NaN serializes as null at the JSON boundary
        assert!(records[1]["delivered_percentage"].is_null());
    }
}
