//! Aggregation declarations
//!
//! One [`AggregationSpec`] replaces the dashboard's historical pile of
//! near-identical page-specific aggregation functions: a page now
//! declares which timestamp column buckets the rows, which dimension
//! columns group them, and which (measure, reducer) pairs to compute.

use super::reducer::Reducer;
use crate::error::AggregationError;
use serde::{Deserialize, Serialize};

/// One output measure: a name, a source column, and a reducer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// Output column name (`total_sales`, `order_count`, ...)
    pub name: String,
    /// Input column the reducer reads
    pub column: String,
    /// Collapse applied per group
    pub reducer: Reducer,
}

/// Declaration of one aggregation call
///
/// Immutable for the duration of the call. Construction is fluent:
///
/// ```
/// use rollup::aggregate::{AggregationSpec, Reducer};
///
/// let spec = AggregationSpec::new("created_at")
///     .dimension("vendor_name")
///     .measure("total_sales", "sales", Reducer::Sum)
///     .measure("order_count", "order_id", Reducer::Count);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    timestamp_column: String,
    dimensions: Vec<String>,
    measures: Vec<MeasureSpec>,
}

impl AggregationSpec {
    /// Start a spec bucketing rows on the given timestamp column
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
            dimensions: Vec::new(),
            measures: Vec::new(),
        }
    }

    /// Add a grouping dimension column
    pub fn dimension(mut self, column: impl Into<String>) -> Self {
        self.dimensions.push(column.into());
        self
    }

    /// Add an output measure
    pub fn measure(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        reducer: Reducer,
    ) -> Self {
        self.measures.push(MeasureSpec {
            name: name.into(),
            column: column.into(),
            reducer,
        });
        self
    }

    /// Check the declaration for programmer errors
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.measures.is_empty() {
            return Err(AggregationError::NoMeasures);
        }
        for (i, measure) in self.measures.iter().enumerate() {
            if self.measures[..i].iter().any(|m| m.name == measure.name) {
                return Err(AggregationError::DuplicateMeasure {
                    name: measure.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[MeasureSpec] {
        &self.measures
    }

    /// Output measure names, in declaration order
    pub fn measure_names(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.name.clone()).collect()
    }
}
