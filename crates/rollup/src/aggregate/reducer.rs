//! Reducers and their accumulators
//!
//! A [`Reducer`] names the collapse applied to one measure within a
//! (bucket, dimension) group. Reducers are declared per call site in an
//! [`crate::AggregationSpec`], so accumulation is driven by data rather
//! than by a generic parameter: each reducer owns an incremental
//! [`Accumulator`] that is fed cell values and finalized once per group.
//!
//! Empty-group semantics are part of the contract: sums and counts
//! finalize to zero, means and standard deviations to NaN, `First` to
//! null. Rate-like measures therefore stay distinguishable from true
//! zeros until the display boundary.

use kpi_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A reduction applied to one measure within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    /// Sum of numeric cells; empty group sums to 0
    Sum,
    /// Mean of numeric cells; empty group is NaN
    Mean,
    /// Number of rows in the group, regardless of cell nullness
    Count,
    /// Number of distinct non-null values in the named column
    CountDistinct { column: String },
    /// Sample standard deviation (n-1); fewer than two values is NaN
    StdDev,
    /// First non-null cell in row order
    First,
}

impl Reducer {
    /// Create a fresh accumulator for this reducer
    pub fn accumulator(&self) -> Accumulator {
        match self {
            Reducer::Sum => Accumulator::Sum { sum: 0.0 },
            Reducer::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            Reducer::Count => Accumulator::Count { count: 0 },
            Reducer::CountDistinct { .. } => Accumulator::CountDistinct {
                seen: BTreeSet::new(),
            },
            Reducer::StdDev => Accumulator::StdDev {
                count: 0,
                mean: 0.0,
                m2: 0.0,
            },
            Reducer::First => Accumulator::First { value: None },
        }
    }

    /// Column the accumulator reads, given the measure's source column
    ///
    /// `CountDistinct` reads its own distinct-on column (e.g. distinct
    /// `user_id` per bucket); every other reducer reads the measure
    /// column itself.
    pub fn input_column<'a>(&'a self, measure_column: &'a str) -> &'a str {
        match self {
            Reducer::CountDistinct { column } => column,
            _ => measure_column,
        }
    }
}

/// Incremental accumulator state for one (group, measure) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    Sum { sum: f64 },
    Mean { sum: f64, count: u64 },
    Count { count: u64 },
    CountDistinct { seen: BTreeSet<Value> },
    StdDev { count: u64, mean: f64, m2: f64 },
    First { value: Option<Value> },
}

impl Accumulator {
    /// Feed one cell value
    ///
    /// Numeric reducers skip cells that do not coerce to a number, the
    /// way the source treated nulls: they are absent from the sum, not
    /// zero. `Count` counts the row unconditionally.
    pub fn update(&mut self, value: &Value) {
        match self {
            Accumulator::Sum { sum } => {
                if let Some(n) = numeric(value) {
                    *sum += n;
                }
            }
            Accumulator::Mean { sum, count } => {
                if let Some(n) = numeric(value) {
                    *sum += n;
                    *count += 1;
                }
            }
            Accumulator::Count { count } => {
                *count += 1;
            }
            Accumulator::CountDistinct { seen } => {
                if !value.is_null() {
                    seen.insert(value.clone());
                }
            }
            Accumulator::StdDev { count, mean, m2 } => {
                if let Some(x) = numeric(value) {
                    // Welford's online algorithm
                    *count += 1;
                    let delta = x - *mean;
                    *mean += delta / *count as f64;
                    let delta2 = x - *mean;
                    *m2 += delta * delta2;
                }
            }
            Accumulator::First { value: slot } => {
                if slot.is_none() && !value.is_null() {
                    *slot = Some(value.clone());
                }
            }
        }
    }

    /// Collapse to the group's final cell value
    pub fn finalize(&self) -> Value {
        match self {
            Accumulator::Sum { sum } => Value::Number(*sum),
            Accumulator::Mean { sum, count } => {
                if *count == 0 {
                    Value::Number(f64::NAN)
                } else {
                    Value::Number(*sum / *count as f64)
                }
            }
            Accumulator::Count { count } => Value::Number(*count as f64),
            Accumulator::CountDistinct { seen } => Value::Number(seen.len() as f64),
            Accumulator::StdDev { count, m2, .. } => {
                if *count < 2 {
                    Value::Number(f64::NAN)
                } else {
                    Value::Number((*m2 / (*count - 1) as f64).sqrt())
                }
            }
            Accumulator::First { value } => value.clone().unwrap_or(Value::Null),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| !n.is_nan())
}
