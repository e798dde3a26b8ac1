//! Gap filling / reindexing
//!
//! Left-joins a sparse aggregated series against the full bucket
//! sequence (optionally crossed with a fixed dimension universe) so the
//! presentation layer always sees a complete grid: a vendor with no
//! sales on a Tuesday gets an explicit zero row, not a missing one.
//!
//! Fill values are declared per measure, not guessed per call site:
//! counts and sums fill with zero, means, spreads and rate-like
//! measures fill with NaN. Filling a rate with zero is exactly the bug
//! that once produced misleading "0% delivered" rows for days with no
//! deliveries at all.

use crate::aggregate::{AggregatedSeries, DimensionKey, Reducer};
use crate::bucket::Bucket;
use kpi_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fill value applied to a measure cell absent from the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Absence means "nothing happened": fill 0
    Zero,
    /// Absence means "undefined": fill NaN, coerced only at display
    Nan,
    /// Absence stays null (non-numeric measures)
    Null,
}

impl FillPolicy {
    /// The policy a reducer's measures fill with
    pub fn for_reducer(reducer: &Reducer) -> Self {
        match reducer {
            Reducer::Sum | Reducer::Count | Reducer::CountDistinct { .. } => FillPolicy::Zero,
            Reducer::Mean | Reducer::StdDev => FillPolicy::Nan,
            Reducer::First => FillPolicy::Null,
        }
    }

    /// The cell written for a missing value
    pub fn fill_value(&self) -> Value {
        match self {
            FillPolicy::Zero => Value::Number(0.0),
            FillPolicy::Nan => Value::Number(f64::NAN),
            FillPolicy::Null => Value::Null,
        }
    }
}

/// Reindex a sparse series onto `buckets × universe`
///
/// With `universe = Some(keys)` the output covers every declared key in
/// every bucket (e.g. all registered drivers, so an idle driver still
/// shows a zero row). With `universe = None` only the dimension keys
/// observed in the aggregate are expanded — but every bucket still
/// appears for each of them. A series with no dimensions expands to one
/// row per bucket either way.
///
/// The output contains exactly `buckets.len() × keys.len()` groups with
/// no duplicates; aggregated values win over fills.
pub fn reindex(
    series: &AggregatedSeries,
    buckets: &[Bucket],
    universe: Option<&[DimensionKey]>,
) -> AggregatedSeries {
    let keys: Vec<DimensionKey> = match universe {
        Some(keys) => keys.to_vec(),
        None => {
            if series.dimensions().is_empty() {
                vec![DimensionKey::empty()]
            } else {
                series.observed_keys()
            }
        }
    };

    let fills: BTreeMap<String, Value> = series
        .measures()
        .iter()
        .map(|m| (m.clone(), series.fill_policy(m).fill_value()))
        .collect();

    let mut dense = series.clone();
    dense.retain(|(bucket, _)| buckets.contains(bucket));
    // drop observed keys outside the declared universe
    dense.retain(|(_, key)| keys.contains(key));

    for bucket in buckets {
        for key in &keys {
            if dense.get(bucket, key).is_none() {
                dense.insert(*bucket, key.clone(), fills.clone());
            }
        }
    }
    dense
}
