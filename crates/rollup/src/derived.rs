//! Derived metrics
//!
//! Computes values from already-aggregated measures: ratios, weighted
//! averages, and period-over-period percentage change. All derived
//! measures fill with NaN — a ratio whose denominator is zero or null is
//! undefined, not zero, and stays NaN until the display boundary.
//!
//! # The percentage-change formula
//!
//! Every dashboard page computes percentage change between the **two
//! periods before the current one**:
//!
//! ```text
//! pct[i] = (value[i-1] - value[i-2]) / value[i-2] * 100
//! ```
//!
//! not between the current and previous period, and consumers read it as
//! "momentum entering this period". The formula is load-bearing across
//! every trend card, so it is preserved here exactly and pinned by test.

use crate::aggregate::{AggregatedSeries, DimensionKey};
use crate::bucket::Bucket;
use crate::error::{AggregationError, Result};
use crate::reindex::FillPolicy;
use kpi_types::Value;

/// Measure name added by [`percentage_change`] for the prior period
pub const PREVIOUS: &str = "previous";
/// Measure name added by [`percentage_change`] for the period before that
pub const PREVIOUS_2: &str = "previous_2";
/// Measure name added by [`percentage_change`] for the change itself
pub const PERCENTAGE_CHANGE: &str = "percentage_change";

fn require_measure(series: &AggregatedSeries, name: &str) -> Result<()> {
    if series.measures().iter().any(|m| m == name) {
        Ok(())
    } else {
        Err(AggregationError::UnknownMeasure {
            name: name.to_string(),
        }
        .into())
    }
}

fn cell(series: &AggregatedSeries, bucket: &Bucket, key: &DimensionKey, measure: &str) -> f64 {
    series
        .value(bucket, key, measure)
        .and_then(Value::as_f64)
        .unwrap_or(f64::NAN)
}

/// Add `previous`, `previous_2` and `percentage_change` columns
///
/// Computed independently per dimension key over the bucket-ordered
/// series. A zero or missing `previous_2` yields NaN, never an error
/// and never zero.
pub fn percentage_change(series: &mut AggregatedSeries, metric: &str) -> Result<()> {
    require_measure(series, metric)?;

    let buckets = series.buckets();
    let keys = if series.dimensions().is_empty() {
        vec![DimensionKey::empty()]
    } else {
        series.observed_keys()
    };

    for key in &keys {
        let values: Vec<f64> = buckets
            .iter()
            .map(|b| cell(series, b, key, metric))
            .collect();
        for (i, bucket) in buckets.iter().enumerate() {
            let previous = if i >= 1 { values[i - 1] } else { f64::NAN };
            let previous_2 = if i >= 2 { values[i - 2] } else { f64::NAN };
            let pct = if previous_2 == 0.0 || previous_2.is_nan() {
                f64::NAN
            } else {
                (previous - previous_2) / previous_2 * 100.0
            };
            series.set_value(*bucket, key.clone(), PREVIOUS, Value::Number(previous));
            series.set_value(*bucket, key.clone(), PREVIOUS_2, Value::Number(previous_2));
            series.set_value(*bucket, key.clone(), PERCENTAGE_CHANGE, Value::Number(pct));
        }
    }

    series.add_measure(PREVIOUS, FillPolicy::Nan);
    series.add_measure(PREVIOUS_2, FillPolicy::Nan);
    series.add_measure(PERCENTAGE_CHANGE, FillPolicy::Nan);
    Ok(())
}

/// Add `name` as `numerator / denominator * 100` per group
///
/// NaN when the denominator is zero, null, or NaN. The result is not
/// clamped to [0, 100]: over-range percentages (capacity utilization
/// above nominal, returns exceeding deliveries) are real signals.
pub fn ratio(
    series: &mut AggregatedSeries,
    name: &str,
    numerator: &str,
    denominator: &str,
) -> Result<()> {
    require_measure(series, numerator)?;
    require_measure(series, denominator)?;

    let groups: Vec<(Bucket, DimensionKey)> =
        series.iter().map(|(k, _)| k.clone()).collect();
    for (bucket, key) in groups {
        let n = cell(series, &bucket, &key, numerator);
        let d = cell(series, &bucket, &key, denominator);
        let value = if d == 0.0 || d.is_nan() {
            f64::NAN
        } else {
            n / d * 100.0
        };
        series.set_value(bucket, key, name, Value::Number(value));
    }
    series.add_measure(name, FillPolicy::Nan);
    Ok(())
}

/// Add `name` as `sum_measure / count_measure` per group
///
/// This is the weighted form (total revenue over order count), never a
/// mean of per-row means. NaN when the count is zero.
pub fn weighted_average(
    series: &mut AggregatedSeries,
    name: &str,
    sum_measure: &str,
    count_measure: &str,
) -> Result<()> {
    require_measure(series, sum_measure)?;
    require_measure(series, count_measure)?;

    let groups: Vec<(Bucket, DimensionKey)> =
        series.iter().map(|(k, _)| k.clone()).collect();
    for (bucket, key) in groups {
        let total = cell(series, &bucket, &key, sum_measure);
        let count = cell(series, &bucket, &key, count_measure);
        let value = if count == 0.0 || count.is_nan() {
            f64::NAN
        } else {
            total / count
        };
        series.set_value(bucket, key, name, Value::Number(value));
    }
    series.add_measure(name, FillPolicy::Nan);
    Ok(())
}

/// Most recent completed-period comparison for a metric card
#[derive(Debug, Clone, PartialEq)]
pub struct LatestComparison {
    pub latest_bucket: Bucket,
    pub latest: f64,
    pub previous_bucket: Bucket,
    pub previous: f64,
    pub delta: f64,
}

/// Compare the last two buckets of a series for one dimension key
///
/// Returns `None` when fewer than two buckets exist; the caller renders
/// the "not enough history" state instead of a delta.
pub fn latest_comparison(
    series: &AggregatedSeries,
    metric: &str,
    key: &DimensionKey,
) -> Result<Option<LatestComparison>> {
    require_measure(series, metric)?;

    let buckets = series.buckets();
    if buckets.len() < 2 {
        return Ok(None);
    }
    let latest_bucket = buckets[buckets.len() - 1];
    let previous_bucket = buckets[buckets.len() - 2];
    let latest = cell(series, &latest_bucket, key, metric);
    let previous = cell(series, &previous_bucket, key, metric);
    Ok(Some(LatestComparison {
        latest_bucket,
        latest,
        previous_bucket,
        previous,
        delta: latest - previous,
    }))
}
