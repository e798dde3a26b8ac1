//! Grouped aggregation
//!
//! Groups input records by (bucket, dimension key) and applies the
//! declared reducers per measure, producing a sparse
//! [`AggregatedSeries`]: one entry per group that actually had data.
//! Gap-filling against the full bucket range is a separate stage
//! ([`crate::reindex`]), so this module never invents rows.
//!
//! Input anomalies follow the warn-and-continue policy: an empty record
//! set or a missing timestamp column yields an empty series, and rows
//! whose timestamp is null or unparseable are dropped with a logged
//! warning.

pub mod reducer;
pub mod spec;

pub use reducer::{Accumulator, Reducer};
pub use spec::{AggregationSpec, MeasureSpec};

use crate::bucket::{Bucket, BucketAssigner, Frequency};
use crate::error::AggregationError;
use crate::reindex::FillPolicy;
use kpi_types::{RecordSet, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// An ordered tuple of dimension values identifying one group
///
/// Two records belong to the same group iff their keys are equal under
/// exact value equality; null is its own class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct DimensionKey(pub Vec<Value>);

impl DimensionKey {
    /// The zero-dimension key used by pure time series
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl<V: Into<Value>> FromIterator<V> for DimensionKey {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// One bucketed, grouped, reduced series
///
/// Sparse after [`aggregate`] (at most one entry per observed group),
/// dense after [`crate::reindex::reindex`] (exactly one entry per
/// bucket × dimension combination). Carries its own measure order and
/// per-measure fill policies so downstream stages need no other context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSeries {
    name: String,
    frequency: Frequency,
    dimensions: Vec<String>,
    measures: Vec<String>,
    fills: BTreeMap<String, FillPolicy>,
    groups: BTreeMap<(Bucket, DimensionKey), BTreeMap<String, Value>>,
}

impl AggregatedSeries {
    /// Create an empty series with the given shape
    pub fn new(
        frequency: Frequency,
        dimensions: Vec<String>,
        measures: Vec<String>,
        fills: BTreeMap<String, FillPolicy>,
    ) -> Self {
        Self {
            name: "series".to_string(),
            frequency,
            dimensions,
            measures,
            fills,
            groups: BTreeMap::new(),
        }
    }

    /// Name the series (used in merge diagnostics)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Fill policy for a measure; measures added by derived stages
    /// default to NaN so an undefined cell never reads as zero.
    pub fn fill_policy(&self, measure: &str) -> FillPolicy {
        self.fills.get(measure).copied().unwrap_or(FillPolicy::Nan)
    }

    /// Insert or replace one group's measures
    pub fn insert(
        &mut self,
        bucket: Bucket,
        key: DimensionKey,
        values: BTreeMap<String, Value>,
    ) {
        self.groups.insert((bucket, key), values);
    }

    /// Measures for one group, if present
    pub fn get(&self, bucket: &Bucket, key: &DimensionKey) -> Option<&BTreeMap<String, Value>> {
        self.groups.get(&(*bucket, key.clone()))
    }

    /// One measure cell for one group
    pub fn value(&self, bucket: &Bucket, key: &DimensionKey, measure: &str) -> Option<&Value> {
        self.get(bucket, key).and_then(|m| m.get(measure))
    }

    /// Iterate groups in (bucket, dimension key) order
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&(Bucket, DimensionKey), &BTreeMap<String, Value>)> {
        self.groups.iter()
    }

    /// Keep only groups matching the predicate
    pub fn retain<F: FnMut(&(Bucket, DimensionKey)) -> bool>(&mut self, mut f: F) {
        self.groups.retain(|k, _| f(k));
    }

    /// Distinct dimension keys observed in the data, sorted
    pub fn observed_keys(&self) -> Vec<DimensionKey> {
        let mut keys: Vec<DimensionKey> =
            self.groups.keys().map(|(_, k)| k.clone()).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Distinct buckets present, sorted
    pub fn buckets(&self) -> Vec<Bucket> {
        let mut buckets: Vec<Bucket> = self.groups.keys().map(|(b, _)| *b).collect();
        buckets.sort();
        buckets.dedup();
        buckets
    }

    /// Write one measure cell, creating the group if needed
    pub fn set_value(
        &mut self,
        bucket: Bucket,
        key: DimensionKey,
        measure: &str,
        value: Value,
    ) {
        self.groups
            .entry((bucket, key))
            .or_default()
            .insert(measure.to_string(), value);
    }

    /// Register a measure appended by a derived stage
    pub(crate) fn add_measure(&mut self, name: &str, fill: FillPolicy) {
        if !self.measures.iter().any(|m| m == name) {
            self.measures.push(name.to_string());
        }
        self.fills.insert(name.to_string(), fill);
    }

    /// Render as an output table: period start and label, dimension
    /// columns, then measures in declaration order.
    pub fn to_table(&self) -> crate::error::Result<Table> {
        let mut columns: Vec<String> =
            vec!["period".to_string(), "period_label".to_string()];
        columns.extend(self.dimensions.iter().cloned());
        columns.extend(self.measures.iter().cloned());

        let mut table = Table::new(columns);
        for ((bucket, key), measures) in &self.groups {
            let mut row: Vec<Value> = Vec::with_capacity(table.columns().len());
            row.push(Value::from(bucket.start()));
            row.push(Value::Text(bucket.label()));
            row.extend(key.values().iter().cloned());
            for name in &self.measures {
                row.push(measures.get(name).cloned().unwrap_or(Value::Null));
            }
            table.push_row(row)?;
        }
        Ok(table)
    }
}

/// Group records by (bucket, dimension key) and reduce each measure
///
/// Records whose timestamp is missing, null, or unparseable are dropped
/// with a warning; records before the assigner's floor date are dropped
/// silently. An empty record set or one lacking the timestamp column
/// produces an empty series, never an error.
pub fn aggregate(
    records: &RecordSet,
    assigner: &BucketAssigner,
    spec: &AggregationSpec,
) -> Result<AggregatedSeries, AggregationError> {
    spec.validate()?;

    let fills = spec
        .measures()
        .iter()
        .map(|m| (m.name.clone(), FillPolicy::for_reducer(&m.reducer)))
        .collect();
    let mut series = AggregatedSeries::new(
        assigner.frequency(),
        spec.dimensions().to_vec(),
        spec.measure_names(),
        fills,
    );

    if records.is_empty() {
        warn!("empty record set received");
        return Ok(series);
    }
    if !records.has_column(spec.timestamp_column()) {
        warn!(
            column = spec.timestamp_column(),
            "timestamp column missing from record set"
        );
        return Ok(series);
    }

    let mut accumulators: BTreeMap<(Bucket, DimensionKey), Vec<Accumulator>> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in records.rows() {
        let Some(timestamp) = record.timestamp(spec.timestamp_column()) else {
            dropped += 1;
            continue;
        };
        let Some(bucket) = assigner.assign(timestamp) else {
            continue;
        };
        let key: DimensionKey = spec
            .dimensions()
            .iter()
            .map(|d| record.get(d).clone())
            .collect();

        let group = accumulators
            .entry((bucket, key))
            .or_insert_with(|| {
                spec.measures()
                    .iter()
                    .map(|m| m.reducer.accumulator())
                    .collect()
            });
        for (acc, measure) in group.iter_mut().zip(spec.measures()) {
            acc.update(record.get(measure.reducer.input_column(&measure.column)));
        }
    }

    if dropped > 0 {
        warn!(dropped, "rows dropped: missing or unparseable timestamp");
    }

    for ((bucket, key), group) in accumulators {
        let values = spec
            .measures()
            .iter()
            .zip(&group)
            .map(|(m, acc)| (m.name.clone(), acc.finalize()))
            .collect();
        series.insert(bucket, key, values);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_types::Record;

    fn orders() -> RecordSet {
        RecordSet::from_rows(vec![
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "A".into()),
                ("amt", Value::Number(100.0)),
                ("user_id", Value::Integer(1)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "A".into()),
                ("amt", Value::Number(50.0)),
                ("user_id", Value::Integer(1)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-02")),
                ("vendor_name", "B".into()),
                ("amt", Value::Number(30.0)),
                ("user_id", Value::Integer(2)),
            ]),
        ])
    }

    fn daily() -> BucketAssigner {
        BucketAssigner::new(Frequency::Daily)
    }

    fn spec() -> AggregationSpec {
        AggregationSpec::new("created_at")
            .dimension("vendor_name")
            .measure("total_sales", "amt", Reducer::Sum)
            .measure("order_count", "amt", Reducer::Count)
            .measure(
                "unique_buyers",
                "user_id",
                Reducer::CountDistinct {
                    column: "user_id".to_string(),
                },
            )
    }

    fn bucket(day: u32) -> Bucket {
        Bucket::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            Frequency::Daily,
        )
    }

    fn key(vendor: &str) -> DimensionKey {
        DimensionKey(vec![vendor.into()])
    }

    #[test]
    fn test_groups_by_bucket_and_dimension() {
        let series = aggregate(&orders(), &daily(), &spec()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.value(&bucket(1), &key("A"), "total_sales"),
            Some(&Value::Number(150.0))
        );
        assert_eq!(
            series.value(&bucket(1), &key("A"), "order_count"),
            Some(&Value::Number(2.0))
        );
        assert_eq!(
            series.value(&bucket(1), &key("A"), "unique_buyers"),
            Some(&Value::Number(1.0))
        );
        assert_eq!(
            series.value(&bucket(2), &key("B"), "total_sales"),
            Some(&Value::Number(30.0))
        );
    }

    #[test]
    fn test_empty_records_yield_empty_series() {
        let series = aggregate(&RecordSet::default(), &daily(), &spec()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_missing_timestamp_column_yields_empty_series() {
        let records = RecordSet::from_rows(vec![Record::from_pairs([(
            "amt",
            Value::Number(1.0),
        )])]);
        let series = aggregate(&records, &daily(), &spec()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_bad_timestamps_dropped_not_fatal() {
        let records = RecordSet::from_rows(vec![
            Record::from_pairs([
                ("created_at", Value::from("not a date")),
                ("vendor_name", "A".into()),
                ("amt", Value::Number(1.0)),
                ("user_id", Value::Integer(1)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "A".into()),
                ("amt", Value::Number(2.0)),
                ("user_id", Value::Integer(1)),
            ]),
        ]);
        let series = aggregate(&records, &daily(), &spec()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(
            series.value(&bucket(1), &key("A"), "total_sales"),
            Some(&Value::Number(2.0))
        );
    }

    #[test]
    fn test_null_dimension_is_its_own_group() {
        let records = RecordSet::from_rows(vec![
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", Value::Null),
                ("amt", Value::Number(5.0)),
                ("user_id", Value::Integer(1)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "A".into()),
                ("amt", Value::Number(7.0)),
                ("user_id", Value::Integer(1)),
            ]),
        ]);
        let series = aggregate(&records, &daily(), &spec()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.value(&bucket(1), &DimensionKey(vec![Value::Null]), "total_sales"),
            Some(&Value::Number(5.0))
        );
    }

    #[test]
    fn test_to_table_column_order() {
        let series = aggregate(&orders(), &daily(), &spec()).unwrap();
        let table = series.to_table().unwrap();
        assert_eq!(
            table.columns(),
            &[
                "period",
                "period_label",
                "vendor_name",
                "total_sales",
                "order_count",
                "unique_buyers"
            ]
        );
        assert_eq!(table.len(), 2);
    }
}
