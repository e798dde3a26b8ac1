//! Dimension filtering
//!
//! Restricts a series to selected dimension values, the engine-side
//! counterpart of a sidebar multiselect. Selecting a value that never
//! occurs in the data is a user action, not a bug, so it produces an
//! empty result rather than an error; naming a dimension the series
//! does not carry is a programmer mistake and errors.

use crate::aggregate::AggregatedSeries;
use crate::error::{AggregationError, Result};
use kpi_types::Value;

/// Keep only groups whose `dimension` value is in `selected`
///
/// Matching uses exact value equality, null included. Applying the same
/// filter twice is a no-op; applying filters on different dimensions
/// intersects them regardless of order.
pub fn retain_dimension(
    series: &mut AggregatedSeries,
    dimension: &str,
    selected: &[Value],
) -> Result<()> {
    let Some(position) = series.dimensions().iter().position(|d| d == dimension) else {
        return Err(AggregationError::UnknownDimension {
            column: dimension.to_string(),
        }
        .into());
    };
    series.retain(|(_, key)| selected.contains(&key.values()[position]));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregationSpec, DimensionKey, Reducer};
    use crate::bucket::{Bucket, BucketAssigner, Frequency};
    use chrono::NaiveDate;
    use kpi_types::{Record, RecordSet};

    fn series() -> AggregatedSeries {
        let records = RecordSet::from_rows(vec![
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "A".into()),
                ("status", "delivered".into()),
                ("amt", Value::Number(100.0)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-01")),
                ("vendor_name", "B".into()),
                ("status", "pending".into()),
                ("amt", Value::Number(40.0)),
            ]),
            Record::from_pairs([
                ("created_at", Value::from("2024-01-02")),
                ("vendor_name", "A".into()),
                ("status", "pending".into()),
                ("amt", Value::Number(25.0)),
            ]),
        ]);
        let spec = AggregationSpec::new("created_at")
            .dimension("vendor_name")
            .dimension("status")
            .measure("total_sales", "amt", Reducer::Sum);
        aggregate(&records, &BucketAssigner::new(Frequency::Daily), &spec).unwrap()
    }

    fn bucket(day: u32) -> Bucket {
        Bucket::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            Frequency::Daily,
        )
    }

    #[test]
    fn test_retains_selected_values() {
        let mut s = series();
        retain_dimension(&mut s, "vendor_name", &["A".into()]).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s
            .get(&bucket(1), &DimensionKey(vec!["B".into(), "pending".into()]))
            .is_none());
    }

    #[test]
    fn test_filters_intersect_across_dimensions() {
        let mut s = series();
        retain_dimension(&mut s, "vendor_name", &["A".into()]).unwrap();
        retain_dimension(&mut s, "status", &["pending".into()]).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(
            s.value(
                &bucket(2),
                &DimensionKey(vec!["A".into(), "pending".into()]),
                "total_sales"
            ),
            Some(&Value::Number(25.0))
        );
    }

    #[test]
    fn test_unknown_value_yields_empty_not_error() {
        let mut s = series();
        retain_dimension(&mut s, "vendor_name", &["Z".into()]).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn test_unknown_dimension_errors() {
        let mut s = series();
        let err = retain_dimension(&mut s, "driver_name", &["A".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown dimension"));
    }

    #[test]
    fn test_idempotent() {
        let mut s = series();
        retain_dimension(&mut s, "vendor_name", &["A".into()]).unwrap();
        let once = s.clone();
        retain_dimension(&mut s, "vendor_name", &["A".into()]).unwrap();
        assert_eq!(s, once);
    }
}
