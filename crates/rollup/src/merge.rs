//! Multi-series merging
//!
//! Full outer join of aggregated series on (bucket, dimension key),
//! used wherever a page combines measures that come from different
//! queries: order totals joined with delivery counts, sales joined with
//! refunds. An outer join, because a bucket present in one series and
//! absent from another is the normal case, not an error — the absent
//! side fills per its own measure fill policies.
//!
//! A series whose dimensions are a *prefix* of the declared join
//! dimensions broadcasts: per-vendor totals merged with overall daily
//! capacity repeat the capacity value across every vendor in that
//! bucket.

use crate::aggregate::{AggregatedSeries, DimensionKey};
use crate::bucket::Bucket;
use crate::error::MergeError;
use crate::reindex::FillPolicy;
use kpi_types::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Outer-join series into one carrying the union of their measures
///
/// The join key is `(bucket, join_dimensions)`, declared by the caller
/// per merge rather than inferred from whichever series happens to be
/// widest. Requirements checked up front: at least one series, one
/// shared frequency, globally unique measure names, and every series'
/// dimension list a prefix of `join_dimensions`. Groups contributed
/// only by a narrower series pad their missing trailing dimensions
/// with null.
pub fn merge(
    series: &[AggregatedSeries],
    join_dimensions: &[String],
) -> Result<AggregatedSeries, MergeError> {
    let first = series.first().ok_or(MergeError::NoSeries)?;
    let frequency = first.frequency();
    if series.iter().any(|s| s.frequency() != frequency) {
        return Err(MergeError::FrequencyMismatch);
    }

    let dimensions: Vec<String> = join_dimensions.to_vec();
    for s in series {
        if s.dimensions().len() > dimensions.len()
            || s.dimensions() != &dimensions[..s.dimensions().len()]
        {
            return Err(MergeError::MismatchedJoinKeys {
                series: s.name().to_string(),
                expected: dimensions.clone(),
            });
        }
    }

    let mut measures: Vec<String> = Vec::new();
    let mut fills: BTreeMap<String, FillPolicy> = BTreeMap::new();
    for s in series {
        for m in s.measures() {
            if measures.iter().any(|existing| existing == m) {
                return Err(MergeError::DuplicateMeasure { name: m.clone() });
            }
            measures.push(m.clone());
            fills.insert(m.clone(), s.fill_policy(m));
        }
    }

    // union of output groups: wide keys as-is, narrow keys only where no
    // wide key shares their prefix (otherwise they broadcast onto it)
    let mut keys: BTreeSet<(Bucket, DimensionKey)> = BTreeSet::new();
    for s in series {
        for ((bucket, key), _) in s.iter() {
            if key.values().len() == dimensions.len() {
                keys.insert((*bucket, key.clone()));
            }
        }
    }
    for s in series {
        for ((bucket, key), _) in s.iter() {
            if key.values().len() == dimensions.len() {
                continue;
            }
            let broadcasts = keys.iter().any(|(b, full)| {
                b == bucket && &full.values()[..key.values().len()] == key.values()
            });
            if !broadcasts {
                let mut padded = key.values().to_vec();
                padded.resize(dimensions.len(), Value::Null);
                keys.insert((*bucket, DimensionKey(padded)));
            }
        }
    }

    let mut merged = AggregatedSeries::new(frequency, dimensions.clone(), measures, fills)
        .with_name("merged");
    for (bucket, key) in keys {
        let mut cells: BTreeMap<String, Value> = BTreeMap::new();
        for s in series {
            let lookup = DimensionKey(key.values()[..s.dimensions().len()].to_vec());
            match s.get(&bucket, &lookup) {
                Some(group) => {
                    for m in s.measures() {
                        cells.insert(
                            m.clone(),
                            group.get(m).cloned().unwrap_or(Value::Null),
                        );
                    }
                }
                None => {
                    for m in s.measures() {
                        cells.insert(m.clone(), s.fill_policy(m).fill_value());
                    }
                }
            }
        }
        merged.insert(bucket, key, cells);
    }
    Ok(merged)
}
