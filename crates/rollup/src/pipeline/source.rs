//! Data source abstraction
//!
//! The engine never talks to a database itself; a [`DataSource`] hands
//! it records for a query, and [`PooledSource`] bounds how many fetches
//! run concurrently. The bound exists because dashboard pages fan out
//! several queries at once and the operational database tolerates only
//! a small number of simultaneous readers.

use async_trait::async_trait;
use chrono::NaiveDate;
use kpi_types::RecordSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// One fetch request: a dataset name and an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Logical dataset name (`orders`, `deliveries`, ...)
    pub dataset: String,

    /// Column the range filter applies to
    pub timestamp_column: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl QuerySpec {
    pub fn new(
        dataset: impl Into<String>,
        timestamp_column: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            timestamp_column: timestamp_column.into(),
            start_date,
            end_date,
        }
    }
}

/// Supplies raw records for a query
///
/// Implementations wrap whatever actually holds the data: the
/// operational database, a fixture file in tests. Failures surface as
/// `anyhow::Error`; the pipeline wraps them without inspecting them.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, query: &QuerySpec) -> anyhow::Result<RecordSet>;
}

/// Wraps a source with a concurrency bound
///
/// Holds a semaphore permit for the duration of the fetch only; the
/// aggregation that follows runs outside the permit, so slow reductions
/// never starve other queries of connections.
pub struct PooledSource<S> {
    inner: S,
    permits: Arc<Semaphore>,
}

impl<S: DataSource> PooledSource<S> {
    /// Bound concurrent fetches against `inner` to `max_concurrent`
    pub fn new(inner: S, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }
}

#[async_trait]
impl<S: DataSource> DataSource for PooledSource<S> {
    async fn fetch(&self, query: &QuerySpec) -> anyhow::Result<RecordSet> {
        let permit = self.permits.acquire().await?;
        debug!(dataset = %query.dataset, "fetch permit acquired");
        let records = self.inner.fetch(query).await;
        drop(permit);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpi_types::Record;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn fetch(&self, _query: &QuerySpec) -> anyhow::Result<RecordSet> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(RecordSet::from_rows(vec![Record::from_pairs([(
                "order_id",
                kpi_types::Value::Integer(1),
            )])]))
        }
    }

    #[tokio::test]
    async fn test_pooled_source_bounds_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(PooledSource::new(
            CountingSource {
                active: active.clone(),
                peak: peak.clone(),
            },
            2,
        ));

        let query = QuerySpec::new(
            "orders",
            "created_at",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        );
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = source.clone();
                let query = query.clone();
                tokio::spawn(async move { source.fetch(&query).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
