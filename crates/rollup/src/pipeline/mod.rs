//! End-to-end roll-up pipeline
//!
//! A [`RollupPipeline`] is one dashboard panel's computation, declared
//! once and executed against raw records: bucket and group (aggregate),
//! densify onto the requested range (reindex), append derived metrics,
//! apply dimension filters, and render the output table. The stages are
//! public on their own; the pipeline exists so pages stop re-implementing
//! the sequence with small, drifting differences.
//!
//! ```
//! use chrono::NaiveDate;
//! use rollup::{Frequency, Reducer, RollupConfig, RollupPipeline};
//!
//! let config = RollupConfig::daily(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
//! );
//! let pipeline = RollupPipeline::builder(config, "created_at")
//!     .dimension("vendor_name")
//!     .measure("total_sales", "sales", Reducer::Sum)
//!     .measure("order_count", "order_id", Reducer::Count)
//!     .weighted_average("average_order_value", "total_sales", "order_count")
//!     .build()
//!     .unwrap();
//! # let _ = pipeline;
//! ```

pub mod source;

pub use source::{DataSource, PooledSource, QuerySpec};

use crate::aggregate::{aggregate, AggregatedSeries, AggregationSpec, DimensionKey, Reducer};
use crate::config::RollupConfig;
use crate::derived;
use crate::error::{PipelineError, Result};
use crate::filter::retain_dimension;
use crate::reindex::reindex;
use kpi_types::{RecordSet, Table, Value};
use tracing::debug;

/// One derived-metric stage, applied in declaration order
#[derive(Debug, Clone)]
enum DerivedStep {
    Ratio {
        name: String,
        numerator: String,
        denominator: String,
    },
    WeightedAverage {
        name: String,
        sum_measure: String,
        count_measure: String,
    },
    PercentageChange {
        metric: String,
    },
}

impl DerivedStep {
    fn name(&self) -> &str {
        match self {
            DerivedStep::Ratio { name, .. } => name,
            DerivedStep::WeightedAverage { name, .. } => name,
            DerivedStep::PercentageChange { .. } => derived::PERCENTAGE_CHANGE,
        }
    }

    fn inputs(&self) -> Vec<&str> {
        match self {
            DerivedStep::Ratio {
                numerator,
                denominator,
                ..
            } => vec![numerator, denominator],
            DerivedStep::WeightedAverage {
                sum_measure,
                count_measure,
                ..
            } => vec![sum_measure, count_measure],
            DerivedStep::PercentageChange { metric } => vec![metric],
        }
    }

    fn outputs(&self) -> Vec<&str> {
        match self {
            DerivedStep::Ratio { name, .. } => vec![name],
            DerivedStep::WeightedAverage { name, .. } => vec![name],
            DerivedStep::PercentageChange { .. } => vec![
                derived::PREVIOUS,
                derived::PREVIOUS_2,
                derived::PERCENTAGE_CHANGE,
            ],
        }
    }
}

/// A validated, reusable roll-up declaration
#[derive(Debug, Clone)]
pub struct RollupPipeline {
    config: RollupConfig,
    spec: AggregationSpec,
    universe: Option<Vec<DimensionKey>>,
    derived: Vec<DerivedStep>,
    filters: Vec<(String, Vec<Value>)>,
}

impl RollupPipeline {
    /// Start declaring a pipeline bucketed per `config`, reading
    /// timestamps from `timestamp_column`
    pub fn builder(config: RollupConfig, timestamp_column: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder {
            config,
            spec: AggregationSpec::new(timestamp_column),
            universe: None,
            derived: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Execute every stage against already-fetched records
    pub fn run(&self, records: &RecordSet) -> Result<Table> {
        let series = self.run_to_series(records)?;
        Ok(series.to_table()?)
    }

    /// Execute the stages but stop before table rendering
    ///
    /// Used when the caller merges several pipelines' series before
    /// rendering, or reads cells directly for metric cards.
    pub fn run_to_series(&self, records: &RecordSet) -> Result<AggregatedSeries> {
        let sparse = aggregate(records, &self.config.assigner(), &self.spec)?;
        debug!(groups = sparse.len(), "aggregation complete");

        let buckets = self.config.boundaries();
        let mut series = reindex(&sparse, &buckets, self.universe.as_deref());

        for step in &self.derived {
            match step {
                DerivedStep::Ratio {
                    name,
                    numerator,
                    denominator,
                } => derived::ratio(&mut series, name, numerator, denominator)?,
                DerivedStep::WeightedAverage {
                    name,
                    sum_measure,
                    count_measure,
                } => derived::weighted_average(&mut series, name, sum_measure, count_measure)?,
                DerivedStep::PercentageChange { metric } => {
                    derived::percentage_change(&mut series, metric)?
                }
            }
        }

        for (dimension, selected) in &self.filters {
            retain_dimension(&mut series, dimension, selected)?;
        }
        Ok(series)
    }

    /// Fetch from a source, then run
    ///
    /// The query range is the configured range; source failures wrap
    /// without interpretation.
    pub async fn fetch_and_run<S: DataSource + ?Sized>(
        &self,
        source: &S,
        dataset: &str,
    ) -> Result<Table> {
        let query = QuerySpec::new(
            dataset,
            self.spec.timestamp_column(),
            self.config.start_date,
            self.config.end_date,
        );
        let records = source
            .fetch(&query)
            .await
            .map_err(|source| PipelineError::Source { source })?;
        self.run(&records)
    }
}

/// Fluent construction for [`RollupPipeline`]
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: RollupConfig,
    spec: AggregationSpec,
    universe: Option<Vec<DimensionKey>>,
    derived: Vec<DerivedStep>,
    filters: Vec<(String, Vec<Value>)>,
}

impl PipelineBuilder {
    /// Add a grouping dimension column
    pub fn dimension(mut self, column: impl Into<String>) -> Self {
        self.spec = self.spec.dimension(column);
        self
    }

    /// Add an aggregated measure
    pub fn measure(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        reducer: Reducer,
    ) -> Self {
        self.spec = self.spec.measure(name, column, reducer);
        self
    }

    /// Declare the full dimension universe for gap filling
    ///
    /// Without this, only keys observed in the data are densified.
    pub fn universe(mut self, keys: Vec<DimensionKey>) -> Self {
        self.universe = Some(keys);
        self
    }

    /// Append `numerator / denominator * 100` as a derived measure
    pub fn ratio(
        mut self,
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        self.derived.push(DerivedStep::Ratio {
            name: name.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
        });
        self
    }

    /// Append `sum_measure / count_measure` as a derived measure
    pub fn weighted_average(
        mut self,
        name: impl Into<String>,
        sum_measure: impl Into<String>,
        count_measure: impl Into<String>,
    ) -> Self {
        self.derived.push(DerivedStep::WeightedAverage {
            name: name.into(),
            sum_measure: sum_measure.into(),
            count_measure: count_measure.into(),
        });
        self
    }

    /// Append the period-over-period change columns for `metric`
    pub fn percentage_change(mut self, metric: impl Into<String>) -> Self {
        self.derived.push(DerivedStep::PercentageChange {
            metric: metric.into(),
        });
        self
    }

    /// Keep only rows whose `dimension` value is in `selected`
    pub fn filter(mut self, dimension: impl Into<String>, selected: Vec<Value>) -> Self {
        self.filters.push((dimension.into(), selected));
        self
    }

    /// Validate the declaration
    ///
    /// Catches the mistakes that would otherwise surface mid-run: an
    /// empty or duplicated measure list, a derived metric reading a
    /// measure nothing produces, a filter on an undeclared dimension.
    pub fn build(self) -> Result<RollupPipeline> {
        self.spec.validate()?;

        let mut available: Vec<String> = self.spec.measure_names();
        for step in &self.derived {
            for input in step.inputs() {
                if !available.iter().any(|m| m == input) {
                    return Err(PipelineError::UnknownDerivedInput {
                        name: step.name().to_string(),
                        measure: input.to_string(),
                    }
                    .into());
                }
            }
            available.extend(step.outputs().iter().map(|s| s.to_string()));
        }

        for (dimension, _) in &self.filters {
            if !self.spec.dimensions().iter().any(|d| d == dimension) {
                return Err(crate::error::AggregationError::UnknownDimension {
                    column: dimension.clone(),
                }
                .into());
            }
        }

        Ok(RollupPipeline {
            config: self.config,
            spec: self.spec,
            universe: self.universe,
            derived: self.derived,
            filters: self.filters,
        })
    }
}
