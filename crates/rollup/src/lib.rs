//! Time-bucketed roll-up engine for the KPI dashboard
//!
//! This crate turns raw operational records (orders, deliveries, group
//! purchases) into dense, bucketed KPI tables: assignment of timestamps
//! to reporting periods, grouped aggregation, gap filling, derived
//! metrics, multi-series merging, and dimension filtering.

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod derived;
pub mod error;
pub mod filter;
pub mod merge;
pub mod pipeline;
pub mod reindex;

// Re-export commonly used types
pub use aggregate::{
    aggregate, Accumulator, AggregatedSeries, AggregationSpec, DimensionKey, MeasureSpec,
    Reducer,
};

pub use bucket::{Bucket, BucketAssigner, Frequency};

pub use config::RollupConfig;

pub use derived::{
    latest_comparison, percentage_change, ratio, weighted_average, LatestComparison,
};

pub use error::{
    AggregationError, MergeError, PipelineError, Result, RollupError,
};

pub use filter::retain_dimension;

pub use merge::merge;

pub use pipeline::{
    DataSource, PipelineBuilder, PooledSource, QuerySpec, RollupPipeline,
};

pub use reindex::{reindex, FillPolicy};
