//! Error types for the roll-up engine
//!
//! The propagation policy follows the dashboard's needs: data-shape
//! anomalies the engine can represent as values (empty input, undefined
//! ratios, filter values absent from the data) never error — they become
//! empty tables or NaN cells. Errors are reserved for programmer
//! mistakes: referencing a measure or dimension that was never declared,
//! merging series on keys they do not share.

use thiserror::Error;

/// Main roll-up engine error type
#[derive(Error, Debug)]
pub enum RollupError {
    /// Aggregation declaration errors
    #[error("aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Series merge errors
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// Pipeline assembly and execution errors
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Output table construction errors
    #[error("table error: {0}")]
    Table(#[from] kpi_types::TypesError),
}

/// Aggregation declaration errors
///
/// All of these are raised while validating an [`crate::AggregationSpec`]
/// or while looking up declared measures, before any data is touched.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A spec declared two measures with the same output name
    #[error("duplicate measure name: {name}")]
    DuplicateMeasure { name: String },

    /// A spec declared no measures at all
    #[error("aggregation spec declares no measures")]
    NoMeasures,

    /// A measure was referenced that the declaration does not carry
    #[error("unknown measure: {name}")]
    UnknownMeasure { name: String },

    /// A dimension column was referenced that the declaration does not carry
    #[error("unknown dimension column: {column}")]
    UnknownDimension { column: String },
}

/// Series merge errors
#[derive(Error, Debug)]
pub enum MergeError {
    /// A series does not carry the declared join dimensions as a prefix
    #[error("series '{series}' does not start with join dimensions {expected:?}")]
    MismatchedJoinKeys {
        series: String,
        expected: Vec<String>,
    },

    /// Two series carry a measure with the same name
    #[error("measure '{name}' appears in more than one merged series")]
    DuplicateMeasure { name: String },

    /// Series were bucketed at different frequencies
    #[error("cannot merge series bucketed at different frequencies")]
    FrequencyMismatch,

    /// Nothing to merge
    #[error("merge requires at least one series")]
    NoSeries,
}

/// Pipeline assembly and execution errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A derived metric references a measure the pipeline never produces
    #[error("derived metric '{name}' references unknown measure '{measure}'")]
    UnknownDerivedInput { name: String, measure: String },

    /// The injected data source failed
    #[error("data source error: {source}")]
    Source {
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias for roll-up operations
pub type Result<T> = std::result::Result<T, RollupError>;
