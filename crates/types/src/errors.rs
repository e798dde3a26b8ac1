//! Error types for the shared data model

use thiserror::Error;

/// Errors raised by the data model types
///
/// These indicate programmer mistakes (asking for a column that was never
/// declared, pushing a row of the wrong width). Data-shape anomalies in
/// the inputs themselves are represented as `Null` values or empty sets,
/// not as errors.
#[derive(Error, Debug)]
pub enum TypesError {
    /// A column referenced by name does not exist
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    /// A row has a different arity than the table's column list
    #[error("row arity mismatch: table has {expected} columns, row has {actual}")]
    RowArity { expected: usize, actual: usize },
}

/// Result type alias for data model operations
pub type Result<T> = std::result::Result<T, TypesError>;
