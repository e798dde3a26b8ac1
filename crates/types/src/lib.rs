//! Core data model for the KPI roll-up engine
//!
//! This crate provides the tabular types that flow through every stage of
//! the reporting pipeline:
//!
//! - [`Value`]: a single cell (text, number, timestamp, or null)
//! - [`Record`] / [`RecordSet`]: input rows as returned by the query
//!   collaborator, keyed by column name
//! - [`Table`]: the output boundary handed to the presentation layer
//!
//! Input schemas vary per call site, so records are dynamically typed;
//! the engine coerces and validates at the point of use.

pub mod errors;
pub mod record;
pub mod table;

pub use errors::{Result, TypesError};
pub use record::{Record, RecordSet, Value};
pub use table::Table;
