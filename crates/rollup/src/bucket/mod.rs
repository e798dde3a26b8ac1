//! Time buckets and bucket assignment
//!
//! This module defines the core period types used to group records for
//! time-series roll-ups:
//!
//! - [`Frequency`]: the four reporting granularities (daily, weekly,
//!   monthly, yearly)
//! - [`Bucket`]: one half-open period `[start, next_start)` with a
//!   presentation label
//! - [`BucketAssigner`]: truncates timestamps to their containing bucket
//!   and produces gap-free bucket sequences covering a date range

pub mod assigner;
pub mod types;

pub use assigner::BucketAssigner;
pub use types::{Bucket, Frequency};
