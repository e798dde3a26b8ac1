//! Per-request roll-up settings
//!
//! A [`RollupConfig`] is the serializable form of one roll-up request:
//! the bucket frequency, the inclusive date range, and the alignment
//! overrides. It deserializes from the same YAML/JSON shapes the host
//! configuration uses, so saved report definitions carry their bucketing
//! with them.

use crate::bucket::{Bucket, BucketAssigner, Frequency};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Bucketing and range settings for one roll-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Bucket frequency
    pub frequency: Frequency,

    /// First day of the requested range, inclusive
    pub start_date: NaiveDate,

    /// Last day of the requested range, inclusive
    pub end_date: NaiveDate,

    /// Weekday on which weekly buckets begin
    #[serde(default = "default_week_start", with = "weekday_serde")]
    pub week_start: Weekday,

    /// Earliest date admitted; rows and buckets before it are dropped
    #[serde(default)]
    pub floor_date: Option<NaiveDate>,
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

impl RollupConfig {
    /// Daily roll-up over an inclusive range, the most common request
    pub fn daily(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self::new(Frequency::Daily, start_date, end_date)
    }

    pub fn new(frequency: Frequency, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            frequency,
            start_date,
            end_date,
            week_start: Weekday::Mon,
            floor_date: None,
        }
    }

    /// Override the weekly alignment
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Exclude data before the given date
    pub fn with_floor_date(mut self, floor_date: NaiveDate) -> Self {
        self.floor_date = Some(floor_date);
        self
    }

    /// The assigner this configuration describes
    pub fn assigner(&self) -> BucketAssigner {
        let mut assigner =
            BucketAssigner::new(self.frequency).with_week_start(self.week_start);
        if let Some(floor) = self.floor_date {
            assigner = assigner.with_floor_date(floor);
        }
        assigner
    }

    /// Gap-free bucket sequence covering the configured range
    pub fn boundaries(&self) -> Vec<Bucket> {
        self.assigner().boundaries(self.start_date, self.end_date)
    }
}

mod weekday_serde {
    use chrono::Weekday;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(day: &Weekday, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&day.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Weekday, D::Error> {
        let s = String::deserialize(de)?;
        Weekday::from_str(&s).map_err(|_| D::Error::custom(format!("invalid weekday: {s}")))
    }
}
