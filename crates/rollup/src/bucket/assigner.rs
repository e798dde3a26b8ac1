//! Bucket assignment
//!
//! Maps timestamps to their containing bucket and generates gap-free
//! bucket sequences for a requested date range.

use super::types::{Bucket, Frequency};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Assigns timestamps to buckets under one alignment policy
///
/// The canonical weekly policy is Monday-start (ISO). Delivery and
/// group-lifecycle pages historically report Wednesday-to-Tuesday weeks;
/// those call sites opt in explicitly via [`with_week_start`] instead of
/// inheriting the inconsistency silently.
///
/// [`with_week_start`]: BucketAssigner::with_week_start
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use rollup::bucket::{BucketAssigner, Frequency};
///
/// let assigner = BucketAssigner::new(Frequency::Weekly);
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap().and_hms_opt(9, 30, 0).unwrap();
/// let bucket = assigner.assign(ts).unwrap();
/// assert_eq!(bucket.start(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketAssigner {
    frequency: Frequency,
    week_start: Weekday,
    floor_date: Option<NaiveDate>,
}

impl BucketAssigner {
    /// Create an assigner with Monday-start weeks and no floor date
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            week_start: Weekday::Mon,
            floor_date: None,
        }
    }

    /// Override the weekday on which weekly buckets begin
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Exclude data before the given date
    ///
    /// Monthly roll-ups use this to drop records predating reliable
    /// bookkeeping; both assignment and range generation honor it.
    pub fn with_floor_date(mut self, floor_date: NaiveDate) -> Self {
        self.floor_date = Some(floor_date);
        self
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Truncate a date down to its containing bucket start
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self.frequency {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let days_since = (date.weekday().num_days_from_monday() + 7
                    - self.week_start.num_days_from_monday())
                    % 7;
                date - chrono::Duration::days(i64::from(days_since))
            }
            Frequency::Monthly => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("first of month")
            }
            Frequency::Yearly => {
                NaiveDate::from_ymd_opt(date.year(), 1, 1).expect("jan 1 is valid")
            }
        }
    }

    /// Assign a timestamp to its bucket
    ///
    /// Returns `None` for timestamps before the floor date; the caller
    /// drops such rows the same way it drops unparseable timestamps.
    pub fn assign(&self, timestamp: NaiveDateTime) -> Option<Bucket> {
        let date = timestamp.date();
        if let Some(floor) = self.floor_date {
            if date < floor {
                return None;
            }
        }
        Some(Bucket::new(self.truncate(date), self.frequency))
    }

    /// Gap-free, strictly increasing bucket sequence covering
    /// `[start_date, end_date]` inclusive
    ///
    /// The first bucket contains `start_date` (or the floor date, when
    /// the floor clips the range) and the last bucket contains
    /// `end_date`. An inverted range yields an empty sequence, not an
    /// error; callers render the empty-range state.
    pub fn boundaries(&self, start_date: NaiveDate, end_date: NaiveDate) -> Vec<Bucket> {
        if end_date < start_date {
            return Vec::new();
        }

        let mut effective_start = start_date;
        if let Some(floor) = self.floor_date {
            effective_start = effective_start.max(floor);
            if effective_start > end_date {
                return Vec::new();
            }
        }

        let mut buckets = Vec::new();
        let mut cursor = self.truncate(effective_start);
        while cursor <= end_date {
            let bucket = Bucket::new(cursor, self.frequency);
            cursor = bucket.next_start();
            buckets.push(bucket);
        }
        buckets
    }

    /// Whether a bucket is fully in the past as of `today`
    ///
    /// Weekly trend views clip to completed buckets so a half-elapsed
    /// week does not read as a collapse in the metric.
    pub fn is_complete(&self, bucket: &Bucket, today: NaiveDate) -> bool {
        bucket.next_start() <= today
    }

    /// Last day of the most recent completed bucket as of `today`
    pub fn last_completed_end(&self, today: NaiveDate) -> NaiveDate {
        self.truncate(today)
            .pred_opt()
            .expect("date underflow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ts(y: i32, m: u32, day: u32) -> NaiveDateTime {
        d(y, m, day).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_weekly_monday_truncation() {
        let assigner = BucketAssigner::new(Frequency::Weekly);
        // Thursday 2024-03-07 belongs to the week starting Monday 03-04
        assert_eq!(assigner.truncate(d(2024, 3, 7)), d(2024, 3, 4));
        // A Monday truncates to itself
        assert_eq!(assigner.truncate(d(2024, 3, 4)), d(2024, 3, 4));
    }

    #[test]
    fn test_weekly_wednesday_override() {
        let assigner =
            BucketAssigner::new(Frequency::Weekly).with_week_start(Weekday::Wed);
        // Tuesday 2024-03-05 belongs to the Wednesday-start week of 02-28
        assert_eq!(assigner.truncate(d(2024, 3, 5)), d(2024, 2, 28));
        // A Wednesday truncates to itself
        assert_eq!(assigner.truncate(d(2024, 3, 6)), d(2024, 3, 6));
        // Thursday falls into the week that just began
        assert_eq!(assigner.truncate(d(2024, 3, 7)), d(2024, 3, 6));
    }

    #[test]
    fn test_assign_respects_floor_date() {
        let assigner =
            BucketAssigner::new(Frequency::Monthly).with_floor_date(d(2023, 10, 1));
        assert!(assigner.assign(ts(2023, 9, 30)).is_none());
        let bucket = assigner.assign(ts(2023, 10, 15)).unwrap();
        assert_eq!(bucket.start(), d(2023, 10, 1));
    }

    #[test]
    fn test_daily_boundaries_inclusive() {
        let assigner = BucketAssigner::new(Frequency::Daily);
        let buckets = assigner.boundaries(d(2024, 1, 1), d(2024, 1, 3));
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].start(), d(2024, 1, 1));
        assert_eq!(buckets[2].start(), d(2024, 1, 3));
    }

    #[test]
    fn test_boundaries_cover_range_without_gaps() {
        for frequency in [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Yearly,
        ] {
            let assigner = BucketAssigner::new(frequency);
            let (start, end) = (d(2023, 11, 18), d(2024, 2, 3));
            let buckets = assigner.boundaries(start, end);
            assert!(buckets[0].contains(start), "{frequency}: first bucket misses start");
            assert!(
                buckets.last().unwrap().contains(end),
                "{frequency}: last bucket misses end"
            );
            for pair in buckets.windows(2) {
                assert_eq!(
                    pair[0].next_start(),
                    pair[1].start(),
                    "{frequency}: gap between buckets"
                );
            }
        }
    }

    #[test]
    fn test_inverted_range_yields_empty_sequence() {
        let assigner = BucketAssigner::new(Frequency::Daily);
        assert!(assigner.boundaries(d(2024, 1, 10), d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_floor_clips_boundaries() {
        let assigner =
            BucketAssigner::new(Frequency::Monthly).with_floor_date(d(2023, 10, 1));
        let buckets = assigner.boundaries(d(2023, 1, 1), d(2023, 12, 31));
        assert_eq!(buckets[0].start(), d(2023, 10, 1));
        assert_eq!(buckets.len(), 3);

        // Floor past the range end: nothing to report
        assert!(assigner.boundaries(d(2023, 1, 1), d(2023, 9, 1)).is_empty());
    }

    #[test]
    fn test_completed_week_clipping() {
        let assigner = BucketAssigner::new(Frequency::Weekly);
        // Thursday 2024-03-07: current week began Monday 03-04
        assert_eq!(assigner.last_completed_end(d(2024, 3, 7)), d(2024, 3, 3));

        let current = Bucket::new(d(2024, 3, 4), Frequency::Weekly);
        let previous = Bucket::new(d(2024, 2, 26), Frequency::Weekly);
        assert!(!assigner.is_complete(&current, d(2024, 3, 7)));
        assert!(assigner.is_complete(&previous, d(2024, 3, 7)));
    }
}
