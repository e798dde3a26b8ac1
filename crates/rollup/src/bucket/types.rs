//! Bucket and frequency types

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reporting granularity selected by the dashboard user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        };
        write!(f, "{s}")
    }
}

/// One reporting period: the half-open interval `[start, next_start)`
///
/// Buckets are totally ordered by start date. A requested range always
/// produces a contiguous bucket sequence regardless of whether source
/// data exists for every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bucket {
    start: NaiveDate,
    frequency: Frequency,
}

impl Bucket {
    pub fn new(start: NaiveDate, frequency: Frequency) -> Self {
        Self { start, frequency }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Start of the following bucket (this bucket's exclusive end)
    pub fn next_start(&self) -> NaiveDate {
        match self.frequency {
            Frequency::Daily => self.start.succ_opt().expect("date overflow"),
            Frequency::Weekly => self.start + chrono::Duration::days(7),
            Frequency::Monthly => {
                let (year, month) = if self.start.month() == 12 {
                    (self.start.year() + 1, 1)
                } else {
                    (self.start.year(), self.start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is valid")
            }
            Frequency::Yearly => {
                NaiveDate::from_ymd_opt(self.start.year() + 1, 1, 1).expect("jan 1 is valid")
            }
        }
    }

    /// Last day inside the bucket (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.next_start().pred_opt().expect("date underflow")
    }

    /// Whether a date falls within this bucket
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.next_start()
    }

    /// Presentation label, matching what the dashboard renders on axes:
    /// `Mar 06` daily, `Mar 06 to Mar 12` weekly, `March` monthly,
    /// `2024` yearly.
    pub fn label(&self) -> String {
        match self.frequency {
            Frequency::Daily => self.start.format("%b %d").to_string(),
            Frequency::Weekly => format!(
                "{} to {}",
                self.start.format("%b %d"),
                self.end().format("%b %d")
            ),
            Frequency::Monthly => self.start.format("%B").to_string(),
            Frequency::Yearly => self.start.format("%Y").to_string(),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_daily_bounds() {
        let b = Bucket::new(d(2024, 1, 2), Frequency::Daily);
        assert_eq!(b.next_start(), d(2024, 1, 3));
        assert!(b.contains(d(2024, 1, 2)));
        assert!(!b.contains(d(2024, 1, 3)));
        assert_eq!(b.label(), "Jan 02");
    }

    #[test]
    fn test_weekly_label_spans_six_days() {
        let b = Bucket::new(d(2024, 3, 6), Frequency::Weekly);
        assert_eq!(b.end(), d(2024, 3, 12));
        assert_eq!(b.label(), "Mar 06 to Mar 12");
    }

    #[test]
    fn test_monthly_handles_year_boundary() {
        let b = Bucket::new(d(2023, 12, 1), Frequency::Monthly);
        assert_eq!(b.next_start(), d(2024, 1, 1));
        assert_eq!(b.label(), "December");
        assert!(b.contains(d(2023, 12, 31)));
    }

    #[test]
    fn test_yearly_bounds() {
        let b = Bucket::new(d(2024, 1, 1), Frequency::Yearly);
        assert!(b.contains(d(2024, 12, 31)));
        assert!(!b.contains(d(2025, 1, 1)));
        assert_eq!(b.label(), "2024");
    }

    #[test]
    fn test_ordering_by_start() {
        let a = Bucket::new(d(2024, 1, 1), Frequency::Daily);
        let b = Bucket::new(d(2024, 1, 2), Frequency::Daily);
        assert!(a < b);
    }
}
