use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{AttendanceError, Result};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AttendanceError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Every date from `range.start` to `range.end` inclusive, ascending.
pub fn date_sequence(range: &DateRange) -> Result<Vec<NaiveDate>> {
    if range.start > range.end {
        return Err(AttendanceError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }

    Ok(range.start.iter_days().take_while(|d| *d <= range.end).collect())
}

/// Weekdays within the range. Weekends never count as school days.
pub fn school_days(range: &DateRange) -> Result<Vec<NaiveDate>> {
    Ok(date_sequence(range)?
        .into_iter()
        .filter(|d| !is_weekend(*d))
        .collect())
}

/// Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True when `date` lies strictly after the reference day.
pub fn is_future_relative_to(date: NaiveDate, reference: NaiveDate) -> bool {
    date > reference
}

/// Number of calendar days in the range, both endpoints included.
pub fn days_in_range(range: &DateRange) -> i64 {
    (range.end - range.start).num_days() + 1
}

/// `YYYY-MM` bucket key for a date.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}
