//! Error taxonomy for the attendance engine.
//!
//! Lookup failures are propagated, never suppressed: the first failing
//! lookup aborts the whole aggregation and no partial report is returned.

use chrono::NaiveDate;
use thiserror::Error;

/// Boxed error coming out of a mark-lookup collaborator.
pub type LookupSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Typed engine errors.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Mark lookup failed for student {student_id} on {date}: {source}")]
    LookupFailure {
        student_id: String,
        date: NaiveDate,
        #[source]
        source: LookupSource,
    },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Unknown student: {0}")]
    UnknownStudent(String),

    #[error("Report request is missing {0}")]
    MissingTarget(&'static str),

    #[error("Invalid attendance status: {0}")]
    InvalidStatus(String),
}

impl AttendanceError {
    /// Wrap a collaborator error as a lookup failure for one student/day.
    pub fn lookup(
        student_id: impl Into<String>,
        date: NaiveDate,
        source: impl Into<LookupSource>,
    ) -> Self {
        Self::LookupFailure {
            student_id: student_id.into(),
            date,
            source: source.into(),
        }
    }

    /// True for errors caused by bad caller input rather than the mark store.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::LookupFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
