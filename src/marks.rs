//! Attendance marks and the lookup contract the aggregator reads through.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};
use crate::roster::Student;

/// Outcome recorded for one student on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    #[default]
    Unmarked,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Unmarked => "unmarked",
        }
    }

    /// Present and late both count as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }

    /// Unmarked days carry no data and stay out of the rate denominator.
    pub fn is_marked(&self) -> bool {
        !matches!(self, AttendanceStatus::Unmarked)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(AttendanceStatus::Present),
            "absent" | "a" => Ok(AttendanceStatus::Absent),
            "late" | "l" => Ok(AttendanceStatus::Late),
            "unmarked" | "" => Ok(AttendanceStatus::Unmarked),
            _ => Err(AttendanceError::InvalidStatus(s.to_string())),
        }
    }
}

/// A single attendance record for one student on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceMark {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<NaiveTime>,
    pub note: Option<String>,
}

impl AttendanceMark {
    pub fn new(student_id: impl Into<String>, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            student_id: student_id.into(),
            date,
            status,
            time_in: None,
            note: None,
        }
    }

    pub fn with_time_in(mut self, time_in: NaiveTime) -> Self {
        self.time_in = Some(time_in);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Read contract between the engine and whatever stores marks.
///
/// `Ok(None)` means no mark exists, which is equivalent to `unmarked`.
pub trait MarkLookup {
    fn lookup(&self, student_id: &str, date: NaiveDate) -> Result<Option<AttendanceMark>>;
}

/// Write contract used by the layer that records attendance.
pub trait MarkStore: MarkLookup {
    /// Insert or overwrite the mark for `(student_id, date)`.
    fn record(&mut self, mark: AttendanceMark);

    /// Remove the mark for `(student_id, date)`, returning it if present.
    fn clear(&mut self, student_id: &str, date: NaiveDate) -> Option<AttendanceMark>;
}

/// Marks held in memory, keyed by `(student_id, date)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarkStore {
    marks: HashMap<(String, NaiveDate), AttendanceMark>,
}

impl InMemoryMarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Record the same status for every listed student on one day.
    pub fn mark_all(&mut self, students: &[Student], date: NaiveDate, status: AttendanceStatus) {
        for student in students {
            self.record(AttendanceMark::new(student.id.clone(), date, status));
        }
    }

    /// All marks, sorted by student then date.
    pub fn marks(&self) -> Vec<&AttendanceMark> {
        let mut marks: Vec<_> = self.marks.values().collect();
        marks.sort_by(|a, b| (&a.student_id, a.date).cmp(&(&b.student_id, b.date)));
        marks
    }
}

impl MarkLookup for InMemoryMarkStore {
    fn lookup(&self, student_id: &str, date: NaiveDate) -> Result<Option<AttendanceMark>> {
        Ok(self.marks.get(&(student_id.to_string(), date)).cloned())
    }
}

impl MarkStore for InMemoryMarkStore {
    fn record(&mut self, mark: AttendanceMark) {
        let key = (mark.student_id.clone(), mark.date);
        if mark.status.is_marked() {
            self.marks.insert(key, mark);
        } else {
            self.marks.remove(&key);
        }
    }

    fn clear(&mut self, student_id: &str, date: NaiveDate) -> Option<AttendanceMark> {
        self.marks.remove(&(student_id.to_string(), date))
    }
}

impl FromIterator<AttendanceMark> for InMemoryMarkStore {
    fn from_iter<I: IntoIterator<Item = AttendanceMark>>(iter: I) -> Self {
        let mut store = Self::new();
        for mark in iter {
            store.record(mark);
        }
        store
    }
}
