//! CSV loaders for rosters and marks.
//!
//! Roster columns: `class_id,class_name,student_id,student_name`
//! Mark columns:   `student_id,date,status,time_in,note`

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    config::parse_clock_time,
    marks::{AttendanceMark, AttendanceStatus, InMemoryMarkStore, MarkLookup, MarkStore},
    roster::{SchoolRoster, Student},
};

#[derive(Debug, Deserialize)]
struct RosterRow {
    class_id: String,
    class_name: String,
    student_id: String,
    student_name: String,
}

#[derive(Debug, Deserialize)]
struct MarkRow {
    student_id: String,
    date: NaiveDate,
    status: String,
    time_in: Option<String>,
    note: Option<String>,
}

impl MarkRow {
    fn into_mark(self) -> Result<AttendanceMark> {
        let status: AttendanceStatus = self.status.parse()?;
        let mut mark = AttendanceMark::new(self.student_id, self.date, status);

        if let Some(raw) = self.time_in.as_deref().filter(|t| !t.trim().is_empty()) {
            let time = parse_clock_time(raw).with_context(|| format!("invalid time_in '{raw}'"))?;
            mark = mark.with_time_in(time);
        }
        if let Some(note) = self.note.filter(|n| !n.trim().is_empty()) {
            mark = mark.with_note(note);
        }
        Ok(mark)
    }
}

/// Read a roster; classes appear in first-seen order, students in row order.
pub fn read_roster<R: Read>(reader: R) -> Result<SchoolRoster> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut roster = SchoolRoster::default();

    for (index, result) in reader.deserialize::<RosterRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse roster row {}", index + 1))?;
        roster.enroll(
            &row.class_id,
            &row.class_name,
            Student::new(row.student_id, row.student_name),
        );
    }

    Ok(roster)
}

pub fn load_roster(path: &Path) -> Result<SchoolRoster> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open roster {}", path.display()))?;
    let roster = read_roster(file)?;
    tracing::info!(
        "Loaded {} classes with {} students from {}",
        roster.classes.len(),
        roster.student_count(),
        path.display()
    );
    Ok(roster)
}

/// Read marks; a later row for the same student and date overwrites the earlier one.
pub fn read_marks<R: Read>(reader: R) -> Result<InMemoryMarkStore> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut store = InMemoryMarkStore::new();

    for (index, result) in reader.deserialize::<MarkRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse mark row {}", index + 1))?;
        let mark = row
            .into_mark()
            .with_context(|| format!("Invalid mark on row {}", index + 1))?;

        if store.lookup(&mark.student_id, mark.date)?.is_some() {
            tracing::warn!(
                "Row {} overwrites an earlier mark for {} on {}",
                index + 1,
                mark.student_id,
                mark.date
            );
        }
        store.record(mark);
    }

    Ok(store)
}

pub fn load_marks(path: &Path) -> Result<InMemoryMarkStore> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open marks {}", path.display()))?;
    let store = read_marks(file)?;
    tracing::info!("Loaded {} marks from {}", store.len(), path.display());
    Ok(store)
}
