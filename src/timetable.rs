//! Splits a school day into fixed-length periods around one break window.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::{
    config::TimetableConfig,
    error::{AttendanceError, Result},
};

/// One bounded interval of the school day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub is_break: bool,
}

impl TimeSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open containment: `start <= time < end`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

const SECONDS_PER_MINUTE: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;

fn seconds_of(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64
}

fn time_of(seconds: i64) -> Result<NaiveTime> {
    u32::try_from(seconds)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0))
        .ok_or_else(|| AttendanceError::InvalidSchedule(format!("{seconds} seconds is past midnight")))
}

/// Partition `[start, end]` into periods of `period_minutes`.
///
/// The last period is shortened if it would run past `end`. Any period that
/// intersects `[break_start, break_start + break_minutes)` is flagged as a
/// break. When the walk lands inside the break window it emits the rest of
/// the window as its own break slot and resumes at the end of the break.
///
/// Times keep their seconds. Durations longer than a day behave like a
/// whole day.
pub fn partition(
    start: NaiveTime,
    end: NaiveTime,
    period_minutes: i64,
    break_start: NaiveTime,
    break_minutes: i64,
) -> Result<Vec<TimeSlot>> {
    if end <= start {
        return Err(AttendanceError::InvalidSchedule(format!(
            "day end {end} must be after day start {start}"
        )));
    }
    if period_minutes <= 0 {
        return Err(AttendanceError::InvalidSchedule(format!(
            "period duration must be positive, got {period_minutes} minutes"
        )));
    }
    if break_minutes < 0 {
        return Err(AttendanceError::InvalidSchedule(format!(
            "break duration must not be negative, got {break_minutes} minutes"
        )));
    }

    // Clamped to one day so the sums below stay in range.
    let period = period_minutes.min(MINUTES_PER_DAY) * SECONDS_PER_MINUTE;
    let break_len = break_minutes.min(MINUTES_PER_DAY) * SECONDS_PER_MINUTE;

    let day_end = seconds_of(end);
    let break_from = seconds_of(break_start);
    let break_until = break_from + break_len;
    let in_break = |s: i64| break_minutes > 0 && break_from <= s && s < break_until;

    let mut slots = Vec::new();
    let mut current = seconds_of(start);

    while current < day_end {
        let (slot_end, is_break) = if in_break(current) {
            (break_until.min(day_end), true)
        } else {
            let slot_end = (current + period).min(day_end);
            let overlaps = break_minutes > 0 && current < break_until && slot_end > break_from;
            (slot_end, overlaps)
        };

        slots.push(TimeSlot {
            start: time_of(current)?,
            end: time_of(slot_end)?,
            is_break,
        });
        current = slot_end;
    }

    tracing::debug!(
        "Partitioned {}-{} into {} slots of {} minutes",
        start,
        end,
        slots.len(),
        period_minutes
    );

    Ok(slots)
}

/// A school-day layout built from configuration.
#[derive(Debug, Clone)]
pub struct Timetable {
    slots: Vec<TimeSlot>,
}

impl Timetable {
    pub fn new(config: &TimetableConfig) -> Result<Self> {
        let slots = partition(
            config.day_start,
            config.day_end,
            config.period_minutes,
            config.break_start,
            config.break_minutes,
        )?;
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Slots that are not flagged as break.
    pub fn instructional_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(|s| !s.is_break)
    }

    /// The slot covering `time`, if any.
    pub fn slot_at(&self, time: NaiveTime) -> Option<&TimeSlot> {
        self.slots.iter().find(|s| s.contains(time))
    }
}
