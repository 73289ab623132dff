//! Report builders.
//!
//! Each builder reshapes aggregator output for one display purpose. None of
//! them touch the mark store; `generate_report` is the only entry point here
//! that performs lookups, and it does so through the aggregator.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    aggregator::{
        self, AttendancePolicy, ClassReport, ClassTally, DayEntry, SchoolStats,
        SchoolSummaryReport, StatusCounts, StudentAttendance, StudentTally,
    },
    calendar::{self, DateRange},
    error::{AttendanceError, Result},
    marks::{AttendanceStatus, MarkLookup},
    roster::{ClassRoster, SchoolRoster, Student},
    traits::Clock,
};

// ==================== Class Report ====================

/// Class report ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReportView {
    pub label: String,
    /// School day with the fewest absent or unmarked entries; earliest wins ties.
    pub highest_attendance_day: Option<NaiveDate>,
    #[serde(flatten)]
    pub report: ClassReport,
}

pub fn build_class_report(report: ClassReport, class: &ClassRoster) -> ClassReportView {
    let highest_attendance_day = report
        .daily
        .iter()
        .min_by_key(|day| (day.counts.absent + day.counts.unmarked, day.date))
        .map(|day| day.date);

    ClassReportView {
        label: class.label(),
        highest_attendance_day,
        report,
    }
}

// ==================== Student Report ====================

/// How a day is drawn on the student calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarMark {
    Present,
    Absent,
    Late,
    /// Unmarked and already past.
    Missed,
    /// Unmarked and still ahead of today.
    Upcoming,
}

impl CalendarMark {
    pub fn classify(status: AttendanceStatus, date: NaiveDate, today: NaiveDate) -> Self {
        match status {
            AttendanceStatus::Present => CalendarMark::Present,
            AttendanceStatus::Absent => CalendarMark::Absent,
            AttendanceStatus::Late => CalendarMark::Late,
            AttendanceStatus::Unmarked if calendar::is_future_relative_to(date, today) => {
                CalendarMark::Upcoming
            }
            AttendanceStatus::Unmarked => CalendarMark::Missed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub status: AttendanceStatus,
    pub mark: CalendarMark,
    pub time_in: Option<NaiveTime>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`.
    pub month: String,
    pub days: Vec<CalendarDay>,
    pub counts: StatusCounts,
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentInfo {
    pub id: String,
    pub name: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
}

impl StudentInfo {
    pub fn new(student: &Student, class: Option<&ClassRoster>) -> Self {
        Self {
            id: student.id.clone(),
            name: student.name.clone(),
            class_id: class.map(|c| c.id.clone()),
            class_name: class.map(|c| c.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentReport {
    pub student: StudentInfo,
    pub date_range: DateRange,
    pub days: Vec<DayEntry>,
    pub by_month: BTreeMap<String, MonthBucket>,
    pub tally: StudentTally,
}

/// Bucket a student's school days by month. Unmarked days after `today`
/// are drawn as upcoming rather than missed.
pub fn build_student_report(
    student: StudentInfo,
    attendance: StudentAttendance,
    range: &DateRange,
    today: NaiveDate,
) -> StudentReport {
    let mut by_month: BTreeMap<String, MonthBucket> = BTreeMap::new();

    for entry in &attendance.days {
        let key = calendar::month_key(entry.date);
        let bucket = by_month.entry(key.clone()).or_insert_with(|| MonthBucket {
            month: key,
            days: Vec::new(),
            counts: StatusCounts::default(),
            attendance_rate: 0,
        });

        bucket.counts.add(entry.status);
        bucket.days.push(CalendarDay {
            date: entry.date,
            day_of_month: entry.date.day(),
            status: entry.status,
            mark: CalendarMark::classify(entry.status, entry.date, today),
            time_in: entry.time_in,
            note: entry.note.clone(),
        });
    }

    for bucket in by_month.values_mut() {
        bucket.attendance_rate = bucket.counts.attendance_rate();
    }

    StudentReport {
        student,
        date_range: *range,
        days: attendance.days,
        by_month,
        tally: attendance.tally,
    }
}

// ==================== Summary Report ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub date_range: DateRange,
    pub per_class: Vec<ClassTally>,
    pub stats: SchoolStats,
    /// Every instructional day processed, ascending.
    pub school_days: Vec<NaiveDate>,
}

impl SummaryReport {
    pub fn instructional_day_count(&self) -> usize {
        self.school_days.len()
    }
}

pub fn build_summary_report(summary: SchoolSummaryReport) -> Result<SummaryReport> {
    let school_days = calendar::school_days(&summary.date_range)?;

    Ok(SummaryReport {
        date_range: summary.date_range,
        per_class: summary.per_class,
        stats: summary.stats,
        school_days,
    })
}

// ==================== Report Requests ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Class,
    Student,
    Summary,
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "class" => Ok(ReportType::Class),
            "student" => Ok(ReportType::Student),
            "summary" => Ok(ReportType::Summary),
            other => Err(format!("unknown report type: {other}")),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub class_id: Option<String>,
    pub student_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportRequest {
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "report_type", rename_all = "lowercase")]
pub enum Report {
    Class(ClassReportView),
    Student(StudentReport),
    Summary(SummaryReport),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validate a request, aggregate, and build the requested report.
pub fn generate_report<L, C>(
    request: &ReportRequest,
    roster: &SchoolRoster,
    lookup: &L,
    clock: &C,
    policy: &AttendancePolicy,
) -> Result<Report>
where
    L: MarkLookup + ?Sized,
    C: Clock + ?Sized,
{
    let range = request.date_range()?;

    tracing::debug!(
        "Generating {:?} report for {} to {}",
        request.report_type,
        range.start(),
        range.end()
    );

    match request.report_type {
        ReportType::Class => {
            let class_id =
                non_empty(&request.class_id).ok_or(AttendanceError::MissingTarget("class_id"))?;
            let class = roster
                .class(class_id)
                .ok_or_else(|| AttendanceError::UnknownClass(class_id.to_string()))?;
            let report = aggregator::aggregate_class_with_policy(class, &range, lookup, policy)?;
            Ok(Report::Class(build_class_report(report, class)))
        }
        ReportType::Student => {
            let student_id = non_empty(&request.student_id)
                .ok_or(AttendanceError::MissingTarget("student_id"))?;
            let (class, student) = roster
                .find_student(student_id)
                .ok_or_else(|| AttendanceError::UnknownStudent(student_id.to_string()))?;
            let attendance = aggregator::aggregate_student_days(student, &range, lookup)?;
            Ok(Report::Student(build_student_report(
                StudentInfo::new(student, Some(class)),
                attendance,
                &range,
                clock.today(),
            )))
        }
        ReportType::Summary => {
            let summary =
                aggregator::aggregate_school_with_policy(&roster.classes, &range, lookup, policy)?;
            Ok(Report::Summary(build_summary_report(summary)?))
        }
    }
}
