//! School Attendance Library
//!
//! Attendance aggregation and reporting over arbitrary date ranges, plus
//! timetable slot partitioning. The CLI in `main.rs` wires these to CSV
//! files or PostgreSQL.

pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod marks;
pub mod report;
pub mod roster;
pub mod timetable;
pub mod traits;

// Re-export commonly used types
pub use aggregator::{
    AttendancePolicy,
    CHRONIC_ABSENCE_THRESHOLD,
    ClassReport,
    ClassStats,
    ClassTally,
    DailyCount,
    DayEntry,
    SchoolStats,
    SchoolSummaryReport,
    StatusCounts,
    StudentAttendance,
    StudentTally,
    aggregate_class,
    aggregate_class_with_policy,
    aggregate_school,
    aggregate_school_with_policy,
    aggregate_student,
    aggregate_student_days,
    attendance_rate,
};
pub use calendar::{
    DateRange, date_sequence, days_in_range, is_future_relative_to, is_weekend, school_days,
};
pub use config::AppConfig;
pub use db::Database;
pub use error::{AttendanceError, Result};
pub use marks::{AttendanceMark, AttendanceStatus, InMemoryMarkStore, MarkLookup, MarkStore};
pub use report::{
    CalendarMark, ClassReportView, Report, ReportRequest, ReportType, StudentReport,
    SummaryReport, build_class_report, build_student_report, build_summary_report,
    generate_report,
};
pub use roster::{ClassRoster, SchoolRoster, Student};
pub use timetable::{TimeSlot, Timetable, partition};
pub use traits::{Clock, MockClock, SystemClock};
