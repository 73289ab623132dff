//! Attendance aggregation.
//!
//! Counting policy applied everywhere in this module:
//! - weekends are skipped entirely
//! - `present` and `late` count as attended
//! - only `absent` counts toward the absence total
//! - `unmarked` days are "no data" and stay out of the rate denominator
//!
//! Rates are integer percentages rounded half up. A denominator of zero
//! yields a rate of 0.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::{
    calendar::{self, DateRange},
    error::Result,
    marks::{AttendanceStatus, MarkLookup},
    roster::{ClassRoster, Student},
};

/// Students whose rate falls below this percentage are flagged as chronically absent.
pub const CHRONIC_ABSENCE_THRESHOLD: u32 = 90;

/// Policy values applied while aggregating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendancePolicy {
    pub chronic_absence_threshold: u32,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            chronic_absence_threshold: CHRONIC_ABSENCE_THRESHOLD,
        }
    }
}

impl AttendancePolicy {
    pub fn is_chronic(&self, attendance_rate: u32) -> bool {
        attendance_rate < self.chronic_absence_threshold
    }
}

// ==================== Rate Arithmetic ====================

/// `round(100 * attended / marked)` with half-up rounding; 0 when nothing was marked.
pub fn attendance_rate(attended: u32, marked: u32) -> u32 {
    if marked == 0 {
        return 0;
    }
    let (attended, marked) = (attended as u64, marked as u64);
    ((200 * attended + marked) / (2 * marked)) as u32
}

/// Arithmetic mean of integer rates, rounded half up; 0 for an empty slice.
pub fn mean_rate(rates: &[u32]) -> u32 {
    if rates.is_empty() {
        return 0;
    }
    let sum: u64 = rates.iter().map(|r| *r as u64).sum();
    let n = rates.len() as u64;
    ((2 * sum + n) / (2 * n)) as u32
}

// ==================== Tally Types ====================

/// Raw per-status counts over some set of school days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub unmarked: u32,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Unmarked => self.unmarked += 1,
        }
    }

    pub fn merge(&mut self, other: &StatusCounts) {
        self.present += other.present;
        self.absent += other.absent;
        self.late += other.late;
        self.unmarked += other.unmarked;
    }

    pub fn attended(&self) -> u32 {
        self.present + self.late
    }

    pub fn marked_days(&self) -> u32 {
        self.present + self.absent + self.late
    }

    pub fn attendance_rate(&self) -> u32 {
        attendance_rate(self.attended(), self.marked_days())
    }
}

impl FromIterator<AttendanceStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = AttendanceStatus>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}

/// Derived counts and rate for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentTally {
    pub student_id: String,
    pub student_name: String,
    pub present_count: u32,
    pub absent_count: u32,
    pub late_count: u32,
    pub unmarked_count: u32,
    pub attendance_rate: u32,
}

impl StudentTally {
    fn from_counts(student: &Student, counts: &StatusCounts) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            present_count: counts.present,
            absent_count: counts.absent,
            late_count: counts.late,
            unmarked_count: counts.unmarked,
            attendance_rate: counts.attendance_rate(),
        }
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            present: self.present_count,
            absent: self.absent_count,
            late: self.late_count,
            unmarked: self.unmarked_count,
        }
    }

    pub fn marked_days(&self) -> u32 {
        self.present_count + self.absent_count + self.late_count
    }
}

/// One school day's outcome for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<NaiveTime>,
    pub note: Option<String>,
}

/// A student's tally together with the per-day entries it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentAttendance {
    pub tally: StudentTally,
    pub days: Vec<DayEntry>,
}

/// Roster-wide counts for a single school day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub student_count: u32,
    pub average_attendance_rate: u32,
    pub perfect_attendance_count: u32,
    pub chronic_absence_count: u32,
}

/// Aggregated attendance for one class over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub class_id: String,
    pub class_name: String,
    pub date_range: DateRange,
    /// In roster order.
    pub per_student: Vec<StudentTally>,
    pub stats: ClassStats,
    pub totals: StatusCounts,
    /// One entry per school day in the range, ascending.
    pub daily: Vec<DailyCount>,
}

/// Class-level line of the school summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTally {
    pub class_id: String,
    pub class_name: String,
    pub student_count: u32,
    pub present_count: u32,
    pub absent_count: u32,
    pub late_count: u32,
    pub marked_days: u32,
    /// Pooled rate over the class totals.
    pub attendance_rate: u32,
    /// Mean of the per-student rates.
    pub average_student_rate: u32,
    pub perfect_attendance_count: u32,
    pub chronic_absence_count: u32,
}

impl From<&ClassReport> for ClassTally {
    fn from(report: &ClassReport) -> Self {
        Self {
            class_id: report.class_id.clone(),
            class_name: report.class_name.clone(),
            student_count: report.stats.student_count,
            present_count: report.totals.present,
            absent_count: report.totals.absent,
            late_count: report.totals.late,
            marked_days: report.totals.marked_days(),
            attendance_rate: report.totals.attendance_rate(),
            average_student_rate: report.stats.average_attendance_rate,
            perfect_attendance_count: report.stats.perfect_attendance_count,
            chronic_absence_count: report.stats.chronic_absence_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchoolStats {
    pub class_count: u32,
    pub student_count: u32,
    pub total_present: u32,
    pub total_absent: u32,
    pub total_late: u32,
    pub total_marked_days: u32,
    pub school_attendance_rate: u32,
    pub perfect_attendance_count: u32,
    pub chronic_absence_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolSummaryReport {
    pub date_range: DateRange,
    /// Sorted by `attendance_rate` descending; ties keep roster order.
    pub per_class: Vec<ClassTally>,
    pub stats: SchoolStats,
}

// ==================== Student Aggregation ====================

fn collect_days<L: MarkLookup + ?Sized>(
    student: &Student,
    days: &[NaiveDate],
    lookup: &L,
) -> Result<Vec<DayEntry>> {
    days.iter()
        .map(|&date| -> Result<DayEntry> {
            let entry = match lookup.lookup(&student.id, date)? {
                Some(mark) => DayEntry {
                    date,
                    status: mark.status,
                    time_in: mark.time_in,
                    note: mark.note,
                },
                None => DayEntry {
                    date,
                    status: AttendanceStatus::Unmarked,
                    time_in: None,
                    note: None,
                },
            };
            Ok(entry)
        })
        .collect()
}

fn attendance_over<L: MarkLookup + ?Sized>(
    student: &Student,
    days: &[NaiveDate],
    lookup: &L,
) -> Result<StudentAttendance> {
    let days = collect_days(student, days, lookup)?;
    let counts: StatusCounts = days.iter().map(|d| d.status).collect();

    Ok(StudentAttendance {
        tally: StudentTally::from_counts(student, &counts),
        days,
    })
}

/// Tally one student's school days within the range.
pub fn aggregate_student<L: MarkLookup + ?Sized>(
    student: &Student,
    range: &DateRange,
    lookup: &L,
) -> Result<StudentTally> {
    Ok(aggregate_student_days(student, range, lookup)?.tally)
}

/// Like [`aggregate_student`], also returning each school day's entry.
pub fn aggregate_student_days<L: MarkLookup + ?Sized>(
    student: &Student,
    range: &DateRange,
    lookup: &L,
) -> Result<StudentAttendance> {
    let days = calendar::school_days(range)?;
    let attendance = attendance_over(student, &days, lookup)?;

    tracing::debug!(
        "Aggregated student {} over {} school days: {}%",
        student.id,
        days.len(),
        attendance.tally.attendance_rate
    );

    Ok(attendance)
}

// ==================== Class Aggregation ====================

/// Aggregate a class with the default policy.
pub fn aggregate_class<L: MarkLookup + ?Sized>(
    class: &ClassRoster,
    range: &DateRange,
    lookup: &L,
) -> Result<ClassReport> {
    aggregate_class_with_policy(class, range, lookup, &AttendancePolicy::default())
}

/// Aggregate every student of a class, in roster order.
pub fn aggregate_class_with_policy<L: MarkLookup + ?Sized>(
    class: &ClassRoster,
    range: &DateRange,
    lookup: &L,
    policy: &AttendancePolicy,
) -> Result<ClassReport> {
    let days = calendar::school_days(range)?;
    let mut daily: Vec<DailyCount> = days
        .iter()
        .map(|&date| DailyCount {
            date,
            counts: StatusCounts::default(),
        })
        .collect();

    let mut per_student = Vec::with_capacity(class.students.len());
    let mut totals = StatusCounts::default();

    for student in &class.students {
        let attendance = attendance_over(student, &days, lookup)?;
        for (slot, entry) in daily.iter_mut().zip(&attendance.days) {
            slot.counts.add(entry.status);
        }
        totals.merge(&attendance.tally.counts());
        per_student.push(attendance.tally);
    }

    let stats = class_stats(&per_student, policy);

    tracing::debug!(
        "Aggregated class {}: {} students, {} school days, average {}%",
        class.id,
        stats.student_count,
        days.len(),
        stats.average_attendance_rate
    );

    Ok(ClassReport {
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        date_range: *range,
        per_student,
        stats,
        totals,
        daily,
    })
}

/// Roll-up statistics over a set of student tallies.
pub fn class_stats(tallies: &[StudentTally], policy: &AttendancePolicy) -> ClassStats {
    let rates: Vec<u32> = tallies.iter().map(|t| t.attendance_rate).collect();

    ClassStats {
        student_count: tallies.len() as u32,
        average_attendance_rate: mean_rate(&rates),
        perfect_attendance_count: tallies.iter().filter(|t| t.absent_count == 0).count() as u32,
        chronic_absence_count: rates.iter().filter(|r| policy.is_chronic(**r)).count() as u32,
    }
}

// ==================== School Aggregation ====================

/// Aggregate the whole school with the default policy.
pub fn aggregate_school<L: MarkLookup + ?Sized>(
    classes: &[ClassRoster],
    range: &DateRange,
    lookup: &L,
) -> Result<SchoolSummaryReport> {
    aggregate_school_with_policy(classes, range, lookup, &AttendancePolicy::default())
}

/// Aggregate each class independently and rank them by attendance rate.
pub fn aggregate_school_with_policy<L: MarkLookup + ?Sized>(
    classes: &[ClassRoster],
    range: &DateRange,
    lookup: &L,
    policy: &AttendancePolicy,
) -> Result<SchoolSummaryReport> {
    let mut per_class = classes
        .iter()
        .map(|class| {
            aggregate_class_with_policy(class, range, lookup, policy)
                .map(|report| ClassTally::from(&report))
        })
        .collect::<Result<Vec<_>>>()?;

    // Vec::sort_by is stable, so equal rates keep roster order.
    per_class.sort_by(|a, b| b.attendance_rate.cmp(&a.attendance_rate));

    let mut stats = SchoolStats {
        class_count: per_class.len() as u32,
        ..SchoolStats::default()
    };
    for class in &per_class {
        stats.student_count += class.student_count;
        stats.total_present += class.present_count;
        stats.total_absent += class.absent_count;
        stats.total_late += class.late_count;
        stats.total_marked_days += class.marked_days;
        stats.perfect_attendance_count += class.perfect_attendance_count;
        stats.chronic_absence_count += class.chronic_absence_count;
    }
    stats.school_attendance_rate = attendance_rate(
        stats.total_present + stats.total_late,
        stats.total_marked_days,
    );

    tracing::debug!(
        "Aggregated school: {} classes, {} students, {}%",
        stats.class_count,
        stats.student_count,
        stats.school_attendance_rate
    );

    Ok(SchoolSummaryReport {
        date_range: *range,
        per_class,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        error::AttendanceError,
        marks::{AttendanceMark, InMemoryMarkStore, MarkStore},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Monday 2024-03-04 .. Friday 2024-03-08.
    fn school_week() -> DateRange {
        DateRange::new(date(2024, 3, 4), date(2024, 3, 8)).unwrap()
    }

    fn mark(store: &mut InMemoryMarkStore, id: &str, d: NaiveDate, status: AttendanceStatus) {
        store.record(AttendanceMark::new(id, d, status));
    }

    /// Marks `present` for the first `present` weekdays and `absent` for the rest.
    fn week_with_rate(store: &mut InMemoryMarkStore, id: &str, present: u32) {
        for (i, d) in calendar::school_days(&school_week()).unwrap().into_iter().enumerate() {
            let status = if (i as u32) < present {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            mark(store, id, d, status);
        }
    }

    // ==================== Rate Arithmetic Tests ====================

    #[test]
    fn test_attendance_rate_rounds_half_up() {
        assert_eq!(attendance_rate(1, 8), 13); // 12.5
        assert_eq!(attendance_rate(1, 3), 33); // 33.33
        assert_eq!(attendance_rate(2, 3), 67); // 66.67
        assert_eq!(attendance_rate(5, 5), 100);
    }

    #[test]
    fn test_attendance_rate_zero_denominator() {
        assert_eq!(attendance_rate(0, 0), 0);
    }

    #[test]
    fn test_mean_rate() {
        assert_eq!(mean_rate(&[100, 80, 60]), 80);
        assert_eq!(mean_rate(&[100, 75]), 88); // 87.5
        assert_eq!(mean_rate(&[]), 0);
    }

    // ==================== Student Aggregation Tests ====================

    #[test]
    fn test_present_all_week() {
        let mut store = InMemoryMarkStore::new();
        week_with_rate(&mut store, "s-1", 5);

        let tally = aggregate_student(&Student::new("s-1", "Ada"), &school_week(), &store).unwrap();

        assert_eq!(tally.present_count, 5);
        assert_eq!(tally.absent_count, 0);
        assert_eq!(tally.attendance_rate, 100);
    }

    #[test]
    fn test_weekend_marks_are_ignored() {
        // Monday .. Sunday, absent on Monday, "present" recorded on the weekend
        let range = DateRange::new(date(2024, 3, 4), date(2024, 3, 10)).unwrap();
        let mut store = InMemoryMarkStore::new();
        mark(&mut store, "s-1", date(2024, 3, 4), AttendanceStatus::Absent);
        mark(&mut store, "s-1", date(2024, 3, 9), AttendanceStatus::Present);
        mark(&mut store, "s-1", date(2024, 3, 10), AttendanceStatus::Present);

        let tally = aggregate_student(&Student::new("s-1", "Ada"), &range, &store).unwrap();

        assert_eq!(tally.absent_count, 1);
        assert_eq!(tally.present_count, 0);
        assert_eq!(tally.unmarked_count, 4);
        assert_eq!(tally.attendance_rate, 0);
    }

    #[test]
    fn test_late_counts_as_attended_and_unmarked_is_excluded() {
        let mut store = InMemoryMarkStore::new();
        mark(&mut store, "s-1", date(2024, 3, 4), AttendanceStatus::Present);
        mark(&mut store, "s-1", date(2024, 3, 5), AttendanceStatus::Late);
        mark(&mut store, "s-1", date(2024, 3, 6), AttendanceStatus::Absent);
        mark(&mut store, "s-1", date(2024, 3, 7), AttendanceStatus::Absent);

        let tally = aggregate_student(&Student::new("s-1", "Ada"), &school_week(), &store).unwrap();

        assert_eq!(tally.late_count, 1);
        assert_eq!(tally.unmarked_count, 1);
        assert_eq!(tally.marked_days(), 4);
        assert_eq!(tally.attendance_rate, 50);
    }

    #[test]
    fn test_weekend_only_range_yields_zero_rate() {
        let range = DateRange::new(date(2024, 3, 9), date(2024, 3, 10)).unwrap();
        let store = InMemoryMarkStore::new();

        let tally = aggregate_student(&Student::new("s-1", "Ada"), &range, &store).unwrap();

        assert_eq!(tally.attendance_rate, 0);
        assert_eq!(tally.marked_days(), 0);
    }

    #[test]
    fn test_student_days_carry_time_in_and_note() {
        let mut store = InMemoryMarkStore::new();
        store.record(
            AttendanceMark::new("s-1", date(2024, 3, 5), AttendanceStatus::Late)
                .with_time_in(NaiveTime::from_hms_opt(8, 25, 0).unwrap())
                .with_note("dentist"),
        );

        let attendance =
            aggregate_student_days(&Student::new("s-1", "Ada"), &school_week(), &store).unwrap();

        assert_eq!(attendance.days.len(), 5);
        let tuesday = &attendance.days[1];
        assert_eq!(tuesday.status, AttendanceStatus::Late);
        assert_eq!(tuesday.time_in, NaiveTime::from_hms_opt(8, 25, 0));
        assert_eq!(tuesday.note.as_deref(), Some("dentist"));
        assert_eq!(attendance.days[0].status, AttendanceStatus::Unmarked);
    }

    // ==================== Class Aggregation Tests ====================

    fn three_student_class() -> (ClassRoster, InMemoryMarkStore) {
        let class = ClassRoster::new("7A", "Grade 7 Amber").with_students(vec![
            Student::new("s-1", "Ada"),
            Student::new("s-2", "Grace"),
            Student::new("s-3", "Alan"),
        ]);
        let mut store = InMemoryMarkStore::new();
        week_with_rate(&mut store, "s-1", 5); // 100
        week_with_rate(&mut store, "s-2", 4); // 80
        week_with_rate(&mut store, "s-3", 3); // 60
        (class, store)
    }

    #[test]
    fn test_class_stats_use_documented_threshold() {
        let (class, store) = three_student_class();

        let report = aggregate_class(&class, &school_week(), &store).unwrap();

        let rates: Vec<_> = report.per_student.iter().map(|t| t.attendance_rate).collect();
        assert_eq!(rates, vec![100, 80, 60]);
        assert_eq!(report.stats.average_attendance_rate, 80);
        assert_eq!(report.stats.chronic_absence_count, 2);
        assert_eq!(report.stats.perfect_attendance_count, 1);
        assert_eq!(report.stats.student_count, 3);
    }

    #[test]
    fn test_class_keeps_roster_order() {
        let (mut class, store) = three_student_class();
        class.students.reverse();

        let report = aggregate_class(&class, &school_week(), &store).unwrap();

        let ids: Vec<_> = report.per_student.iter().map(|t| t.student_id.as_str()).collect();
        assert_eq!(ids, vec!["s-3", "s-2", "s-1"]);
    }

    #[test]
    fn test_custom_policy_threshold() {
        let (class, store) = three_student_class();
        let policy = AttendancePolicy {
            chronic_absence_threshold: 70,
        };

        let report = aggregate_class_with_policy(&class, &school_week(), &store, &policy).unwrap();

        assert_eq!(report.stats.chronic_absence_count, 1);
    }

    #[test]
    fn test_daily_counts_cover_each_school_day() {
        let (class, store) = three_student_class();

        let report = aggregate_class(&class, &school_week(), &store).unwrap();

        assert_eq!(report.daily.len(), 5);
        assert_eq!(report.daily[0].counts.present, 3);
        assert_eq!(report.daily[4].counts.absent, 2);
        assert_eq!(report.totals.present, 12);
        assert_eq!(report.totals.absent, 3);
    }

    #[test]
    fn test_empty_roster_is_not_an_error() {
        let class = ClassRoster::new("8C", "Grade 8 Cedar");
        let store = InMemoryMarkStore::new();

        let report = aggregate_class(&class, &school_week(), &store).unwrap();

        assert!(report.per_student.is_empty());
        assert_eq!(report.stats, ClassStats::default());
    }

    #[test]
    fn test_class_aggregation_is_idempotent() {
        let (class, store) = three_student_class();

        let first = aggregate_class(&class, &school_week(), &store).unwrap();
        let second = aggregate_class(&class, &school_week(), &store).unwrap();

        assert_eq!(first, second);
    }

    // ==================== Lookup Failure Tests ====================

    struct FailingLookup {
        fail_for: &'static str,
        calls: Cell<u32>,
    }

    impl MarkLookup for FailingLookup {
        fn lookup(&self, student_id: &str, date: NaiveDate) -> Result<Option<AttendanceMark>> {
            self.calls.set(self.calls.get() + 1);
            if student_id == self.fail_for {
                return Err(AttendanceError::lookup(student_id, date, "store offline"));
            }
            Ok(Some(AttendanceMark::new(student_id, date, AttendanceStatus::Present)))
        }
    }

    #[test]
    fn test_first_lookup_failure_aborts_class() {
        let (class, _) = three_student_class();
        let lookup = FailingLookup {
            fail_for: "s-2",
            calls: Cell::new(0),
        };

        let result = aggregate_class(&class, &school_week(), &lookup);

        match result {
            Err(AttendanceError::LookupFailure { student_id, date: d, .. }) => {
                assert_eq!(student_id, "s-2");
                assert_eq!(d, date(2024, 3, 4));
            }
            other => panic!("expected lookup failure, got {:?}", other),
        }
        // s-1's five days plus the failing first call for s-2; s-3 is never read
        assert_eq!(lookup.calls.get(), 6);
    }

    // ==================== School Aggregation Tests ====================

    #[test]
    fn test_school_sorts_by_rate_and_sums_totals() {
        let classes = vec![
            ClassRoster::new("7A", "Amber").with_students(vec![Student::new("a-1", "A1")]),
            ClassRoster::new("7B", "Blue").with_students(vec![Student::new("b-1", "B1")]),
            ClassRoster::new("7C", "Cedar").with_students(vec![Student::new("c-1", "C1")]),
        ];
        let mut store = InMemoryMarkStore::new();
        week_with_rate(&mut store, "a-1", 3); // 60
        week_with_rate(&mut store, "b-1", 5); // 100
        week_with_rate(&mut store, "c-1", 4); // 80

        let summary = aggregate_school(&classes, &school_week(), &store).unwrap();

        let order: Vec<_> = summary.per_class.iter().map(|c| c.class_id.as_str()).collect();
        assert_eq!(order, vec!["7B", "7C", "7A"]);
        assert_eq!(summary.stats.total_present, 12);
        assert_eq!(summary.stats.total_absent, 3);
        assert_eq!(summary.stats.total_marked_days, 15);
        assert_eq!(summary.stats.school_attendance_rate, 80);
        assert_eq!(summary.stats.class_count, 3);
        assert_eq!(summary.stats.chronic_absence_count, 2);
    }

    #[test]
    fn test_school_rate_is_pooled_not_averaged() {
        // 7A: one student, 1 of 1 marked day attended; 7B: one student, 0 of 4
        let classes = vec![
            ClassRoster::new("7A", "Amber").with_students(vec![Student::new("a-1", "A1")]),
            ClassRoster::new("7B", "Blue").with_students(vec![Student::new("b-1", "B1")]),
        ];
        let mut store = InMemoryMarkStore::new();
        mark(&mut store, "a-1", date(2024, 3, 4), AttendanceStatus::Present);
        for d in 4..=7 {
            mark(&mut store, "b-1", date(2024, 3, d), AttendanceStatus::Absent);
        }

        let summary = aggregate_school(&classes, &school_week(), &store).unwrap();

        // mean of class rates would be 50; pooled is 1 / 5
        assert_eq!(summary.stats.school_attendance_rate, 20);
    }

    #[test]
    fn test_school_ties_keep_roster_order() {
        let classes = vec![
            ClassRoster::new("9Z", "Zeta").with_students(vec![Student::new("z-1", "Z1")]),
            ClassRoster::new("9A", "Alpha").with_students(vec![Student::new("a-1", "A1")]),
        ];
        let mut store = InMemoryMarkStore::new();
        week_with_rate(&mut store, "z-1", 4);
        week_with_rate(&mut store, "a-1", 4);

        let summary = aggregate_school(&classes, &school_week(), &store).unwrap();

        assert_eq!(summary.per_class[0].class_id, "9Z");
        assert_eq!(summary.per_class[1].class_id, "9A");
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn status_strategy() -> impl Strategy<Value = AttendanceStatus> {
            prop_oneof![
                Just(AttendanceStatus::Present),
                Just(AttendanceStatus::Absent),
                Just(AttendanceStatus::Late),
                Just(AttendanceStatus::Unmarked),
            ]
        }

        proptest! {
            #[test]
            fn rate_is_bounded(attended in 0u32..500, extra in 0u32..500) {
                let rate = attendance_rate(attended, attended + extra);
                prop_assert!(rate <= 100);
            }

            #[test]
            fn marked_days_never_exceed_school_days(
                offset in 0i64..400,
                len in 0i64..40,
                statuses in proptest::collection::vec(status_strategy(), 41),
            ) {
                let start = date(2024, 1, 1) + chrono::Duration::days(offset);
                let range = DateRange::new(start, start + chrono::Duration::days(len)).unwrap();
                let mut store = InMemoryMarkStore::new();
                for (d, status) in calendar::date_sequence(&range).unwrap().into_iter().zip(statuses) {
                    mark(&mut store, "s-1", d, status);
                }

                let tally = aggregate_student(&Student::new("s-1", "Ada"), &range, &store).unwrap();
                let school_days = calendar::school_days(&range).unwrap().len() as u32;

                prop_assert!(tally.marked_days() <= school_days);
                prop_assert_eq!(tally.marked_days() + tally.unmarked_count, school_days);
                prop_assert!(tally.attendance_rate <= 100);
            }

            #[test]
            fn school_sort_is_stable(present in proptest::collection::vec(0u32..=5, 1..8)) {
                let classes: Vec<_> = present
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        ClassRoster::new(format!("c{i}"), format!("Class {i}"))
                            .with_students(vec![Student::new(format!("s{i}"), format!("S{i}"))])
                    })
                    .collect();
                let mut store = InMemoryMarkStore::new();
                for (i, p) in present.iter().enumerate() {
                    week_with_rate(&mut store, &format!("s{i}"), *p);
                }

                let summary = aggregate_school(&classes, &school_week(), &store).unwrap();

                for pair in summary.per_class.windows(2) {
                    prop_assert!(pair[0].attendance_rate >= pair[1].attendance_rate);
                    if pair[0].attendance_rate == pair[1].attendance_rate {
                        let a: usize = pair[0].class_id[1..].parse().unwrap();
                        let b: usize = pair[1].class_id[1..].parse().unwrap();
                        prop_assert!(a < b);
                    }
                }
            }
        }
    }
}
