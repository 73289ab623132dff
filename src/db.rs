use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, PgPool};

use crate::{
    calendar::DateRange,
    marks::{AttendanceMark, AttendanceStatus, InMemoryMarkStore, MarkStore},
    roster::{ClassRoster, SchoolRoster, Student},
};

#[derive(Debug, Clone, FromRow)]
struct ClassRow {
    id: String,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct StudentRow {
    id: String,
    name: String,
    class_id: String,
}

/// A stored mark as it comes out of `attendance_marks`.
#[derive(Debug, Clone, FromRow)]
pub struct MarkRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub time_in: Option<NaiveTime>,
    pub note: Option<String>,
}

impl MarkRecord {
    pub fn into_mark(self) -> Result<AttendanceMark> {
        let status: AttendanceStatus = self
            .status
            .parse()
            .with_context(|| format!("Bad status stored for {} on {}", self.student_id, self.date))?;
        Ok(AttendanceMark {
            student_id: self.student_id,
            date: self.date,
            status,
            time_in: self.time_in,
            note: self.note,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }

    /// Insert or rename every class and student in the roster.
    pub async fn upsert_roster(&self, roster: &SchoolRoster) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        for class in &roster.classes {
            sqlx::query(
                r#"
                INSERT INTO classes (id, name) VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(&class.id)
            .bind(&class.name)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert class {}", class.id))?;

            for student in &class.students {
                sqlx::query(
                    r#"
                    INSERT INTO students (id, name, class_id) VALUES ($1, $2, $3)
                    ON CONFLICT (id) DO UPDATE
                    SET name = EXCLUDED.name, class_id = EXCLUDED.class_id
                    "#,
                )
                .bind(&student.id)
                .bind(&student.name)
                .bind(&class.id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to upsert student {}", student.id))?;
            }
        }

        tx.commit().await.context("Failed to commit roster")?;
        Ok(())
    }

    /// Classes in insertion order, each with its students in insertion order.
    pub async fn fetch_roster(&self) -> Result<SchoolRoster> {
        let classes: Vec<ClassRow> = sqlx::query_as("SELECT id, name FROM classes ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch classes")?;

        let students: Vec<StudentRow> =
            sqlx::query_as("SELECT id, name, class_id FROM students ORDER BY seq")
                .fetch_all(&self.pool)
                .await
                .context("Failed to fetch students")?;

        let mut roster = SchoolRoster::new(
            classes
                .into_iter()
                .map(|c| ClassRoster::new(c.id, c.name))
                .collect(),
        );
        for row in students {
            let class_name = roster
                .class(&row.class_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            roster.enroll(&row.class_id, &class_name, Student::new(row.id, row.name));
        }

        Ok(roster)
    }

    /// Store a mark, overwriting any existing one. `unmarked` deletes the row.
    pub async fn upsert_mark(&self, mark: &AttendanceMark) -> Result<()> {
        if !mark.status.is_marked() {
            self.delete_mark(&mark.student_id, mark.date).await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO attendance_marks (student_id, date, status, time_in, note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (student_id, date) DO UPDATE
            SET status = EXCLUDED.status, time_in = EXCLUDED.time_in, note = EXCLUDED.note
            "#,
        )
        .bind(&mark.student_id)
        .bind(mark.date)
        .bind(mark.status.as_str())
        .bind(mark.time_in)
        .bind(mark.note.as_deref())
        .execute(&self.pool)
        .await
        .context("Failed to upsert attendance mark")?;

        Ok(())
    }

    pub async fn delete_mark(&self, student_id: &str, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendance_marks WHERE student_id = $1 AND date = $2")
            .bind(student_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .context("Failed to delete attendance mark")?;

        Ok(result.rows_affected() > 0)
    }

    /// Batch upsert, returning how many marks were written.
    pub async fn store_marks(&self, store: &InMemoryMarkStore) -> Result<usize> {
        let marks = store.marks();
        for mark in &marks {
            self.upsert_mark(mark).await?;
        }
        Ok(marks.len())
    }

    pub async fn fetch_marks(&self, range: &DateRange) -> Result<Vec<MarkRecord>> {
        let records: Vec<MarkRecord> = sqlx::query_as(
            r#"
            SELECT student_id, date, status, time_in, note
            FROM attendance_marks
            WHERE date >= $1 AND date <= $2
            ORDER BY student_id, date
            "#,
        )
        .bind(range.start())
        .bind(range.end())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch attendance marks for date range")?;

        Ok(records)
    }

    /// Resolve every mark in the range up front so aggregation can run
    /// synchronously against memory.
    pub async fn prefetch_marks(&self, range: &DateRange) -> Result<InMemoryMarkStore> {
        let mut store = InMemoryMarkStore::new();
        for record in self.fetch_marks(range).await? {
            store.record(record.into_mark()?);
        }

        tracing::debug!(
            "Prefetched {} marks for {} to {}",
            store.len(),
            range.start(),
            range.end()
        );

        Ok(store)
    }
}
