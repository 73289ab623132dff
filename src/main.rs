use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use school_attendance::{
    AppConfig, Database, InMemoryMarkStore, ReportRequest, ReportType, SchoolRoster, SystemClock,
    Timetable, config::parse_clock_time, generate_report, import,
};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "school-attendance")]
#[command(about = "Attendance reports and timetable slots for a school")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a class, student or summary attendance report as JSON
    Report {
        /// class, student or summary
        report_type: ReportType,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long)]
        class_id: Option<String>,
        #[arg(long)]
        student_id: Option<String>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the day's time slots as JSON
    Timetable {
        /// Override day start (HH:MM)
        #[arg(long)]
        start: Option<String>,
        /// Override day end (HH:MM)
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        period_minutes: Option<i64>,
        /// Override break start (HH:MM)
        #[arg(long)]
        break_start: Option<String>,
        #[arg(long)]
        break_minutes: Option<i64>,
    },
    /// Create or upgrade the database schema
    InitDb,
    /// Load roster and marks from CSV into the database
    Import {
        #[arg(long)]
        roster: PathBuf,
        #[arg(long)]
        marks: Option<PathBuf>,
    },
}

/// Where rosters and marks come from. CSV when `--roster` is given, otherwise PostgreSQL.
#[derive(ClapArgs, Debug)]
struct SourceArgs {
    #[arg(long)]
    roster: Option<PathBuf>,
    #[arg(long, requires = "roster")]
    marks: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("school_attendance=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    match args.command {
        Command::Report {
            report_type,
            from,
            to,
            class_id,
            student_id,
            source,
        } => {
            let request = ReportRequest {
                report_type,
                class_id,
                student_id,
                start_date: from,
                end_date: to,
            };
            run_report(&config, &request, &source)
        }
        Command::Timetable {
            start,
            end,
            period_minutes,
            break_start,
            break_minutes,
        } => {
            let mut timetable = config.timetable.clone();
            if let Some(value) = start {
                timetable.day_start = clock_arg("start", &value)?;
            }
            if let Some(value) = end {
                timetable.day_end = clock_arg("end", &value)?;
            }
            if let Some(value) = break_start {
                timetable.break_start = clock_arg("break-start", &value)?;
            }
            timetable.period_minutes = period_minutes.unwrap_or(timetable.period_minutes);
            timetable.break_minutes = break_minutes.unwrap_or(timetable.break_minutes);

            let timetable = Timetable::new(&timetable)?;
            print_json(timetable.slots())
        }
        Command::InitDb => {
            let rt = runtime()?;
            rt.block_on(async {
                connect(&config).await?;
                tracing::info!("Schema ready");
                Ok::<_, anyhow::Error>(())
            })
        }
        Command::Import { roster, marks } => {
            let roster = import::load_roster(&roster)?;
            let store = match marks {
                Some(path) => import::load_marks(&path)?,
                None => InMemoryMarkStore::new(),
            };

            let rt = runtime()?;
            rt.block_on(async {
                let database = connect(&config).await?;
                database.upsert_roster(&roster).await?;
                let written = database.store_marks(&store).await?;
                tracing::info!(
                    "Imported {} students and {} marks",
                    roster.student_count(),
                    written
                );
                Ok::<_, anyhow::Error>(())
            })
        }
    }
}

fn run_report(config: &AppConfig, request: &ReportRequest, source: &SourceArgs) -> Result<()> {
    // Reject inverted ranges before touching any data source.
    let range = request.date_range()?;
    let policy = config.policy.attendance_policy();

    let (roster, store): (SchoolRoster, InMemoryMarkStore) = match &source.roster {
        Some(roster_path) => {
            let roster = import::load_roster(roster_path)?;
            let store = match &source.marks {
                Some(path) => import::load_marks(path)?,
                None => InMemoryMarkStore::new(),
            };
            (roster, store)
        }
        None => {
            let rt = runtime()?;
            rt.block_on(async {
                let database = connect(config).await?;
                let roster = database.fetch_roster().await?;
                let store = database.prefetch_marks(&range).await?;
                Ok::<_, anyhow::Error>((roster, store))
            })?
        }
    };

    let report = generate_report(request, &roster, &store, &SystemClock, &policy)?;
    print_json(&report)
}

async fn connect(config: &AppConfig) -> Result<Database> {
    let Some(url) = config.database.url.as_deref() else {
        bail!("DATABASE_URL must be set, or pass --roster to read CSV files");
    };
    tracing::info!("Connecting to database...");
    let database = Database::new(url).await?;
    tracing::info!("Database connected successfully");
    Ok(database)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

fn clock_arg(name: &str, value: &str) -> Result<chrono::NaiveTime> {
    parse_clock_time(value).with_context(|| format!("--{name} expects HH:MM, got '{value}'"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
