use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::aggregator::{AttendancePolicy, CHRONIC_ABSENCE_THRESHOLD};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub policy: PolicyConfig,
    pub timetable: TimetableConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Only needed for the PostgreSQL-backed commands.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    pub chronic_absence_threshold: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            chronic_absence_threshold: CHRONIC_ABSENCE_THRESHOLD,
        }
    }
}

impl PolicyConfig {
    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            chronic_absence_threshold: self.chronic_absence_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimetableConfig {
    #[serde(deserialize_with = "clock_time")]
    pub day_start: NaiveTime,
    #[serde(deserialize_with = "clock_time")]
    pub day_end: NaiveTime,
    pub period_minutes: i64,
    #[serde(deserialize_with = "clock_time")]
    pub break_start: NaiveTime,
    pub break_minutes: i64,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).expect("08:00 is a valid time"),
            day_end: NaiveTime::from_hms_opt(14, 0, 0).expect("14:00 is a valid time"),
            period_minutes: 45,
            break_start: NaiveTime::from_hms_opt(10, 30, 0).expect("10:30 is a valid time"),
            break_minutes: 30,
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn clock_time<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_clock_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time '{raw}', expected HH:MM")))
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let database_url = std::env::var("DATABASE_URL").ok();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("school-attendance");

        let builder = Config::builder()
            // 1. Defaults
            .set_default("database.url", database_url)?
            .set_default(
                "policy.chronic_absence_threshold",
                CHRONIC_ABSENCE_THRESHOLD as i64,
            )?
            .set_default("timetable.day_start", "08:00")?
            .set_default("timetable.day_end", "14:00")?
            .set_default("timetable.period_minutes", 45)?
            .set_default("timetable.break_start", "10:30")?
            .set_default("timetable.break_minutes", 30)?
            // 2. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 3. User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 4. Environment variables (ATTENDANCE__POLICY__CHRONIC_ABSENCE_THRESHOLD=...)
            .add_source(Environment::with_prefix("ATTENDANCE").separator("__"));

        let s = builder.build().context("Failed to assemble configuration")?;
        s.try_deserialize().context("Invalid configuration")
    }
}
