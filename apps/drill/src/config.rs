//! Environment-driven configuration.

use crate::error::{DrillError, Result};
use dotenvy::dotenv;
use lesson_core::{LessonSettings, Thresholds};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub lesson_path: PathBuf,
    pub db_path: PathBuf,
    pub tts_command: Option<String>,
    pub default_voice: String,
    pub shuffle: bool,
    pub settings: LessonSettings,
    pub rust_log: String,
}

impl Config {
    /// Read `.env`, the process environment and the first CLI argument.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_source(env::args().nth(1), |name| env::var(name).ok())
    }

    /// Build a config from an optional lesson argument and a variable lookup.
    pub fn from_source<F>(lesson_arg: Option<String>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lesson_path = lesson_arg
            .or_else(|| var("DRILL_LESSON"))
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(DrillError::MissingLesson)?;

        let db_path = var("DRILL_DB")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let tts_command = var("DRILL_TTS").filter(|c| !c.trim().is_empty());
        let default_voice = var("DRILL_VOICE").unwrap_or_else(|| "en-US".to_string());

        let shuffle = match var("DRILL_SHUFFLE") {
            Some(value) => parse_flag("DRILL_SHUFFLE", &value)?,
            None => false,
        };

        let defaults = LessonSettings::default();
        let settings = LessonSettings {
            first_try_points: parse_or("DRILL_FIRST_TRY_POINTS", &var, defaults.first_try_points)?,
            retry_points: parse_or("DRILL_RETRY_POINTS", &var, defaults.retry_points)?,
            thresholds: Thresholds {
                close: parse_percent("DRILL_CLOSE_THRESHOLD", &var, defaults.thresholds.close)?,
                needs_work: parse_percent(
                    "DRILL_NEEDS_WORK_THRESHOLD",
                    &var,
                    defaults.thresholds.needs_work,
                )?,
            },
        };

        let rust_log = var("RUST_LOG").unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            lesson_path,
            db_path,
            tts_command,
            default_voice,
            shuffle,
            settings,
            rust_log,
        })
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("english-drills")
        .join("progress.db")
}

fn parse_or<T, F>(name: &'static str, var: &F, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| DrillError::InvalidConfig { name, value }),
        None => Ok(default),
    }
}

fn parse_percent<F>(name: &'static str, var: &F, default: u8) -> Result<u8>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(name, var, default)?;
    if value > 100 {
        return Err(DrillError::InvalidConfig {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DrillError::InvalidConfig {
            name,
            value: value.to_string(),
        }),
    }
}
