// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::LocalStorage;
use anyhow::{Error, Result};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_academic_year() -> i32 {
    // January and February still belong to the school year that began last March.
    let today = Local::now().date_naive();
    if today.month() < 3 {
        today.year() - 1
    } else {
        today.year()
    }
}

fn default_school_name() -> String {
    "School".to_string()
}

fn default_document_deadline_days() -> i64 {
    5
}

fn default_event_cache_minutes() -> i64 {
    30
}

fn default_roster_cache_days() -> i64 {
    7
}

fn default_first_notice() -> u32 {
    30
}
fn default_second_notice() -> u32 {
    40
}
fn default_home_notice() -> u32 {
    45
}
fn default_third_notice() -> u32 {
    50
}
fn default_consecutive_limit() -> u32 {
    7
}

fn default_domestic_total() -> usize {
    10
}
fn default_domestic_consecutive() -> u32 {
    5
}
fn default_international_total() -> usize {
    10
}

fn default_menstrual_absences() -> usize {
    1
}
fn default_menstrual_partials() -> usize {
    3
}

/// Cumulative and consecutive absence thresholds (instructional days).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LongAbsenceLimits {
    #[serde(default = "default_first_notice")]
    pub first_notice: u32,
    #[serde(default = "default_second_notice")]
    pub second_notice: u32,
    #[serde(default = "default_home_notice")]
    pub home_notice: u32,
    #[serde(default = "default_third_notice")]
    pub third_notice: u32,
    #[serde(default = "default_consecutive_limit")]
    pub consecutive_limit: u32,
}

impl Default for LongAbsenceLimits {
    fn default() -> Self {
        Self {
            first_notice: 30,
            second_notice: 40,
            home_notice: 45,
            third_notice: 50,
            consecutive_limit: 7,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldTripLimits {
    #[serde(default = "default_domestic_total")]
    pub domestic_total: usize,
    #[serde(default = "default_domestic_consecutive")]
    pub domestic_consecutive: u32,
    #[serde(default = "default_international_total")]
    pub international_total: usize,
}

impl Default for FieldTripLimits {
    fn default() -> Self {
        Self {
            domestic_total: 10,
            domestic_consecutive: 5,
            international_total: 10,
        }
    }
}

/// Monthly allowance for menstrual leave.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MenstrualLimits {
    #[serde(default = "default_menstrual_absences")]
    pub absences_per_month: usize,
    /// Late arrivals, early leaves and partial absences combined.
    #[serde(default = "default_menstrual_partials")]
    pub partials_per_month: usize,
}

impl Default for MenstrualLimits {
    fn default() -> Self {
        Self {
            absences_per_month: 1,
            partials_per_month: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_academic_year")]
    pub academic_year: i32,
    #[serde(default = "default_school_name")]
    pub school_name: String,
    /// Extra directories searched for `holidays_<year>.json`, before the data dir.
    #[serde(default)]
    pub holiday_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub long_absence: LongAbsenceLimits,
    #[serde(default)]
    pub field_trip: FieldTripLimits,
    #[serde(default)]
    pub menstrual: MenstrualLimits,

    #[serde(default = "default_document_deadline_days")]
    pub document_deadline_days: i64,

    #[serde(default)]
    pub notifications: bool,

    #[serde(default = "default_event_cache_minutes")]
    pub event_cache_minutes: i64,
    #[serde(default = "default_roster_cache_days")]
    pub roster_cache_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            academic_year: default_academic_year(),
            school_name: default_school_name(),
            holiday_dirs: Vec::new(),
            long_absence: LongAbsenceLimits::default(),
            field_trip: FieldTripLimits::default(),
            menstrual: MenstrualLimits::default(),
            document_deadline_days: 5,
            notifications: false,
            event_cache_minutes: 30,
            roster_cache_days: 7,
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    /// Parse and IO errors are still reported.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        match Self::load(ctx) {
            Ok(cfg) => Ok(cfg),
            Err(e) if Self::is_missing_config_error(&e) => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Helper to detect whether an anyhow::Error indicates that the config file was missing.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        LocalStorage::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            LocalStorage::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn event_cache_max_age(&self) -> Option<chrono::Duration> {
        (self.event_cache_minutes > 0).then(|| chrono::Duration::minutes(self.event_cache_minutes))
    }

    pub fn roster_cache_max_age(&self) -> Option<chrono::Duration> {
        (self.roster_cache_days > 0).then(|| chrono::Duration::days(self.roster_cache_days))
    }
}
