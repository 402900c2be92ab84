// Caching of imported attendance data.
//
// ⚠️ VERSION BUMP REQUIRED:
// Changes to AttendanceEvent (or the Roster shape) require incrementing
// CACHE_VERSION below to invalidate stale caches.
use crate::context::AppContext;
use crate::model::{AttendanceEvent, Roster};
use crate::storage::LocalStorage;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Increment this whenever AttendanceEvent changes to invalidate old caches
const CACHE_VERSION: u32 = 2;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Cached<T> {
    // If this field is missing in the JSON (old cache), it defaults to 0.
    #[serde(default)]
    version: u32,
    pub saved_at: DateTime<Utc>,
    pub data: T,
}

impl<T> Cached<T> {
    fn new(data: T) -> Self {
        Self {
            version: CACHE_VERSION,
            saved_at: Utc::now(),
            data,
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.saved_at
    }

    /// `None` means the entry never expires.
    pub fn is_fresh(&self, max_age: Option<Duration>) -> bool {
        max_age.is_none_or(|max| self.age() < max)
    }
}

pub struct EventCache;

impl EventCache {
    fn month_path(ctx: &dyn AppContext, year: i32, month: u32) -> Result<PathBuf> {
        Ok(ctx
            .get_cache_dir()?
            .join(format!("events_{}_{:02}.json", year, month)))
    }

    fn roster_path(ctx: &dyn AppContext) -> Result<PathBuf> {
        Ok(ctx.get_cache_dir()?.join("roster.json"))
    }

    fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Option<Cached<T>> {
        // Version mismatch or any parsing error reads as a miss.
        match LocalStorage::read_json::<Cached<T>>(path) {
            Ok(Some(c)) if c.version == CACHE_VERSION => Some(c),
            Ok(Some(_)) => {
                log::info!("Discarding cache {:?}: version changed", path);
                None
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Discarding unreadable cache {:?}: {:#}", path, e);
                None
            }
        }
    }

    /// `year` is the calendar year of `month`.
    pub fn save_month(
        ctx: &dyn AppContext,
        year: i32,
        month: u32,
        events: &[AttendanceEvent],
    ) -> Result<()> {
        let path = Self::month_path(ctx, year, month)?;
        LocalStorage::write_json(&path, &Cached::new(events.to_vec()))
    }

    pub fn load_month(
        ctx: &dyn AppContext,
        year: i32,
        month: u32,
    ) -> Result<Option<Cached<Vec<AttendanceEvent>>>> {
        let path = Self::month_path(ctx, year, month)?;
        Ok(Self::load(&path))
    }

    /// Fresh events for the month, or `None` when missing or expired.
    pub fn load_month_fresh(
        ctx: &dyn AppContext,
        year: i32,
        month: u32,
        max_age: Option<Duration>,
    ) -> Result<Option<Vec<AttendanceEvent>>> {
        Ok(Self::load_month(ctx, year, month)?
            .filter(|c| c.is_fresh(max_age))
            .map(|c| c.data))
    }

    pub fn save_roster(ctx: &dyn AppContext, roster: &Roster) -> Result<()> {
        let path = Self::roster_path(ctx)?;
        LocalStorage::write_json(&path, &Cached::new(roster.clone()))
    }

    pub fn load_roster(ctx: &dyn AppContext) -> Result<Option<Cached<Roster>>> {
        let path = Self::roster_path(ctx)?;
        Ok(Self::load(&path))
    }
}
