// File: ./src/analysis/checklist.rs
//! Evidence checklist: one row per episode that may need paperwork, and the
//! persisted map of what has already been handed in.

use crate::calendar::HolidayCalendar;
use crate::context::AppContext;
use crate::grouper::EpisodeGrouper;
use crate::model::{AttendanceEvent, Episode};
use crate::storage::LocalStorage;
use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// `<name>_<MM.DD>`, the key under which a submission is recorded.
pub fn submission_key(name: &str, start: &str) -> String {
    format!("{}_{}", name.trim(), start.trim())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%m.%d").to_string()
}

/// `3.2`, `03/02` or `2026-03-02` -> `"03.02"`.
pub fn normalize_date_key(text: &str) -> Result<String> {
    let parts: Vec<&str> = text
        .trim()
        .split(['.', '/', '-'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let numbers: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    if parts.len() < 2 || parts.len() > 3 || numbers.len() != parts.len() {
        bail!("Invalid date '{}', expected MM.DD", text);
    }
    let (month, day) = (numbers[numbers.len() - 2], numbers[numbers.len() - 1]);
    // 2000 is a leap year, so 02.29 is accepted.
    if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
        bail!("Invalid date '{}', expected MM.DD", text);
    }
    Ok(format!("{:02}.{:02}", month, day))
}

#[derive(Debug)]
pub struct ChecklistStore {
    path: PathBuf,
    processed_dir: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl ChecklistStore {
    pub fn open(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx
            .get_checklist_status_path()
            .ok_or_else(|| anyhow::anyhow!("No data directory for the checklist"))?;
        let processed_dir = ctx
            .get_processed_updates_dir()
            .ok_or_else(|| anyhow::anyhow!("No data directory for processed updates"))?;
        Self::at(path, processed_dir)
    }

    pub fn at(path: PathBuf, processed_dir: PathBuf) -> Result<Self> {
        let entries = LocalStorage::read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            processed_dir,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().filter(|v| **v).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_submitted(&self, name: &str, start: &str) -> bool {
        let start = normalize_date_key(start).unwrap_or_else(|_| start.trim().to_string());
        self.entries
            .get(&submission_key(name, &start))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_episode_submitted(&self, episode: &Episode) -> bool {
        self.is_submitted(&episode.student_name, &date_key(episode.start_date))
    }

    /// Records the episode of `name` starting on `start` (`M.D` or `MM.DD`).
    /// Returns the stored key.
    pub fn mark_submitted(&mut self, name: &str, start: &str) -> Result<String> {
        let key = submission_key(name, &normalize_date_key(start)?);
        self.update(|entries| {
            entries.insert(key.clone(), true);
            1
        })?;
        log::info!("Marked {} as submitted", key);
        Ok(key)
    }

    /// Re-reads the file under the lock, applies `f` and writes the result
    /// back, so concurrent writers do not lose each other's entries.
    fn update<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnOnce(&mut BTreeMap<String, bool>) -> usize,
    {
        let path = self.path.clone();
        let (changed, merged) = LocalStorage::with_lock(&path, || {
            let mut on_disk: BTreeMap<String, bool> = if path.exists() {
                let content = fs::read_to_string(&path)?;
                if content.trim().is_empty() {
                    BTreeMap::new()
                } else {
                    serde_json::from_str(&content)
                        .with_context(|| format!("Corrupt checklist file {:?}", path))?
                }
            } else {
                BTreeMap::new()
            };
            let changed = f(&mut on_disk);
            if changed > 0 {
                LocalStorage::atomic_write(&path, serde_json::to_string_pretty(&on_disk)?)?;
            }
            Ok((changed, on_disk))
        })?;
        self.entries = merged;
        Ok(changed)
    }

    /// Merges `true` entries of an update file that are not recorded yet,
    /// then moves the file into the processed-updates folder.
    /// Returns the number of new entries.
    pub fn merge_update(&mut self, update_path: &Path) -> Result<usize> {
        let content = fs::read_to_string(update_path)
            .with_context(|| format!("Failed to read update '{}'", update_path.display()))?;
        let update: BTreeMap<String, bool> = serde_json::from_str(&content)
            .with_context(|| format!("'{}' is not a checklist map", update_path.display()))?;

        let added = self.update(|entries| {
            let mut added = 0;
            for (key, done) in update {
                if done && !entries.get(&key).copied().unwrap_or(false) {
                    entries.insert(key, true);
                    added += 1;
                }
            }
            added
        })?;

        let archived = self.archive_update(update_path)?;
        log::info!(
            "Merged {} new checklist entries, update archived to {:?}",
            added,
            archived
        );
        Ok(added)
    }

    fn archive_update(&self, update_path: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.processed_dir)
            .with_context(|| format!("Failed to create {:?}", self.processed_dir))?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut target = self.processed_dir.join(format!("processed_{}.json", stamp));
        let mut n = 1;
        while target.exists() {
            target = self
                .processed_dir
                .join(format!("processed_{}_{}.json", stamp, n));
            n += 1;
        }
        if fs::rename(update_path, &target).is_err() {
            // Different filesystem.
            fs::copy(update_path, &target)?;
            fs::remove_file(update_path)?;
        }
        Ok(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistRow {
    pub index: usize,
    pub number: Option<u32>,
    pub name: String,
    pub category: String,
    pub period: String,
    pub annotation: String,
    pub key: String,
    pub done: bool,
}

/// Rows for episodes starting in `month`, ordered by start date then number.
pub fn build_checklist(
    calendar: &HolidayCalendar,
    events: &[AttendanceEvent],
    month: u32,
    store: &ChecklistStore,
) -> Vec<ChecklistRow> {
    let in_month: Vec<AttendanceEvent> = events
        .iter()
        .filter(|e| e.date.month() == month)
        .cloned()
        .collect();

    let mut episodes = EpisodeGrouper::new(calendar).group(&in_month);
    episodes.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then(a.student_id.cmp(&b.student_id))
            .then(a.student_name.cmp(&b.student_name))
    });

    episodes
        .into_iter()
        .enumerate()
        .map(|(i, ep)| {
            let key = submission_key(&ep.student_name, &date_key(ep.start_date));
            ChecklistRow {
                index: i + 1,
                number: ep.student_id,
                done: store.is_episode_submitted(&ep),
                period: ep.period_label(),
                name: ep.student_name,
                category: ep.category,
                annotation: ep.annotation,
                key,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        assert_eq!(submission_key(" 김철수 ", "03.02"), "김철수_03.02");
        let d = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(date_key(d), "03.02");
    }

    #[test]
    fn date_keys_are_zero_padded() {
        assert_eq!(normalize_date_key("3.2").unwrap(), "03.02");
        assert_eq!(normalize_date_key(" 03.02 ").unwrap(), "03.02");
        assert_eq!(normalize_date_key("3/2").unwrap(), "03.02");
        assert_eq!(normalize_date_key("2026-03-02").unwrap(), "03.02");
        assert_eq!(normalize_date_key("2.29").unwrap(), "02.29");
        assert!(normalize_date_key("13.01").is_err());
        assert!(normalize_date_key("3.32").is_err());
        assert!(normalize_date_key("yesterday").is_err());
        assert!(normalize_date_key("3").is_err());
    }
}
