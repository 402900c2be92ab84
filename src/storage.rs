// Locked, atomic file IO shared by every on-disk store.
//
// Holiday files, the event cache, the checklist status map and the config
// all go through `with_lock` + `atomic_write` so that two processes (the CLI
// and a scheduled job, say) never observe a half-written JSON file.
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub struct LocalStorage;

impl LocalStorage {
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive advisory lock on `<file>.lock`.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Reads and deserializes a JSON file under its lock.
    /// A missing file yields `Ok(None)`.
    pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::with_lock(path, || {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            let value = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse '{}'", path.display()))?;
            Ok(Some(value))
        })
    }

    /// Serializes `value` as pretty JSON and writes it atomically under the lock.
    pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        Self::with_lock(path, || {
            let json = serde_json::to_string_pretty(value)?;
            Self::atomic_write(path, json)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn lock_path_appends_suffix() {
        let p = LocalStorage::get_lock_path(Path::new("/tmp/a/status.json"));
        assert_eq!(p, PathBuf::from("/tmp/a/status.json.lock"));

        let p = LocalStorage::get_lock_path(Path::new("/tmp/a/status"));
        assert_eq!(p, PathBuf::from("/tmp/a/status.lock"));
    }

    #[test]
    fn json_round_trip_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("attendo_storage_{}", uuid::Uuid::new_v4()));
        let path = root.join("nested").join("map.json");

        let mut map = BTreeMap::new();
        map.insert("kim_03.02".to_string(), true);
        LocalStorage::write_json(&path, &map).unwrap();

        let loaded: Option<BTreeMap<String, bool>> = LocalStorage::read_json(&path).unwrap();
        assert_eq!(loaded, Some(map));

        let missing: Option<BTreeMap<String, bool>> =
            LocalStorage::read_json(&root.join("nope.json")).unwrap();
        assert!(missing.is_none());

        let _ = fs::remove_dir_all(&root);
    }
}
