//! File-based GameIdStore implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use game_core::GameId;

use crate::repository::{GameIdStore, RepositoryError, Result};

const SESSIONS_FILE: &str = "sessions.json";

/// File-based implementation of GameIdStore.
///
/// All hints live in one `sessions.json` object mapping keys to game ids.
/// Every write rewrites the whole file through a temp file and an atomic
/// rename, so a crash leaves either the old or the new map on disk.
pub struct FileGameIdStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileGameIdStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir).map_err(RepositoryError::Io)?;
        Ok(Self {
            path: base_dir.join(SESSIONS_FILE),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, GameId>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(&self.path).map_err(RepositoryError::Io)?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, u32> = serde_json::from_str(&json)
            .map_err(|e| RepositoryError::CorruptedData(format!("{}: {e}", self.path.display())))?;
        Ok(raw.into_iter().map(|(k, v)| (k, GameId(v))).collect())
    }

    fn write_map(&self, map: &BTreeMap<String, GameId>) -> Result<()> {
        let raw: BTreeMap<&str, u32> = map.iter().map(|(k, v)| (k.as_str(), v.0)).collect();
        let json =
            serde_json::to_string_pretty(&raw).map_err(|e| RepositoryError::Json(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(RepositoryError::Io)?;
        fs::rename(&temp_path, &self.path).map_err(RepositoryError::Io)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, GameId>)) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl GameIdStore for FileGameIdStore {
    fn load(&self, key: &str) -> Result<Option<GameId>> {
        Ok(self.read_map()?.get(key).copied())
    }

    fn save(&self, key: &str, game_id: GameId) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), game_id);
        })?;
        tracing::debug!(key, %game_id, "Saved session hint to {}", self.path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.load(key)?.is_none() {
            return Ok(());
        }
        self.update(|map| {
            map.remove(key);
        })?;
        tracing::debug!(key, "Removed session hint");
        Ok(())
    }
}
