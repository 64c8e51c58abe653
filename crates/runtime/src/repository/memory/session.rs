//! In-memory GameIdStore implementation for tests and local runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use game_core::GameId;

use crate::repository::{GameIdStore, RepositoryError, Result};

/// In-memory implementation of GameIdStore.
///
/// Lost on exit, so every run starts without a resumable session.
#[derive(Default)]
pub struct InMemoryGameIdStore {
    entries: RwLock<BTreeMap<String, GameId>>,
}

impl InMemoryGameIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameIdStore for InMemoryGameIdStore {
    fn load(&self, key: &str) -> Result<Option<GameId>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(entries.get(key).copied())
    }

    fn save(&self, key: &str, game_id: GameId) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        entries.insert(key.to_string(), game_id);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_remove() {
        let store = InMemoryGameIdStore::new();
        assert_eq!(store.load("hexed_game_id_0x1").unwrap(), None);

        store.save("hexed_game_id_0x1", GameId(4)).unwrap();
        store.save("hexed_game_id_0x1", GameId(5)).unwrap();
        assert_eq!(store.load("hexed_game_id_0x1").unwrap(), Some(GameId(5)));
        assert_eq!(store.load("hexed_game_id_0x2").unwrap(), None);

        store.remove("hexed_game_id_0x1").unwrap();
        store.remove("hexed_game_id_0x1").unwrap();
        assert_eq!(store.load("hexed_game_id_0x1").unwrap(), None);
    }
}
