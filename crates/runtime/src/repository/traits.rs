//! Repository contracts for data that must survive a restart.

use game_core::{Address, GameId};

use super::error::Result;

/// Persisted `{prefix}{address} -> game id` hints used to resume a session.
///
/// The ledger stays authoritative: a stored id is only a hint and is dropped
/// as soon as the ledger disagrees about its owner.
pub trait GameIdStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<GameId>>;

    fn save(&self, key: &str, game_id: GameId) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Storage key for `address` under `prefix`.
///
/// Addresses are normalized first so differently padded or cased spellings
/// of one account share a key.
pub fn session_key(prefix: &str, address: Address) -> String {
    format!("{prefix}{}", address.to_padded_hex())
}
