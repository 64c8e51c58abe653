//! Repository layer for data that outlives one process.
//!
//! The ledger is the source of truth for everything about a game. The only
//! thing the client keeps locally is which game id each connected address
//! last played, so a reload can resume without a fresh spawn.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileGameIdStore;
pub use memory::InMemoryGameIdStore;
pub use traits::{GameIdStore, session_key};
