//! Shared value types for the hexed client.
//!
//! `game-core` holds the coordinate model, the local player record and the
//! typed ledger events. Nothing in here performs I/O; the runtime and the
//! blockchain adapters depend on the types re-exported here.
pub mod address;
pub mod config;
pub mod event;
pub mod hex;
pub mod player;

pub use address::{Address, AddressError};
pub use config::{GameConfig, WorldBounds};
pub use event::{CombatReport, CombatSide, DomainEvent};
pub use hex::{Direction, FractionalHex, HexCoord, HexLayout, InvalidDirection};
pub use player::{GameId, NeighborMask, PlayerState, SessionStatus};
