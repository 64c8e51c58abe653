//! Session runtime for the hexed client.
//!
//! This crate keeps a local player record synchronized with the game contract.
//! Consumers embed [`Runtime`] and talk to it through [`SessionHandle`]: moves
//! are shown optimistically, settled by the ledger's receipt, and reconciled
//! against periodic reads that surface what other players did.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`session`] holds the state machine and reconciliation logic
//! - [`repository`] persists which game each address last played
//! - `workers` keeps the background task internal to the crate
pub mod api;
pub mod repository;
pub mod runtime;
pub mod session;

mod workers;

pub use api::{
    MoveOutcome, MoveReport, Result, RuntimeError, SessionEvent, SessionHandle, SessionSnapshot,
};
pub use repository::{
    FileGameIdStore, GameIdStore, InMemoryGameIdStore, RepositoryError, session_key,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use session::{Occurrence, OptimisticMoveController, Reconciler, SessionDirector};
