//! Session state machine and its reconciliation helpers.
//!
//! - [`director`] owns the canonical [`game_core::PlayerState`]
//! - [`optimistic`] tracks the predicted position of an in-flight move
//! - [`reconcile`] turns successive ledger reads into [`Occurrence`]s

pub mod director;
pub mod optimistic;
pub mod reconcile;

pub use director::{MoveResolution, MoveTicket, SessionDirector};
pub use optimistic::{Observation, OptimisticMoveController, PendingMove};
pub use reconcile::{Occurrence, Reconciler, Snapshot, classify};
