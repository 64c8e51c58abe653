//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration, workers, or infrastructure.

pub mod errors;
pub mod events;
pub mod handle;

pub use errors::{Result, RuntimeError};
pub use events::{MoveOutcome, MoveReport, SessionEvent, SessionSnapshot};
pub use handle::SessionHandle;
