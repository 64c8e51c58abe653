//! Background workers driven by the runtime.
//!
//! The session worker is the only writer of session state; everything else
//! talks to it through [`Command`]s.
mod session;

pub use session::{Command, SessionChannels, SessionWorker};
