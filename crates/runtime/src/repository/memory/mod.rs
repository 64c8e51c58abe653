//! In-memory repository implementations for testing and development.

mod session;

pub use session::InMemoryGameIdStore;
