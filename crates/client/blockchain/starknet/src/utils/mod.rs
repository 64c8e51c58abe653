//! Utility functions for Starknet integration.

pub mod conversion;

pub use conversion::*;
