//! Starknet integration for the hexed client.
//!
//! This crate connects the ledger abstraction to a Starknet node:
//! - JSON-RPC transport (`starknet_call`, receipts, nonces, invokes)
//! - Dojo deployment manifest loading (contract address, event selectors)
//! - Aggregate view decoding via the shared codec
//! - A development session account for validation-free devnets
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_starknet::{DevAccount, StarknetConfig, StarknetLedger};
//!
//! let config = StarknetConfig::from_env()?;
//! let ledger = StarknetLedger::new(config)?;
//! let account = DevAccount::new(player, ledger.game_contract(), ledger.rpc());
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod manifest;
pub mod rpc;
pub mod selectors;
pub mod utils;

pub use account::{DevAccount, multicall_calldata};
pub use client::StarknetLedger;
pub use config::{StarknetConfig, StarknetNetwork};
pub use error::{StarknetError, TXN_HASH_NOT_FOUND};
pub use manifest::DojoManifest;
pub use rpc::JsonRpcClient;
