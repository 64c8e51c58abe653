//! Error types for Starknet operations.

use client_blockchain_core::TransportError;
use thiserror::Error;

/// JSON-RPC code for an unknown transaction hash.
pub const TXN_HASH_NOT_FOUND: i64 = 29;

/// Errors that can occur while talking to a Starknet node.
#[derive(Debug, Error)]
pub enum StarknetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StarknetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StarknetError::Rpc { code, .. } if *code == TXN_HASH_NOT_FOUND)
    }
}

impl From<StarknetError> for TransportError {
    fn from(err: StarknetError) -> Self {
        match err {
            StarknetError::Http(e) => TransportError::NetworkError(e.to_string()),
            StarknetError::Rpc { code, message } => TransportError::RpcError { code, message },
            StarknetError::MalformedResponse(msg) => TransportError::SerializationError(msg),
            StarknetError::Manifest(msg) | StarknetError::InvalidConfig(msg) => {
                TransportError::ConfigError(msg)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StarknetError>;
