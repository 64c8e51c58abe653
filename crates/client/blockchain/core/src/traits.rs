//! Ledger abstraction traits.
//!
//! This module defines a layered ledger abstraction:
//! - Layer 0: LedgerReader (views and receipts)
//! - Layer 1: SessionAccount (signs and submits call batches)
//! - Layer 2: GameLedger (composite, what the runtime is wired against)

use async_trait::async_trait;
use game_core::{Address, GameId};

use crate::types::{
    BlockTag, HighestScore, LedgerCall, OnChainGameState, Receipt, TransactionHash,
};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Backend-specific error: {0}")]
    BackendError(String),
}

// ============================================================================
// Layer 0: Reads
// ============================================================================

/// Read-only access to contract views and transaction receipts.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Single aggregate read of one game session. `None` for unknown ids.
    async fn get_game_state(
        &self,
        game_id: GameId,
        tag: BlockTag,
    ) -> Result<Option<OnChainGameState>, TransportError>;

    /// Current leaderboard top entry, if anyone has registered a score.
    async fn get_highest_score(&self, tag: BlockTag) -> Result<Option<HighestScore>, TransportError>;

    /// Receipt of a submitted transaction. `None` while the node does not know it yet.
    async fn get_receipt(&self, hash: &TransactionHash) -> Result<Option<Receipt>, TransportError>;
}

// ============================================================================
// Layer 1: Writes
// ============================================================================

/// A signing session able to submit call batches on behalf of one account.
#[async_trait]
pub trait SessionAccount: Send + Sync {
    /// Account the session signs for.
    fn address(&self) -> Address;

    /// Submits `calls` as one transaction.
    async fn execute(&self, calls: &[LedgerCall]) -> Result<TransactionHash, TransportError>;
}

// ============================================================================
// Layer 2: Composite Trait
// ============================================================================

/// Everything the session runtime needs from a ledger backend.
pub trait GameLedger: LedgerReader + Send + Sync {
    /// Backend name (e.g., "Starknet", "Mock").
    fn name(&self) -> &str;

    /// Network name (e.g., "katana", "sepolia").
    fn network(&self) -> &str;
}
