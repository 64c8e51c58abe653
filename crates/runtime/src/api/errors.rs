//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the session worker, the ledger and the session store
//! so clients can bubble them up with consistent context.

use client_blockchain_core::{ExecutorError, TransportError};
use game_core::{Address, Direction, GameId, HexCoord};
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no address connected")]
    NotConnected,

    #[error("no active game for the connected address")]
    NoActiveGame,

    #[error("game is over; reset before spawning again")]
    SessionDead,

    #[error("a game is already running")]
    AlreadySpawned,

    #[error("a move is already in flight")]
    AlreadyMoving,

    #[error("move cooldown has not cleared yet")]
    CannotMoveYet,

    #[error("moving {direction} from {from} leaves the world")]
    MoveOutOfBounds { from: HexCoord, direction: Direction },

    #[error("game {game_id} belongs to {owner}, not {connected}")]
    OwnershipMismatch {
        game_id: GameId,
        owner: Address,
        connected: Address,
    },

    #[error("spawn transaction succeeded without a spawn event for this address")]
    SpawnNotObserved,

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires a ledger to be configured before building")]
    MissingLedger,

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

impl RuntimeError {
    /// The action was rejected on-chain and had no effect.
    pub fn is_revert(&self) -> bool {
        matches!(self, RuntimeError::Executor(ExecutorError::Reverted { .. }))
    }

    /// The outcome is unknown; a fresh read is the only way to find out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RuntimeError::Executor(ExecutorError::Timeout { .. }))
    }
}
