//! Common types for ledger interactions.

use std::fmt;

use game_core::{Address, Direction, GameId, HexCoord, NeighborMask};
use serde::{Deserialize, Serialize};

use crate::word::Word;

/// Identifier of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(pub Word);

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which view of the chain a read observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BlockTag {
    /// Includes provisionally accepted transactions.
    #[default]
    PreConfirmed,
    Latest,
}

/// How far a transaction has travelled towards finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FinalityStatus {
    /// Known to the sequencer but not yet executed.
    Received,
    /// Executed in the pending block.
    PreConfirmed,
    AcceptedOnL2,
    AcceptedOnL1,
}

impl FinalityStatus {
    /// Enough for speculative reads.
    pub fn is_provisional(self) -> bool {
        self >= FinalityStatus::PreConfirmed
    }

    pub fn is_confirmed(self) -> bool {
        self >= FinalityStatus::AcceptedOnL2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Succeeded,
    Reverted { reason: String },
}

/// One opaque log record from a receipt.
///
/// `keys[0]` is the world's emit marker and `keys[1]` the event selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    pub keys: Vec<Word>,
    pub data: Vec<Word>,
}

impl LogRecord {
    pub fn selector(&self) -> Option<Word> {
        self.keys.get(1).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TransactionHash,
    pub finality: FinalityStatus,
    pub execution: ExecutionStatus,
    pub events: Vec<LogRecord>,
}

impl Receipt {
    pub fn is_reverted(&self) -> bool {
        matches!(self.execution, ExecutionStatus::Reverted { .. })
    }
}

/// Lifecycle of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TransactionPhase {
    Submitted,
    Provisional,
    Confirmed,
    Reverted,
}

impl TransactionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionPhase::Confirmed | TransactionPhase::Reverted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHandle {
    pub hash: TransactionHash,
    pub phase: TransactionPhase,
}

impl TransactionHandle {
    pub fn submitted(hash: TransactionHash) -> Self {
        Self {
            hash,
            phase: TransactionPhase::Submitted,
        }
    }

    /// Moves forward; terminal phases never change.
    pub fn advance(&mut self, phase: TransactionPhase) {
        if !self.phase.is_terminal() {
            self.phase = phase;
        }
    }
}

/// One contract entrypoint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Spawn,
    Move {
        game_id: GameId,
        direction: Direction,
    },
    RegisterScore {
        player: Address,
        username: Word,
        xp: u32,
    },
}

impl LedgerCall {
    pub fn entrypoint(&self) -> &'static str {
        match self {
            LedgerCall::Spawn => "spawn",
            LedgerCall::Move { .. } => "move",
            LedgerCall::RegisterScore { .. } => "register_score",
        }
    }

    /// Serialized arguments, in declaration order.
    pub fn calldata(&self) -> Vec<Word> {
        match self {
            LedgerCall::Spawn => Vec::new(),
            LedgerCall::Move { game_id, direction } => {
                vec![Word::from(game_id.0), Word::from(direction.index())]
            }
            LedgerCall::RegisterScore {
                player,
                username,
                xp,
            } => vec![Word::from(*player), *username, Word::from(*xp)],
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, LedgerCall::Move { .. })
    }
}

/// Result of the aggregate `get_game_state` view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainGameState {
    pub game_id: GameId,
    pub player: Address,
    pub position: HexCoord,
    pub last_direction: Option<Direction>,
    pub can_move: bool,
    pub is_active: bool,
    pub hp: u32,
    pub max_hp: u32,
    pub xp: u32,
    pub neighbor_occupancy: NeighborMask,
}

impl OnChainGameState {
    /// The contract deactivates a session when its hp reaches zero.
    pub fn is_dead(&self) -> bool {
        !self.is_active && self.hp == 0
    }
}

/// Result of `get_highest_score`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighestScore {
    pub player: Address,
    pub username: Word,
    pub xp: u32,
}

impl HighestScore {
    /// Decoded username; zero or non-ASCII payloads fall back to the address.
    pub fn display_name(&self) -> String {
        match self.username.to_short_string() {
            Some(name) if !name.is_empty() => name,
            _ => self.player.to_short_hex(),
        }
    }
}

/// Blockchain-specific configuration.
///
/// This is a trait to allow different ledgers to provide their own config types.
pub trait BlockchainConfig: Send + Sync {
    /// Human-readable network name (e.g., "katana", "sepolia")
    fn network_name(&self) -> &str;

    /// RPC endpoint URL
    fn rpc_url(&self) -> &str;

    /// Validate configuration (e.g., addresses present, URL well-formed)
    fn validate(&self) -> Result<(), String>;
}
