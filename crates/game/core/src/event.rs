//! Typed events emitted by the game contract.
//!
//! Values of [`DomainEvent`] are only produced by the event codec from receipt
//! log records and are consumed once by the session director.

use crate::address::Address;
use crate::hex::{Direction, HexCoord};
use crate::player::{GameId, NeighborMask};

/// Closed set of ledger events the client understands.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DomainEvent {
    Spawned {
        game_id: GameId,
        player: Address,
        position: HexCoord,
    },
    Moved {
        game_id: GameId,
        direction: Direction,
        position: HexCoord,
    },
    /// A move into an occupied cell resolved as combat. Keyed by the attacker.
    CombatResult(CombatReport),
    NeighborsRevealed {
        game_id: GameId,
        position: HexCoord,
        mask: NeighborMask,
    },
    EncounterOccurred {
        game_id: GameId,
        is_gift: bool,
        /// Contract-defined outcome code; opaque to the client.
        outcome: u8,
        hp_after: u32,
        max_hp_after: u32,
        xp_after: u32,
        died: bool,
    },
    PlayerDied {
        game_id: GameId,
        /// `None` when the death was not caused by another player.
        killed_by: Option<GameId>,
        position: HexCoord,
    },
    HighestScoreUpdated {
        player: Address,
        username: String,
        xp: u32,
    },
    /// Selector not in the schema table, or a malformed record.
    Unknown,
}

/// Payload of [`DomainEvent::CombatResult`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatReport {
    pub attacker_game_id: GameId,
    pub defender_game_id: GameId,
    pub attacker_won: bool,
    pub attacker_position: HexCoord,
    pub defender_position: HexCoord,
    pub damage_dealt: u32,
    pub retaliation_damage: u32,
    pub xp_awarded: u32,
    pub hp_reward: u32,
    pub attacker_died: bool,
    pub defender_died: bool,
}

impl CombatReport {
    /// Whether `game_id` took part in this fight, and as which side.
    pub fn side_of(&self, game_id: GameId) -> Option<CombatSide> {
        if self.attacker_game_id == game_id {
            Some(CombatSide::Attacker)
        } else if self.defender_game_id == game_id {
            Some(CombatSide::Defender)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatSide {
    Attacker,
    Defender,
}

impl DomainEvent {
    /// The game id the event is keyed by, when it has one.
    pub fn game_id(&self) -> Option<GameId> {
        match self {
            DomainEvent::Spawned { game_id, .. }
            | DomainEvent::Moved { game_id, .. }
            | DomainEvent::NeighborsRevealed { game_id, .. }
            | DomainEvent::EncounterOccurred { game_id, .. }
            | DomainEvent::PlayerDied { game_id, .. } => Some(*game_id),
            DomainEvent::CombatResult(report) => Some(report.attacker_game_id),
            DomainEvent::HighestScoreUpdated { .. } | DomainEvent::Unknown => None,
        }
    }

    /// Whether the event concerns `game_id` in any role.
    pub fn involves(&self, game_id: GameId) -> bool {
        match self {
            DomainEvent::CombatResult(report) => report.side_of(game_id).is_some(),
            other => other.game_id() == Some(game_id),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DomainEvent::Unknown)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DomainEvent::Spawned { .. } => "Spawned",
            DomainEvent::Moved { .. } => "Moved",
            DomainEvent::CombatResult(_) => "CombatResult",
            DomainEvent::NeighborsRevealed { .. } => "NeighborsRevealed",
            DomainEvent::EncounterOccurred { .. } => "EncounterOccurred",
            DomainEvent::PlayerDied { .. } => "PlayerDied",
            DomainEvent::HighestScoreUpdated { .. } => "HighestScoreUpdated",
            DomainEvent::Unknown => "Unknown",
        }
    }
}
