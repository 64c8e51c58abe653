//! Local view of the player's on-ledger session.

use core::fmt;

use bitflags::bitflags;

use crate::hex::{Direction, HexCoord};

/// Ledger-assigned identifier of one spawned life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GameId(pub u32);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Neighbouring cells that hold another live player.
    ///
    /// Bit `d` corresponds to [`Direction`] index `d`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct NeighborMask: u8 {
        const EAST       = 1 << 0;
        const NORTH_EAST = 1 << 1;
        const NORTH_WEST = 1 << 2;
        const WEST       = 1 << 3;
        const SOUTH_WEST = 1 << 4;
        const SOUTH_EAST = 1 << 5;
    }
}

impl NeighborMask {
    pub const fn for_direction(direction: Direction) -> Self {
        Self::from_bits_truncate(1 << direction.index())
    }

    pub fn is_occupied(self, direction: Direction) -> bool {
        self.contains(Self::for_direction(direction))
    }

    pub fn occupied_directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.is_occupied(*direction))
    }
}

/// Session lifecycle as seen by the client.
///
/// `Disconnected -> Initializing -> {NoActiveGame | Active} -> Dead -> (reset) -> NoActiveGame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Initializing,
    NoActiveGame,
    Active,
    Dead,
}

/// Canonical local copy of the player's ledger state plus the optimistic overlay.
///
/// When `is_spawned` is false every other field except `game_id` is meaningless.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerState {
    pub game_id: Option<GameId>,
    pub position: HexCoord,
    /// Predicted position of an in-flight move. Shown instead of `position`.
    pub optimistic_position: Option<HexCoord>,
    pub hp: u32,
    pub max_hp: u32,
    pub xp: u32,
    /// Cooldown gate; cleared right after a move until the ledger reopens it.
    pub can_move: bool,
    pub last_direction: Option<Direction>,
    pub occupied_neighbors: NeighborMask,
    pub is_spawned: bool,
    /// Implies `is_spawned` and `hp == 0`.
    pub is_dead: bool,
}

impl PlayerState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Position to display: the optimistic override if one is live.
    pub fn effective_position(&self) -> Option<HexCoord> {
        self.is_spawned
            .then(|| self.optimistic_position.unwrap_or(self.position))
    }

    pub fn is_alive(&self) -> bool {
        self.is_spawned && !self.is_dead
    }

    /// Whether the neighbour in `direction` holds another player.
    pub fn neighbor_occupied(&self, direction: Direction) -> bool {
        self.occupied_neighbors.is_occupied(direction)
    }
}
