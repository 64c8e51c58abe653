use crate::hex::HexCoord;

/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Side length of the square axial region the ledger accepts.
    pub grid_size: u32,
}

impl GameConfig {
    // ===== ledger-side constants =====
    /// Hit points a freshly spawned player starts with.
    pub const SPAWN_HP: u32 = 100;
    pub const SPAWN_MAX_HP: u32 = 110;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_GRID_SIZE: u32 = 20;

    pub fn new() -> Self {
        Self {
            grid_size: Self::DEFAULT_GRID_SIZE,
        }
    }

    pub fn with_grid_size(grid_size: u32) -> Self {
        Self { grid_size }
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::square(self.grid_size)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Axial rectangle `0 <= q < width`, `0 <= r < height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldBounds {
    pub width: u32,
    pub height: u32,
}

impl WorldBounds {
    pub const fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    pub fn contains(&self, hex: HexCoord) -> bool {
        u32::try_from(hex.q).is_ok_and(|q| q < self.width)
            && u32::try_from(hex.r).is_ok_and(|r| r < self.height)
    }
}
