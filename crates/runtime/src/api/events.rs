//! Events emitted by the session worker for front-ends to observe.
//!
//! Consumers subscribe to [`SessionEvent`] to react to changes without
//! blocking the worker loop. The current state itself is published as a
//! [`SessionSnapshot`] on a watch channel.

use game_core::{Address, Direction, GameId, HexCoord, PlayerState, SessionStatus};

use serde::Serialize;

use crate::session::Occurrence;

/// Read-only view of the session for rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub address: Option<Address>,
    pub state: PlayerState,
    /// Optimistic-or-canonical position to display.
    pub effective_position: Option<HexCoord>,
    pub moving: bool,
}

/// How a confirmed move ended for the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    CombatWon,
    CombatLost,
    Died,
}

/// Summary of one completed move, after the follow-up refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub direction: Direction,
    /// Position after the move; unchanged when the move turned into combat.
    pub position: HexCoord,
    pub outcome: MoveOutcome,
    pub hp_delta: i64,
    pub xp_delta: i64,
}

/// Events emitted by the runtime during a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    StatusChanged {
        status: SessionStatus,
    },
    Spawned {
        game_id: GameId,
        position: HexCoord,
    },
    /// The optimistic position is live.
    MoveStarted {
        direction: Direction,
        predicted: HexCoord,
    },
    /// The move reached provisional acceptance.
    MoveAccepted {
        direction: Direction,
    },
    /// The move had no effect; the optimistic position was dropped.
    MoveRolledBack {
        direction: Direction,
        reason: String,
    },
    MoveCompleted(MoveReport),
    /// Inferred from a periodic read.
    Occurred(Occurrence),
    ScoreRegistered {
        game_id: GameId,
        xp: u32,
    },
    ScoreRegistrationFailed {
        game_id: GameId,
        error: String,
    },
    /// A reconciliation tick failed; the next one retries.
    TickFailed {
        error: String,
    },
}
