//! Optimistic move prediction and rollback.
//!
//! A move is shown at its predicted cell as soon as it is requested. The
//! override is dropped on revert, and otherwise kept until a canonical read
//! reports the predicted cell. A read that still shows the old cell is a stale
//! read racing the confirmation and must not clobber the prediction.

use game_core::{Direction, HexCoord, PlayerState, WorldBounds};

/// The one live optimistic override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingMove {
    pub direction: Direction,
    pub from: HexCoord,
    pub predicted: HexCoord,
    /// Canonical reads that disagreed with `predicted` so far.
    pub stale_reads: u32,
}

/// What a canonical read did to the live override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// No override was live.
    Idle,
    /// The read matched the prediction; the override is gone.
    Confirmed,
    /// The read disagreed; the override stays.
    Stale,
    /// Too many disagreeing reads; the override was dropped.
    Expired,
}

/// Holds at most one predicted position over the canonical one.
#[derive(Debug)]
pub struct OptimisticMoveController {
    bounds: WorldBounds,
    stale_read_limit: u32,
    pending: Option<PendingMove>,
}

impl OptimisticMoveController {
    /// `stale_read_limit` of zero never expires an override.
    pub fn new(bounds: WorldBounds, stale_read_limit: u32) -> Self {
        Self {
            bounds,
            stale_read_limit,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Cell a move in `direction` would land on, or `None` when no position is
    /// known or the cell lies outside the world.
    pub fn predict(&self, state: &PlayerState, direction: Direction) -> Option<HexCoord> {
        let from = state.effective_position()?;
        let target = from.neighbor(direction)?;
        self.bounds.contains(target).then_some(target)
    }

    /// Predicts and publishes the override on `state`.
    pub fn begin(&mut self, state: &mut PlayerState, direction: Direction) -> Option<HexCoord> {
        let from = state.effective_position()?;
        let predicted = self.predict(state, direction)?;
        state.optimistic_position = Some(predicted);
        self.pending = Some(PendingMove {
            direction,
            from,
            predicted,
            stale_reads: 0,
        });
        Some(predicted)
    }

    /// Drops the override; the last confirmed position shows again.
    pub fn rollback(&mut self, state: &mut PlayerState) -> Option<PendingMove> {
        let pending = self.pending.take()?;
        state.optimistic_position = None;
        Some(pending)
    }

    /// Receipt events named the landing cell. Keeps the override alive and
    /// waits for a canonical read of `position`.
    pub fn confirm(&mut self, state: &mut PlayerState, position: HexCoord) {
        if let Some(pending) = self.pending.as_mut() {
            pending.predicted = position;
            pending.stale_reads = 0;
            state.optimistic_position = Some(position);
        }
    }

    /// Feeds one canonical position read.
    pub fn observe(&mut self, state: &mut PlayerState, canonical: HexCoord) -> Observation {
        let Some(pending) = self.pending.as_mut() else {
            return Observation::Idle;
        };

        if canonical == pending.predicted {
            self.pending = None;
            state.optimistic_position = None;
            return Observation::Confirmed;
        }

        pending.stale_reads += 1;
        if self.stale_read_limit > 0 && pending.stale_reads >= self.stale_read_limit {
            tracing::warn!(
                predicted = %pending.predicted,
                %canonical,
                reads = pending.stale_reads,
                "Optimistic position never confirmed, dropping it"
            );
            self.pending = None;
            state.optimistic_position = None;
            return Observation::Expired;
        }

        tracing::debug!(predicted = %pending.predicted, %canonical, "Stale position read");
        Observation::Stale
    }

    pub fn reset(&mut self, state: &mut PlayerState) {
        self.pending = None;
        state.optimistic_position = None;
    }
}

#[cfg(test)]
mod tests {
    use game_core::GameConfig;

    use super::*;

    fn spawned_at(q: i32, r: i32) -> PlayerState {
        PlayerState {
            is_spawned: true,
            position: HexCoord::new(q, r),
            ..PlayerState::default()
        }
    }

    fn controller() -> OptimisticMoveController {
        OptimisticMoveController::new(GameConfig::default().bounds(), 3)
    }

    #[test]
    fn predict_applies_offset_within_bounds() {
        let state = spawned_at(0, 0);
        let ctl = controller();

        assert_eq!(
            ctl.predict(&state, Direction::East),
            Some(HexCoord::new(1, 0))
        );
        assert_eq!(ctl.predict(&state, Direction::West), None);
        assert_eq!(ctl.predict(&state, Direction::NorthEast), None);
        assert_eq!(ctl.predict(&PlayerState::empty(), Direction::East), None);
    }

    #[test]
    fn predict_chains_from_live_override() {
        let mut state = spawned_at(0, 0);
        state.optimistic_position = Some(HexCoord::new(1, 0));
        assert_eq!(
            controller().predict(&state, Direction::East),
            Some(HexCoord::new(2, 0))
        );
    }

    #[test]
    fn rollback_restores_canonical_position_exactly() {
        let mut state = spawned_at(4, 7);
        let mut ctl = controller();

        assert_eq!(
            ctl.begin(&mut state, Direction::SouthEast),
            Some(HexCoord::new(4, 8))
        );
        assert_eq!(state.effective_position(), Some(HexCoord::new(4, 8)));

        let rolled = ctl.rollback(&mut state).unwrap();
        assert_eq!(rolled.from, HexCoord::new(4, 7));
        assert_eq!(state.effective_position(), Some(HexCoord::new(4, 7)));
        assert!(!ctl.is_pending());
    }

    #[test]
    fn matching_read_clears_override() {
        let mut state = spawned_at(0, 0);
        let mut ctl = controller();
        ctl.begin(&mut state, Direction::East);

        state.position = HexCoord::new(1, 0);
        assert_eq!(
            ctl.observe(&mut state, HexCoord::new(1, 0)),
            Observation::Confirmed
        );
        assert_eq!(state.optimistic_position, None);
    }

    #[test]
    fn stale_read_keeps_override() {
        let mut state = spawned_at(0, 0);
        let mut ctl = controller();
        ctl.begin(&mut state, Direction::East);

        assert_eq!(
            ctl.observe(&mut state, HexCoord::new(0, 0)),
            Observation::Stale
        );
        assert_eq!(state.optimistic_position, Some(HexCoord::new(1, 0)));
        assert_eq!(ctl.pending().unwrap().stale_reads, 1);
    }

    #[test]
    fn override_expires_after_stale_read_limit() {
        let mut state = spawned_at(0, 0);
        let mut ctl = controller();
        ctl.begin(&mut state, Direction::East);

        assert_eq!(ctl.observe(&mut state, HexCoord::ORIGIN), Observation::Stale);
        assert_eq!(ctl.observe(&mut state, HexCoord::ORIGIN), Observation::Stale);
        assert_eq!(
            ctl.observe(&mut state, HexCoord::ORIGIN),
            Observation::Expired
        );
        assert_eq!(state.effective_position(), Some(HexCoord::ORIGIN));
    }

    #[test]
    fn observe_without_override_is_idle() {
        let mut state = spawned_at(0, 0);
        assert_eq!(
            controller().observe(&mut state, HexCoord::new(3, 3)),
            Observation::Idle
        );
    }
}
