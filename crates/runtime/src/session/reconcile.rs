//! Diffing of successive canonical reads.
//!
//! The ledger never says "you were attacked". The reconciler infers it from
//! how hp and position changed between two polls:
//!
//! | hp        | position  | activity      | occurrence    |
//! |-----------|-----------|---------------|---------------|
//! | lower     | same      |               | `Retaliation` |
//! | lower     | different |               | `Overpowered` |
//! | same/more | different |               | `Moved`       |
//! |           |           | active → gone, hp 0 | `Died`  |
//!
//! This is a heuristic: two unrelated changes landing in one poll interval
//! are reported as whichever row they happen to match.

use std::time::Duration;

use client_blockchain_core::OnChainGameState;
use game_core::{GameId, HexCoord};
use serde::Serialize;
use tokio::time::Instant;

/// The fields of a canonical read the reconciler compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub hp: u32,
    pub position: HexCoord,
    pub is_active: bool,
    pub xp: u32,
}

impl From<&OnChainGameState> for Snapshot {
    fn from(state: &OnChainGameState) -> Self {
        Self {
            hp: state.hp,
            position: state.position,
            is_active: state.is_active,
            xp: state.xp,
        }
    }
}

/// Something that happened to the session between two reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Occurrence {
    Moved {
        from: HexCoord,
        to: HexCoord,
    },
    /// Defended in place and took counter-damage.
    Retaliation {
        hp_lost: u32,
    },
    /// Lost a fight and was pushed off the cell.
    Overpowered {
        hp_lost: u32,
        from: HexCoord,
        to: HexCoord,
    },
    /// Reported at most once per game.
    Died {
        game_id: GameId,
        xp: u32,
        position: HexCoord,
    },
}

/// Classifies the change from `prev` to `next`. Pure.
pub fn classify(game_id: GameId, prev: &Snapshot, next: &Snapshot) -> Vec<Occurrence> {
    if prev.is_active && !next.is_active && next.hp == 0 {
        return vec![Occurrence::Died {
            game_id,
            xp: next.xp,
            position: next.position,
        }];
    }

    let moved = prev.position != next.position;
    if next.hp < prev.hp {
        let hp_lost = prev.hp - next.hp;
        let occurrence = if moved {
            Occurrence::Overpowered {
                hp_lost,
                from: prev.position,
                to: next.position,
            }
        } else {
            Occurrence::Retaliation { hp_lost }
        };
        return vec![occurrence];
    }

    if moved {
        return vec![Occurrence::Moved {
            from: prev.position,
            to: next.position,
        }];
    }

    Vec::new()
}

/// Remembers the last read and turns each new one into occurrences.
#[derive(Debug)]
pub struct Reconciler {
    self_caused_window: Duration,
    last: Option<Snapshot>,
    suppress_until: Option<Instant>,
    death_reported: bool,
}

impl Reconciler {
    pub fn new(self_caused_window: Duration) -> Self {
        Self {
            self_caused_window,
            last: None,
            suppress_until: None,
            death_reported: false,
        }
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    /// Opens (or extends) the window in which changes are self-caused.
    pub fn suppress_from(&mut self, now: Instant) {
        let until = now + self.self_caused_window;
        self.suppress_until = Some(self.suppress_until.map_or(until, |u| u.max(until)));
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }

    /// Records a death learned elsewhere. Returns `true` on the first report.
    pub fn report_death(&mut self) -> bool {
        !std::mem::replace(&mut self.death_reported, true)
    }

    pub fn death_reported(&self) -> bool {
        self.death_reported
    }

    /// Diffs `state` against the stored snapshot, then stores it.
    ///
    /// The first read only seeds the snapshot. Inside the self-caused window
    /// the snapshot still advances but nothing but a death is reported.
    pub fn observe(&mut self, state: &OnChainGameState, now: Instant) -> Vec<Occurrence> {
        let next = Snapshot::from(state);
        let Some(prev) = self.last.replace(next) else {
            return Vec::new();
        };

        let suppressed = self.is_suppressed(now);
        let mut occurrences = classify(state.game_id, &prev, &next);
        occurrences.retain(|occurrence| match occurrence {
            Occurrence::Died { .. } => self.report_death(),
            _ => !suppressed,
        });
        occurrences
    }

    /// Forgets everything; used when the session changes.
    pub fn reset(&mut self) {
        self.last = None;
        self.suppress_until = None;
        self.death_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use game_core::{Address, NeighborMask};

    use super::*;

    fn snap(hp: u32, q: i32, r: i32) -> Snapshot {
        Snapshot {
            hp,
            position: HexCoord::new(q, r),
            is_active: true,
            xp: 0,
        }
    }

    fn read(hp: u32, position: HexCoord, is_active: bool) -> OnChainGameState {
        OnChainGameState {
            game_id: GameId(1),
            player: Address::ZERO,
            position,
            last_direction: None,
            can_move: true,
            is_active,
            hp,
            max_hp: 110,
            xp: 30,
            neighbor_occupancy: NeighborMask::empty(),
        }
    }

    #[test]
    fn hp_loss_in_place_is_retaliation() {
        assert_eq!(
            classify(GameId(1), &snap(100, 0, 0), &snap(80, 0, 0)),
            vec![Occurrence::Retaliation { hp_lost: 20 }]
        );
    }

    #[test]
    fn hp_loss_with_displacement_is_overpowered() {
        assert_eq!(
            classify(GameId(1), &snap(100, 0, 0), &snap(80, 1, 0)),
            vec![Occurrence::Overpowered {
                hp_lost: 20,
                from: HexCoord::new(0, 0),
                to: HexCoord::new(1, 0),
            }]
        );
    }

    #[test]
    fn unchanged_or_healed_in_place_is_nothing() {
        assert!(classify(GameId(1), &snap(80, 2, 2), &snap(80, 2, 2)).is_empty());
        assert!(classify(GameId(1), &snap(80, 2, 2), &snap(95, 2, 2)).is_empty());
    }

    #[test]
    fn displacement_without_loss_is_a_move() {
        assert_eq!(
            classify(GameId(1), &snap(80, 2, 2), &snap(80, 3, 2)),
            vec![Occurrence::Moved {
                from: HexCoord::new(2, 2),
                to: HexCoord::new(3, 2),
            }]
        );
    }

    #[test]
    fn deactivation_at_zero_hp_is_death() {
        let dead = Snapshot {
            is_active: false,
            ..snap(0, 0, 0)
        };
        let occurrences = classify(GameId(9), &snap(15, 0, 0), &dead);
        assert!(matches!(
            occurrences.as_slice(),
            [Occurrence::Died { game_id: GameId(9), .. }]
        ));
    }

    #[test]
    fn first_read_only_seeds() {
        let mut reconciler = Reconciler::new(Duration::from_millis(1500));
        let now = Instant::now();
        assert!(reconciler.observe(&read(100, HexCoord::ORIGIN, true), now).is_empty());
        assert_eq!(reconciler.last().unwrap().hp, 100);
    }

    #[test]
    fn death_is_reported_exactly_once() {
        let mut reconciler = Reconciler::new(Duration::ZERO);
        let now = Instant::now();
        reconciler.observe(&read(40, HexCoord::ORIGIN, true), now);

        let first = reconciler.observe(&read(0, HexCoord::ORIGIN, false), now);
        assert_eq!(
            first,
            vec![Occurrence::Died {
                game_id: GameId(1),
                xp: 30,
                position: HexCoord::ORIGIN,
            }]
        );

        let second = reconciler.observe(&read(0, HexCoord::ORIGIN, false), now);
        assert!(second.is_empty());
    }

    #[test]
    fn death_known_from_events_is_not_reported_again() {
        let mut reconciler = Reconciler::new(Duration::ZERO);
        let now = Instant::now();
        reconciler.observe(&read(40, HexCoord::ORIGIN, true), now);

        assert!(reconciler.report_death());
        assert!(reconciler.observe(&read(0, HexCoord::ORIGIN, false), now).is_empty());
    }

    #[test]
    fn self_caused_window_skips_diff_but_advances_snapshot() {
        let mut reconciler = Reconciler::new(Duration::from_millis(1500));
        let start = Instant::now();
        reconciler.observe(&read(100, HexCoord::ORIGIN, true), start);

        reconciler.suppress_from(start);
        let inside = reconciler.observe(&read(90, HexCoord::new(1, 0), true), start);
        assert!(inside.is_empty());
        assert_eq!(reconciler.last().unwrap().position, HexCoord::new(1, 0));

        let later = start + Duration::from_secs(2);
        let outside = reconciler.observe(&read(70, HexCoord::new(1, 0), true), later);
        assert_eq!(outside, vec![Occurrence::Retaliation { hp_lost: 20 }]);
    }
}
