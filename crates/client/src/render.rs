//! Plain-text rendering of session state for the terminal.

use client_blockchain_core::HighestScore;
use game_core::SessionStatus;
use runtime::{MoveReport, Occurrence, SessionEvent, SessionSnapshot};

pub fn snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = format!("status: {}", snapshot.status);
    if let Some(address) = snapshot.address {
        out.push_str(&format!("\nplayer: {}", address.to_short_hex()));
    }

    let state = &snapshot.state;
    if !state.is_spawned {
        if snapshot.status == SessionStatus::NoActiveGame {
            out.push_str("\nno game yet; run `hexed spawn`");
        }
        return out;
    }

    if let Some(game_id) = state.game_id {
        out.push_str(&format!("\ngame:   {game_id}"));
    }
    if let Some(position) = snapshot.effective_position {
        out.push_str(&format!("\ncell:   {position}"));
        if snapshot.moving {
            out.push_str(" (moving)");
        }
    }
    out.push_str(&format!(
        "\nhp:     {}/{}\nxp:     {}",
        state.hp, state.max_hp, state.xp
    ));
    out.push_str(if state.can_move {
        "\nready to move"
    } else {
        "\ncooling down"
    });

    let neighbors: Vec<String> = state
        .occupied_neighbors
        .occupied_directions()
        .map(|direction| direction.to_string())
        .collect();
    if !neighbors.is_empty() {
        out.push_str(&format!("\nplayers nearby: {}", neighbors.join(", ")));
    }
    out
}

pub fn report(report: &MoveReport) -> String {
    format!(
        "{} -> {}: {} (hp {:+}, xp {:+})",
        report.direction, report.position, report.outcome, report.hp_delta, report.xp_delta
    )
}

pub fn highest_score(score: Option<&HighestScore>) -> String {
    match score {
        Some(score) => format!("{} with {} xp", score.display_name(), score.xp),
        None => "no score registered yet".to_string(),
    }
}

/// One line per event worth showing; `None` for the rest.
pub fn event(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::StatusChanged { status } => format!("status: {status}"),
        SessionEvent::Spawned { game_id, position } => format!("spawned {game_id} at {position}"),
        SessionEvent::MoveStarted {
            direction,
            predicted,
        } => format!("moving {direction} to {predicted}"),
        SessionEvent::MoveAccepted { .. } => return None,
        SessionEvent::MoveRolledBack { direction, reason } => {
            format!("move {direction} rolled back: {reason}")
        }
        SessionEvent::MoveCompleted(move_report) => report(move_report),
        SessionEvent::Occurred(occurrence) => match occurrence {
            Occurrence::Moved { from, to } => format!("moved {from} -> {to}"),
            Occurrence::Retaliation { hp_lost } => format!("attacked, lost {hp_lost} hp"),
            Occurrence::Overpowered { hp_lost, from, to } => {
                format!("overpowered, pushed {from} -> {to}, lost {hp_lost} hp")
            }
            Occurrence::Died { xp, position, .. } => format!("died at {position} with {xp} xp"),
        },
        SessionEvent::ScoreRegistered { xp, .. } => format!("score of {xp} xp registered"),
        SessionEvent::ScoreRegistrationFailed { error, .. } => {
            format!("score registration failed: {error}")
        }
        SessionEvent::TickFailed { error } => format!("refresh failed: {error}"),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use game_core::{Direction, GameId, HexCoord, NeighborMask, PlayerState};
    use runtime::MoveOutcome;

    use super::*;

    #[test]
    fn lobby_suggests_spawning() {
        let lobby = SessionSnapshot {
            status: SessionStatus::NoActiveGame,
            ..SessionSnapshot::default()
        };
        assert!(snapshot(&lobby).contains("hexed spawn"));
    }

    #[test]
    fn active_snapshot_lists_neighbors() {
        let active = SessionSnapshot {
            status: SessionStatus::Active,
            state: PlayerState {
                game_id: Some(GameId(4)),
                position: HexCoord::new(2, 3),
                hp: 95,
                max_hp: 110,
                is_spawned: true,
                occupied_neighbors: NeighborMask::WEST,
                ..PlayerState::empty()
            },
            effective_position: Some(HexCoord::new(2, 3)),
            ..SessionSnapshot::default()
        };
        let text = snapshot(&active);
        assert!(text.contains("hp:     95/110"));
        assert!(text.contains("players nearby: West"));
        assert!(text.contains("cooling down"));
    }

    #[test]
    fn report_shows_signed_deltas() {
        let line = report(&MoveReport {
            direction: Direction::East,
            position: HexCoord::new(1, 0),
            outcome: MoveOutcome::CombatWon,
            hp_delta: -5,
            xp_delta: 10,
        });
        assert!(line.contains("combat_won"));
        assert!(line.contains("hp -5"));
        assert!(line.contains("xp +10"));
    }

    #[test]
    fn accepted_moves_stay_quiet() {
        let accepted = SessionEvent::MoveAccepted {
            direction: Direction::West,
        };
        assert_eq!(event(&accepted), None);
    }
}
