//! Command line surface.

use clap::{Parser, Subcommand};
use game_core::{Address, Direction};

/// Play hexed from the terminal.
#[derive(Debug, Parser)]
#[command(name = "hexed", version)]
pub struct Cli {
    /// Player address (default: HEXED_PLAYER_ADDRESS, then HEXED_ACCOUNT_ADDRESS)
    #[arg(long, global = true)]
    pub player: Option<Address>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the session, printing every change until interrupted
    Watch,
    /// Print the current session
    Status,
    /// Start a new game
    Spawn,
    /// Move one cell (e, ne, nw, w, sw, se)
    Move {
        #[arg(value_parser = parse_direction)]
        direction: Direction,
    },
    /// Print the leaderboard entry
    HighestScore,
    /// Forget the current game and return to the lobby
    Reset,
}

impl Command {
    /// Whether the command submits transactions.
    pub fn needs_account(&self) -> bool {
        matches!(self, Command::Spawn | Command::Move { .. })
    }
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    raw.parse()
        .map_err(|_| format!("unknown direction '{raw}', expected one of e, ne, nw, w, sw, se"))
}
