//! Hexed game client binary.
//!
//! Composition root that assembles:
//! 1. Starknet ledger reader and (optionally) a dev session account
//! 2. Runtime (session state, reconciliation) via RuntimeBuilder
//! 3. CLI subcommands on top of the session handle
//!
//! # Examples
//!
//! ```bash
//! # Follow a running game against a local devnet
//! DOJO_MANIFEST_PATH=manifest_dev.json HEXED_ACCOUNT_ADDRESS=0x127f... hexed watch
//!
//! # One-shot commands
//! hexed spawn
//! hexed move se
//! hexed --json status
//! ```

mod cli;
mod logging;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_blockchain_core::SessionAccount;
use client_blockchain_starknet::{DevAccount, StarknetConfig, StarknetLedger};
use runtime::{Runtime, RuntimeConfig, RuntimeError, SessionEvent, SessionHandle};
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // 1. Load configuration from environment
    let starknet_config = StarknetConfig::from_env().map_err(anyhow::Error::msg)?;
    let mut runtime_config = RuntimeConfig::from_env();
    if !matches!(cli.command, Command::Watch) {
        // One-shot commands read on demand.
        runtime_config.poll_interval = std::time::Duration::ZERO;
    }

    let player = cli.player.or(starknet_config.player()).context(
        "no player address; pass --player or set HEXED_PLAYER_ADDRESS / HEXED_ACCOUNT_ADDRESS",
    )?;

    // 2. Setup logging
    let _log_guard = logging::setup_logging(Some(player), cli.verbose)?;
    tracing::info!(player = %player.to_short_hex(), command = ?cli.command, "Starting hexed client");

    // 3. Build ledger and account
    let ledger = Arc::new(StarknetLedger::new(starknet_config.clone())?);
    let account = starknet_config.account_address.map(|address| {
        Arc::new(DevAccount::new(address, ledger.game_contract(), ledger.rpc()))
            as Arc<dyn SessionAccount>
    });
    if account.is_none() && cli.command.needs_account() {
        anyhow::bail!("{:?} submits a transaction; set HEXED_ACCOUNT_ADDRESS", cli.command);
    }

    // 4. Build runtime and connect
    let codec = Arc::new(ledger.codec());
    let runtime = Runtime::builder()
        .config(runtime_config)
        .codec(codec)
        .ledger(ledger)
        .build()?;
    let handle = runtime.handle();

    match handle.connect(player, account).await {
        Ok(status) => tracing::info!(%status, "Connected"),
        // The foreign hint is already discarded; the lobby is still usable.
        Err(err @ RuntimeError::OwnershipMismatch { .. }) => {
            tracing::warn!(error = %err, "Ignoring persisted game");
        }
        Err(err) => return Err(err.into()),
    }

    // 5. Run the command
    let result = run(&cli, &handle).await;

    drop(handle);
    runtime.shutdown().await?;
    result
}

async fn run(cli: &Cli, handle: &SessionHandle) -> Result<()> {
    match &cli.command {
        Command::Status => {
            let snapshot = handle.snapshot();
            print_out(cli.json, &snapshot, || render::snapshot(&snapshot))?;
        }
        Command::Spawn => {
            let game_id = handle.spawn().await?;
            tracing::info!(%game_id, "Spawn confirmed");
            let snapshot = handle.snapshot();
            print_out(cli.json, &snapshot, || render::snapshot(&snapshot))?;
        }
        Command::Move { direction } => {
            let report = handle.move_to(*direction).await?;
            print_out(cli.json, &report, || render::report(&report))?;
        }
        Command::HighestScore => {
            let score = handle.highest_score().await?;
            if cli.json {
                let value = score.as_ref().map(|score| {
                    serde_json::json!({
                        "player": score.player,
                        "username": score.username.to_short_string(),
                        "xp": score.xp,
                    })
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", render::highest_score(score.as_ref()));
            }
        }
        Command::Reset => {
            let status = handle.reset().await?;
            println!("{status}");
        }
        Command::Watch => watch(cli.json, handle).await?,
    }
    Ok(())
}

/// Prints every session event until Ctrl-C.
async fn watch(json: bool, handle: &SessionHandle) -> Result<()> {
    let mut events = handle.subscribe();
    let snapshot = handle.snapshot();
    print_out(json, &snapshot, || render::snapshot(&snapshot))?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(json, &event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn print_event(json: bool, event: &SessionEvent) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if let Some(line) = render::event(event) {
        println!("{line}");
    }
    Ok(())
}

fn print_out<T: serde::Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}
