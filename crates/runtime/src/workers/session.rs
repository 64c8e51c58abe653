//! Session worker that owns the [`SessionDirector`].
//!
//! Receives commands from [`SessionHandle`](crate::api::SessionHandle),
//! submits transactions through the [`TransactionExecutor`], drives periodic
//! reconciliation, and publishes snapshots and [`SessionEvent`]s.
//!
//! Moves run on their own task so the loop keeps serving reads and ticks while
//! a transaction is in flight; the result comes back as a [`MoveCompletion`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use client_blockchain_core::{
    BlockTag, ExecutorError, HighestScore, LedgerCall, LedgerReader, SessionAccount,
    TransactionExecutor, Word,
};
use game_core::{Address, Direction, DomainEvent, GameId, SessionStatus};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{MoveReport, Result, RuntimeError, SessionEvent, SessionSnapshot};
use crate::session::{MoveTicket, Occurrence, SessionDirector};

/// Commands that can be sent to the session worker.
pub enum Command {
    /// Connect an address (and optionally the account that signs for it).
    Connect {
        address: Address,
        account: Option<Arc<dyn SessionAccount>>,
        reply: oneshot::Sender<Result<SessionStatus>>,
    },
    /// Start a new game for the connected address.
    Spawn {
        reply: oneshot::Sender<Result<GameId>>,
    },
    /// Move one cell. Replies once the move is settled.
    Move {
        direction: Direction,
        reply: oneshot::Sender<Result<MoveReport>>,
    },
    /// Re-read the game state now.
    Refresh {
        reply: oneshot::Sender<Result<SessionSnapshot>>,
    },
    /// Drop the current game and return to the lobby.
    Reset {
        reply: oneshot::Sender<Result<SessionStatus>>,
    },
    /// Read the leaderboard entry.
    HighestScore {
        reply: oneshot::Sender<Result<Option<HighestScore>>>,
    },
}

/// Result of a move task, handed back to the worker loop.
pub struct MoveCompletion {
    ticket: MoveTicket,
    result: std::result::Result<Vec<DomainEvent>, ExecutorError>,
    reply: oneshot::Sender<Result<MoveReport>>,
}

/// Channels the worker publishes on.
pub struct SessionChannels {
    pub command_rx: mpsc::Receiver<Command>,
    pub event_tx: broadcast::Sender<SessionEvent>,
    pub snapshot_tx: watch::Sender<SessionSnapshot>,
}

/// Background task that serializes every change to the session.
pub struct SessionWorker {
    director: SessionDirector,
    executor: TransactionExecutor,
    ledger: Arc<dyn LedgerReader>,

    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::Sender<MoveCompletion>,
    completion_rx: mpsc::Receiver<MoveCompletion>,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,

    poll_interval: Duration,
    username: Word,
    scored: HashSet<GameId>,
    last_status: SessionStatus,
}

impl SessionWorker {
    pub fn new(
        director: SessionDirector,
        executor: TransactionExecutor,
        ledger: Arc<dyn LedgerReader>,
        channels: SessionChannels,
        poll_interval: Duration,
        username: Word,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(4);
        let last_status = director.status();

        Self {
            director,
            executor,
            ledger,
            command_rx: channels.command_rx,
            completion_tx,
            completion_rx,
            event_tx: channels.event_tx,
            snapshot_tx: channels.snapshot_tx,
            poll_interval,
            username,
            scored: HashSet::new(),
            last_status,
        }
    }

    /// Main worker loop. Ends when every handle is dropped.
    pub async fn run(mut self) {
        let mut ticker = (!self.poll_interval.is_zero()).then(|| {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                Some(done) = self.completion_rx.recv() => {
                    self.handle_move_completion(done).await;
                }
                _ = next_tick(&mut ticker) => {
                    self.handle_tick().await;
                }
            }
        }

        debug!("Session worker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect {
                address,
                account,
                reply,
            } => {
                let result = self.handle_connect(address, account).await;
                self.publish();
                if reply.send(result).is_err() {
                    debug!("Connect reply channel closed (caller dropped)");
                }
            }
            Command::Spawn { reply } => {
                let result = self.handle_spawn().await;
                self.publish();
                if reply.send(result).is_err() {
                    debug!("Spawn reply channel closed (caller dropped)");
                }
            }
            Command::Move { direction, reply } => {
                self.handle_move(direction, reply);
            }
            Command::Refresh { reply } => {
                let result = self.refresh_session().await;
                self.publish();
                let result = result.map(|()| self.director.snapshot());
                if reply.send(result).is_err() {
                    debug!("Refresh reply channel closed (caller dropped)");
                }
            }
            Command::Reset { reply } => {
                let result = self.director.reset();
                self.publish();
                if reply.send(result).is_err() {
                    debug!("Reset reply channel closed (caller dropped)");
                }
            }
            Command::HighestScore { reply } => {
                let result = self
                    .ledger
                    .get_highest_score(BlockTag::PreConfirmed)
                    .await
                    .map_err(RuntimeError::from);
                if reply.send(result).is_err() {
                    debug!("HighestScore reply channel closed (caller dropped)");
                }
            }
        }
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    async fn handle_connect(
        &mut self,
        address: Address,
        account: Option<Arc<dyn SessionAccount>>,
    ) -> Result<SessionStatus> {
        if self.director.is_moving() {
            return Err(RuntimeError::AlreadyMoving);
        }

        if let Some(account) = &account
            && account.address() != address
        {
            warn!(
                player = %address.to_short_hex(),
                account = %account.address().to_short_hex(),
                "Signing account differs from the connected player"
            );
        }
        self.executor.set_account(account);

        info!(address = %address.to_short_hex(), "Connecting session");
        self.publish_status(SessionStatus::Initializing);
        self.director.initialize(address).await
    }

    async fn handle_spawn(&mut self) -> Result<GameId> {
        self.director.begin_spawn()?;

        let events = self
            .executor
            .execute(&[LedgerCall::Spawn], || {}, || {})
            .await?;
        let game_id = self.director.finish_spawn(&events)?;

        self.emit(SessionEvent::Spawned {
            game_id,
            position: self.director.state().position,
        });

        if let Err(err) = self.refresh_session().await {
            warn!(%game_id, error = %err, "Post-spawn refresh failed");
        }
        Ok(game_id)
    }

    fn handle_move(&mut self, direction: Direction, reply: oneshot::Sender<Result<MoveReport>>) {
        let ticket = match self.director.begin_move(direction) {
            Ok(ticket) => ticket,
            Err(err) => {
                if reply.send(Err(err)).is_err() {
                    debug!("Move reply channel closed (caller dropped)");
                }
                return;
            }
        };

        self.emit(SessionEvent::MoveStarted {
            direction,
            predicted: ticket.predicted,
        });
        self.publish();

        let executor = self.executor.clone();
        let completion_tx = self.completion_tx.clone();
        let accepted_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let calls = [LedgerCall::Move {
                game_id: ticket.game_id,
                direction,
            }];
            let result = executor
                .execute(
                    &calls,
                    || {},
                    move || {
                        let _ = accepted_tx.send(SessionEvent::MoveAccepted { direction });
                    },
                )
                .await;

            let done = MoveCompletion {
                ticket,
                result,
                reply,
            };
            if completion_tx.send(done).await.is_err() {
                debug!("Move finished after the session worker stopped");
            }
        });
    }

    async fn handle_move_completion(&mut self, done: MoveCompletion) {
        let MoveCompletion {
            ticket,
            result,
            reply,
        } = done;

        let result = match self.director.finish_move(&ticket, result) {
            Ok(resolution) => {
                for death in resolution.deaths {
                    self.on_occurrence(death);
                }
                if let Err(err) = self.refresh_session().await {
                    warn!(error = %err, "Post-move refresh failed");
                }
                let report = self.director.move_report(&ticket, resolution.outcome);
                self.emit(SessionEvent::MoveCompleted(report.clone()));
                Ok(report)
            }
            Err(err) if err.is_timeout() => {
                if let Err(read_err) = self.refresh_session().await {
                    warn!(error = %read_err, "Refresh after move timeout failed");
                }
                Err(err)
            }
            Err(err) => {
                // Subscribers that read the snapshot on this event must see
                // the rolled-back position.
                self.publish();
                let reason = if err.is_revert() {
                    "reverted".to_string()
                } else {
                    err.to_string()
                };
                self.emit(SessionEvent::MoveRolledBack {
                    direction: ticket.direction,
                    reason,
                });
                Err(err)
            }
        };

        self.publish();
        if reply.send(result).is_err() {
            debug!("Move reply channel closed (caller dropped)");
        }
    }

    async fn handle_tick(&mut self) {
        if self.director.status() != SessionStatus::Active || self.director.is_moving() {
            return;
        }

        if let Err(err) = self.refresh_session().await {
            warn!(error = %err, "Reconciliation tick failed");
            self.emit(SessionEvent::TickFailed {
                error: err.to_string(),
            });
        }
        self.publish();
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn refresh_session(&mut self) -> Result<()> {
        let occurrences = self.director.refresh().await?;
        for occurrence in occurrences {
            self.on_occurrence(occurrence);
        }
        Ok(())
    }

    fn on_occurrence(&mut self, occurrence: Occurrence) {
        if let Occurrence::Died { game_id, xp, .. } = occurrence {
            self.register_score(game_id, xp);
        }
        self.emit(SessionEvent::Occurred(occurrence));
    }

    /// Submits the final score once per game. Never blocks the loop.
    fn register_score(&mut self, game_id: GameId, xp: u32) {
        if !self.scored.insert(game_id) {
            return;
        }
        let Some(player) = self.director.address() else {
            return;
        };

        let executor = self.executor.clone();
        let event_tx = self.event_tx.clone();
        let call = LedgerCall::RegisterScore {
            player,
            username: self.username,
            xp,
        };

        tokio::spawn(async move {
            let event = match executor.execute_confirmed(&[call]).await {
                Ok(_) => {
                    info!(%game_id, xp, "Score registered");
                    SessionEvent::ScoreRegistered { game_id, xp }
                }
                Err(err) => {
                    warn!(%game_id, xp, error = %err, "Score registration failed");
                    SessionEvent::ScoreRegistrationFailed {
                        game_id,
                        error: err.to_string(),
                    }
                }
            };
            let _ = event_tx.send(event);
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn publish_status(&mut self, status: SessionStatus) {
        if status != self.last_status {
            self.last_status = status;
            self.emit(SessionEvent::StatusChanged { status });
        }
    }

    fn publish(&mut self) {
        let snapshot = self.director.snapshot();
        self.publish_status(snapshot.status);
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
