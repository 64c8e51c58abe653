//! Cloneable façade for issuing commands to the session worker.
//!
//! [`SessionHandle`] hides channel plumbing. Reads of the current state never
//! wait on the worker: they come from the latest published snapshot.
use std::sync::Arc;

use client_blockchain_core::{HighestScore, SessionAccount};
use game_core::{Address, Direction, GameId, SessionStatus};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::errors::{Result, RuntimeError};
use super::events::{MoveReport, SessionEvent, SessionSnapshot};
use crate::workers::Command;

/// Client-facing handle to interact with the session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_tx: broadcast::Sender<SessionEvent>,
        snapshot_rx: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            command_tx,
            event_tx,
            snapshot_rx,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Connect a player address and resume its persisted game, if any.
    ///
    /// `account` signs transactions; without one the session is read-only.
    pub async fn connect(
        &self,
        address: Address,
        account: Option<Arc<dyn SessionAccount>>,
    ) -> Result<SessionStatus> {
        self.request(|reply| Command::Connect {
            address,
            account,
            reply,
        })
        .await?
    }

    /// Spawn a new game for the connected player
    pub async fn spawn(&self) -> Result<GameId> {
        self.request(|reply| Command::Spawn { reply }).await?
    }

    /// Move one cell in `direction`
    ///
    /// The optimistic position is published before this returns; the future
    /// resolves once the move is settled and the state re-read.
    pub async fn move_to(&self, direction: Direction) -> Result<MoveReport> {
        self.request(|reply| Command::Move { direction, reply })
            .await?
    }

    /// Re-read the game state from the ledger now
    pub async fn refresh(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Refresh { reply }).await?
    }

    /// Forget the current game and return to the lobby
    pub async fn reset(&self) -> Result<SessionStatus> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Query the leaderboard entry
    pub async fn highest_score(&self) -> Result<Option<HighestScore>> {
        self.request(|reply| Command::HighestScore { reply })
            .await?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to session events
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut events = handle.subscribe();
    /// while let Ok(event) = events.recv().await {
    ///     if let SessionEvent::Occurred(occurrence) = event {
    ///         render(occurrence);
    ///     }
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}
