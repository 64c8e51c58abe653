//! Transaction lifecycle: gate, submit, poll, classify, decode.
//!
//! ```text
//! Idle -> Submitted -> (poll) -> Provisional -> {Confirmed(events) | Reverted}
//! ```
//!
//! Only the status polling is retried. The business action itself is never
//! resubmitted; a poll that exceeds its ceiling surfaces as
//! [`ExecutorError::Timeout`] and the caller decides what to re-read.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use game_core::{DomainEvent, GameId};

use crate::codec::EventCodec;
use crate::traits::{LedgerReader, SessionAccount, TransportError};
use crate::types::{
    BlockTag, ExecutionStatus, LedgerCall, Receipt, TransactionHandle, TransactionHash,
    TransactionPhase,
};

/// Executor errors.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("no active session account to sign with")]
    NoSession,

    #[error("refusing to submit an empty call batch")]
    EmptyBatch,

    #[error("transaction {hash} reverted: {reason}")]
    Reverted {
        hash: TransactionHash,
        reason: String,
    },

    #[error("transaction {hash} not {mode} after {attempts} polls")]
    Timeout {
        hash: TransactionHash,
        mode: WaitMode,
        attempts: u32,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// How far to wait before handing the receipt back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WaitMode {
    /// Pre-confirmed is enough. Favors latency.
    Provisional,
    /// Wait for L2 acceptance.
    Confirmed,
}

/// Retry ceilings and intervals for the executor's polling loops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Cooldown gate reads before a move is submitted anyway.
    pub gate_attempts: u32,
    pub gate_initial_delay: Duration,
    pub gate_max_delay: Duration,

    pub provisional_attempts: u32,
    pub provisional_interval: Duration,
    /// Pause after a failed receipt read.
    pub error_backoff: Duration,

    pub confirmation_attempts: u32,
    pub confirmation_interval: Duration,
}

impl ExecutorConfig {
    pub const DEFAULT_GATE_ATTEMPTS: u32 = 10;
    pub const DEFAULT_GATE_INITIAL_DELAY_MS: u64 = 500;
    pub const DEFAULT_GATE_MAX_DELAY_MS: u64 = 2_000;
    pub const DEFAULT_PROVISIONAL_ATTEMPTS: u32 = 12;
    pub const DEFAULT_PROVISIONAL_INTERVAL_MS: u64 = 275;
    pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 500;
    pub const DEFAULT_CONFIRMATION_ATTEMPTS: u32 = 30;
    pub const DEFAULT_CONFIRMATION_INTERVAL_MS: u64 = 350;

    pub fn new() -> Self {
        Self {
            gate_attempts: Self::DEFAULT_GATE_ATTEMPTS,
            gate_initial_delay: Duration::from_millis(Self::DEFAULT_GATE_INITIAL_DELAY_MS),
            gate_max_delay: Duration::from_millis(Self::DEFAULT_GATE_MAX_DELAY_MS),
            provisional_attempts: Self::DEFAULT_PROVISIONAL_ATTEMPTS,
            provisional_interval: Duration::from_millis(Self::DEFAULT_PROVISIONAL_INTERVAL_MS),
            error_backoff: Duration::from_millis(Self::DEFAULT_ERROR_BACKOFF_MS),
            confirmation_attempts: Self::DEFAULT_CONFIRMATION_ATTEMPTS,
            confirmation_interval: Duration::from_millis(Self::DEFAULT_CONFIRMATION_INTERVAL_MS),
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `HEXED_GATE_ATTEMPTS` - Cooldown gate reads before submitting anyway (default: 10)
    /// - `HEXED_PROVISIONAL_ATTEMPTS` - Pre-confirmed receipt polls (default: 12)
    /// - `HEXED_PROVISIONAL_INTERVAL_MS` - Delay between those polls (default: 275)
    /// - `HEXED_CONFIRMATION_ATTEMPTS` - Accepted-on-L2 receipt polls (default: 30)
    /// - `HEXED_CONFIRMATION_INTERVAL_MS` - Delay between those polls (default: 350)
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(attempts) = read_env::<u32>("HEXED_GATE_ATTEMPTS") {
            config.gate_attempts = attempts;
        }
        if let Some(attempts) = read_env::<u32>("HEXED_PROVISIONAL_ATTEMPTS") {
            config.provisional_attempts = attempts.max(1);
        }
        if let Some(ms) = read_env::<u64>("HEXED_PROVISIONAL_INTERVAL_MS") {
            config.provisional_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = read_env::<u32>("HEXED_CONFIRMATION_ATTEMPTS") {
            config.confirmation_attempts = attempts.max(1);
        }
        if let Some(ms) = read_env::<u64>("HEXED_CONFIRMATION_INTERVAL_MS") {
            config.confirmation_interval = Duration::from_millis(ms);
        }

        config
    }

    /// Disables the cooldown gate.
    pub fn without_gate(mut self) -> Self {
        self.gate_attempts = 0;
        self
    }

    pub fn with_provisional(mut self, attempts: u32, interval: Duration) -> Self {
        self.provisional_attempts = attempts;
        self.provisional_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.provisional_attempts == 0 {
            return Err("provisional_attempts must be > 0".to_string());
        }
        if self.confirmation_attempts < self.provisional_attempts {
            return Err(format!(
                "confirmation_attempts ({}) must not be below provisional_attempts ({})",
                self.confirmation_attempts, self.provisional_attempts
            ));
        }
        if self.gate_initial_delay > self.gate_max_delay {
            return Err("gate_initial_delay exceeds gate_max_delay".to_string());
        }
        Ok(())
    }

    fn ceiling(&self, mode: WaitMode) -> (u32, Duration) {
        match mode {
            WaitMode::Provisional => (self.provisional_attempts, self.provisional_interval),
            WaitMode::Confirmed => (self.confirmation_attempts, self.confirmation_interval),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished, non-reverted transaction.
#[derive(Debug, Clone)]
pub struct Executed {
    pub handle: TransactionHandle,
    pub events: Vec<DomainEvent>,
}

/// Submits call batches and follows them to a classified receipt.
///
/// Cheap to clone; move tasks get their own copy.
#[derive(Clone)]
pub struct TransactionExecutor {
    ledger: Arc<dyn LedgerReader>,
    account: Option<Arc<dyn SessionAccount>>,
    codec: Arc<EventCodec>,
    config: ExecutorConfig,
}

impl TransactionExecutor {
    pub fn new(ledger: Arc<dyn LedgerReader>, codec: Arc<EventCodec>, config: ExecutorConfig) -> Self {
        Self {
            ledger,
            account: None,
            codec,
            config,
        }
    }

    pub fn with_account(mut self, account: Arc<dyn SessionAccount>) -> Self {
        self.account = Some(account);
        self
    }

    pub fn set_account(&mut self, account: Option<Arc<dyn SessionAccount>>) {
        self.account = account;
    }

    pub fn account(&self) -> Option<&Arc<dyn SessionAccount>> {
        self.account.as_ref()
    }

    pub fn codec(&self) -> &EventCodec {
        &self.codec
    }

    /// Runs a batch to provisional acceptance and returns its known events.
    ///
    /// `on_revert` fires before [`ExecutorError::Reverted`] is returned;
    /// `on_provisional` fires once the receipt is accepted, before decoding.
    pub async fn execute<R, P>(
        &self,
        calls: &[LedgerCall],
        on_revert: R,
        on_provisional: P,
    ) -> Result<Vec<DomainEvent>, ExecutorError>
    where
        R: FnOnce() + Send,
        P: FnOnce() + Send,
    {
        self.run(calls, WaitMode::Provisional, on_revert, on_provisional)
            .await
            .map(|executed| executed.events)
    }

    /// Runs a batch to L2 acceptance.
    pub async fn execute_confirmed(&self, calls: &[LedgerCall]) -> Result<Executed, ExecutorError> {
        self.run(calls, WaitMode::Confirmed, || {}, || {}).await
    }

    async fn run<R, P>(
        &self,
        calls: &[LedgerCall],
        mode: WaitMode,
        on_revert: R,
        on_provisional: P,
    ) -> Result<Executed, ExecutorError>
    where
        R: FnOnce() + Send,
        P: FnOnce() + Send,
    {
        let account = self.account.as_ref().ok_or(ExecutorError::NoSession)?;
        if calls.is_empty() {
            return Err(ExecutorError::EmptyBatch);
        }

        if let Some(game_id) = calls.iter().find_map(|call| match call {
            LedgerCall::Move { game_id, .. } => Some(*game_id),
            _ => None,
        }) {
            self.wait_for_gate(game_id).await;
        }

        let hash = account.execute(calls).await?;
        let mut handle = TransactionHandle::submitted(hash);
        tracing::info!(
            tx = %hash,
            calls = ?calls.iter().map(LedgerCall::entrypoint).collect::<Vec<_>>(),
            "Submitted transaction"
        );

        let receipt = self.wait_for_receipt(hash, mode).await?;

        if let ExecutionStatus::Reverted { reason } = receipt.execution {
            handle.advance(TransactionPhase::Reverted);
            tracing::warn!(tx = %hash, %reason, "Transaction reverted");
            on_revert();
            return Err(ExecutorError::Reverted { hash, reason });
        }

        handle.advance(if receipt.finality.is_confirmed() {
            TransactionPhase::Confirmed
        } else {
            TransactionPhase::Provisional
        });
        on_provisional();

        let events = self.codec.decode_all(&receipt.events);
        tracing::debug!(
            tx = %hash,
            phase = %handle.phase,
            records = receipt.events.len(),
            decoded = events.len(),
            "Transaction accepted"
        );
        Ok(Executed { handle, events })
    }

    /// Polls the cooldown flag with bounded exponential backoff.
    ///
    /// Never fails: when attempts run out the move is submitted anyway and the
    /// ledger has the final word.
    async fn wait_for_gate(&self, game_id: GameId) {
        let mut delay = self.config.gate_initial_delay;
        for attempt in 1..=self.config.gate_attempts {
            match self.ledger.get_game_state(game_id, BlockTag::PreConfirmed).await {
                Ok(Some(state)) if state.can_move => return,
                Ok(_) => {
                    tracing::debug!(%game_id, attempt, "Cooldown gate closed");
                }
                Err(err) => {
                    tracing::debug!(%game_id, attempt, error = %err, "Cooldown gate read failed");
                }
            }
            if attempt < self.config.gate_attempts {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.config.gate_max_delay);
            }
        }
        if self.config.gate_attempts > 0 {
            tracing::warn!(
                %game_id,
                attempts = self.config.gate_attempts,
                "Cooldown gate still closed, submitting anyway"
            );
        }
    }

    async fn wait_for_receipt(
        &self,
        hash: TransactionHash,
        mode: WaitMode,
    ) -> Result<Receipt, ExecutorError> {
        let (attempts, interval) = self.config.ceiling(mode);

        for attempt in 1..=attempts {
            let pause = match self.ledger.get_receipt(&hash).await {
                Ok(Some(receipt)) if receipt.is_reverted() => return Ok(receipt),
                Ok(Some(receipt)) if reached(&receipt, mode) => return Ok(receipt),
                Ok(found) => {
                    tracing::debug!(
                        tx = %hash,
                        attempt,
                        finality = ?found.map(|r| r.finality),
                        "Receipt not ready"
                    );
                    interval
                }
                Err(err) => {
                    tracing::debug!(tx = %hash, attempt, error = %err, "Receipt read failed");
                    self.config.error_backoff
                }
            };
            if attempt < attempts {
                tokio::time::sleep(pause).await;
            }
        }

        tracing::warn!(tx = %hash, %mode, attempts, "Receipt polling ceiling reached");
        Err(ExecutorError::Timeout {
            hash,
            mode,
            attempts,
        })
    }
}

fn reached(receipt: &Receipt, mode: WaitMode) -> bool {
    match mode {
        WaitMode::Provisional => receipt.finality.is_provisional(),
        WaitMode::Confirmed => receipt.finality.is_confirmed(),
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
