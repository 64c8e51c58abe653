//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up command, event and snapshot
//! channels, and exposes a builder-based API for clients to drive a session.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use client_blockchain_core::{
    EventCodec, ExecutorConfig, GameLedger, LedgerReader, SchemaTable, TransactionExecutor, Word,
};
use game_core::GameConfig;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{Result, RuntimeError, SessionEvent, SessionHandle, SessionSnapshot};
use crate::repository::{FileGameIdStore, GameIdStore, InMemoryGameIdStore};
use crate::session::SessionDirector;
use crate::workers::{Command, SessionChannels, SessionWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub game: GameConfig,
    /// Reconciliation period; zero disables polling.
    pub poll_interval: Duration,
    /// Prefix of the per-address key under which the game id is persisted
    pub storage_prefix: String,
    /// Name registered with the final score
    pub username: Option<String>,
    /// Canonical reads tolerated before an unconfirmed prediction is dropped
    pub stale_read_limit: u32,
    /// How long after a local move changes are not reported as external
    pub self_caused_window: Duration,
    /// Directory for the persisted session map; in-memory when unset
    pub data_dir: Option<PathBuf>,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    pub executor: ExecutorConfig,
}

impl RuntimeConfig {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
    pub const DEFAULT_STORAGE_PREFIX: &'static str = "hexed_game_id_";
    pub const DEFAULT_STALE_READ_LIMIT: u32 = 3;
    pub const DEFAULT_SELF_CAUSED_WINDOW_MS: u64 = 1_500;

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `HEXED_POLL_INTERVAL_MS` - Reconciliation period, 0 disables (default: 2000)
    /// - `HEXED_GRID_SIZE` - Side of the square world (default: 20)
    /// - `HEXED_STORAGE_PREFIX` - Session key prefix (default: hexed_game_id_)
    /// - `HEXED_USERNAME` - Name registered with the final score
    /// - `HEXED_STALE_READ_LIMIT` - Reads before a prediction expires (default: 3)
    /// - `HEXED_SELF_CAUSED_WINDOW_MS` - Suppression window after a move (default: 1500)
    /// - `HEXED_DATA_DIR` - Session map directory (default: platform data dir)
    /// - `HEXED_EVENT_CAPACITY` - Event broadcast capacity (default: 64)
    ///
    /// Executor retry settings are read by [`ExecutorConfig::from_env`].
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("HEXED_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(size) = read_env::<u32>("HEXED_GRID_SIZE") {
            config.game = GameConfig::with_grid_size(size);
        }
        if let Ok(prefix) = env::var("HEXED_STORAGE_PREFIX") {
            config.storage_prefix = prefix;
        }
        config.username = env::var("HEXED_USERNAME")
            .ok()
            .filter(|name| !name.is_empty());
        if let Some(limit) = read_env::<u32>("HEXED_STALE_READ_LIMIT") {
            config.stale_read_limit = limit;
        }
        if let Some(ms) = read_env::<u64>("HEXED_SELF_CAUSED_WINDOW_MS") {
            config.self_caused_window = Duration::from_millis(ms);
        }
        if let Some(capacity) = read_env::<usize>("HEXED_EVENT_CAPACITY") {
            config.event_buffer_size = capacity.max(1);
        }
        config.data_dir = env::var("HEXED_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_data_dir);
        config.executor = ExecutorConfig::from_env();

        config
    }

    /// Platform data directory for the client.
    pub fn default_data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hexed").map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.game.grid_size == 0 {
            return Err("Grid size must be positive".to_string());
        }
        if self.storage_prefix.is_empty() {
            return Err("Storage prefix cannot be empty".to_string());
        }
        if self.event_buffer_size == 0 || self.command_buffer_size == 0 {
            return Err("Channel capacities must be positive".to_string());
        }
        self.executor.validate()
    }

    /// Username as a short string word. Unencodable names register as blank.
    fn username_word(&self) -> Word {
        let Some(name) = &self.username else {
            return Word::ZERO;
        };
        Word::from_short_string(name).unwrap_or_else(|err| {
            tracing::warn!(%name, error = %err, "Username not encodable, registering without one");
            Word::ZERO
        })
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            poll_interval: Duration::from_millis(Self::DEFAULT_POLL_INTERVAL_MS),
            storage_prefix: Self::DEFAULT_STORAGE_PREFIX.to_string(),
            username: None,
            stale_read_limit: Self::DEFAULT_STALE_READ_LIMIT,
            self_caused_window: Duration::from_millis(Self::DEFAULT_SELF_CAUSED_WINDOW_MS),
            data_dir: None,
            event_buffer_size: 64,
            command_buffer_size: 32,
            executor: ExecutorConfig::default(),
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// Main runtime that orchestrates one player session
///
/// Design: Runtime owns the worker and coordinates shutdown.
/// [`SessionHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: SessionHandle,
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Subscribe to session events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.handle.subscribe()
    }

    /// Shutdown the runtime gracefully
    ///
    /// The worker stops once every clone of the handle is dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);

        self.worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    reader: Option<Arc<dyn LedgerReader>>,
    ledger_name: Option<String>,
    codec: Option<Arc<EventCodec>>,
    store: Option<Arc<dyn GameIdStore>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            reader: None,
            ledger_name: None,
            codec: None,
            store: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the required ledger backend
    pub fn ledger<L>(mut self, ledger: Arc<L>) -> Self
    where
        L: GameLedger + 'static,
    {
        self.ledger_name = Some(format!("{} ({})", ledger.name(), ledger.network()));
        self.reader = Some(ledger);
        self
    }

    /// Set the event codec (default: the builtin kinds with no selectors)
    pub fn codec(mut self, codec: Arc<EventCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the game id store (default: file store under `data_dir`, else in-memory)
    pub fn store(mut self, store: Arc<dyn GameIdStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the runtime and start its worker
    pub fn build(self) -> Result<Runtime> {
        let reader = self.reader.ok_or(RuntimeError::MissingLedger)?;
        self.config
            .validate()
            .map_err(RuntimeError::InvalidConfig)?;

        let codec = self.codec.unwrap_or_else(|| {
            tracing::warn!("No event codec configured; receipts will decode to nothing");
            Arc::new(EventCodec::new(SchemaTable::default()))
        });

        let store: Arc<dyn GameIdStore> = match (self.store, &self.config.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(FileGameIdStore::new(dir)?),
            (None, None) => Arc::new(InMemoryGameIdStore::new()),
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let (event_tx, _event_rx) =
            broadcast::channel::<SessionEvent>(self.config.event_buffer_size);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let handle = SessionHandle::new(command_tx, event_tx.clone(), snapshot_rx);

        let executor =
            TransactionExecutor::new(reader.clone(), codec, self.config.executor.clone());
        let director = SessionDirector::new(reader.clone(), store, &self.config);
        let worker = SessionWorker::new(
            director,
            executor,
            reader,
            SessionChannels {
                command_rx,
                event_tx,
                snapshot_tx,
            },
            self.config.poll_interval,
            self.config.username_word(),
        );

        tracing::info!(
            ledger = self.ledger_name.as_deref().unwrap_or("unknown"),
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "Runtime started"
        );

        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Runtime {
            handle,
            worker_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use client_blockchain_core::MockLedger;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_prefix, "hexed_game_id_");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.username_word(), Word::ZERO);
    }

    #[test]
    fn username_encodes_as_short_string() {
        let config = RuntimeConfig::default().with_username("alice");
        assert_eq!(config.username_word().to_short_string().as_deref(), Some("alice"));

        let too_long = RuntimeConfig::default().with_username("x".repeat(40));
        assert_eq!(too_long.username_word(), Word::ZERO);
    }

    #[test]
    fn validate_rejects_empty_prefix() {
        let config = RuntimeConfig {
            storage_prefix: String::new(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn build_requires_a_ledger() {
        let err = Runtime::builder().build().err().unwrap();
        assert!(matches!(err, RuntimeError::MissingLedger));
    }

    #[tokio::test]
    async fn shutdown_stops_worker() {
        let ledger = Arc::new(MockLedger::new());
        let runtime = Runtime::builder()
            .config(RuntimeConfig::default().with_poll_interval(Duration::ZERO))
            .codec(ledger.codec())
            .ledger(ledger)
            .build()
            .unwrap();

        assert_eq!(runtime.handle().snapshot(), SessionSnapshot::default());
        runtime.shutdown().await.unwrap();
    }
}
