//! Owner of the canonical [`PlayerState`].
//!
//! The director is the only writer of the player record. Every change flows
//! through one of three doors: a decoded receipt event ([`apply_event`]), a
//! canonical aggregate read ([`apply_state`]), or the move/spawn bookkeeping
//! around a transaction. Network I/O is limited to the reads in
//! [`initialize`] and [`refresh`]; submitting transactions is the worker's job.
//!
//! [`apply_event`]: SessionDirector::apply_event
//! [`apply_state`]: SessionDirector::apply_state
//! [`initialize`]: SessionDirector::initialize
//! [`refresh`]: SessionDirector::refresh

use std::sync::Arc;

use client_blockchain_core::{BlockTag, ExecutorError, LedgerReader, OnChainGameState};
use game_core::{
    Address, CombatSide, Direction, DomainEvent, GameConfig, GameId, HexCoord, PlayerState,
    SessionStatus,
};
use tokio::time::Instant;

use super::optimistic::OptimisticMoveController;
use super::reconcile::{Occurrence, Reconciler};
use crate::api::{MoveOutcome, MoveReport, Result, RuntimeError, SessionSnapshot};
use crate::repository::{GameIdStore, session_key};
use crate::runtime::RuntimeConfig;

/// A move that passed every local guard and is showing optimistically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveTicket {
    pub game_id: GameId,
    pub direction: Direction,
    pub from: HexCoord,
    pub predicted: HexCoord,
    hp_before: u32,
    xp_before: u32,
}

/// What the receipt of a successful move said.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResolution {
    pub outcome: MoveOutcome,
    /// Deaths first learned from the receipt.
    pub deaths: Vec<Occurrence>,
}

pub struct SessionDirector {
    ledger: Arc<dyn LedgerReader>,
    store: Arc<dyn GameIdStore>,
    storage_prefix: String,

    address: Option<Address>,
    state: PlayerState,
    status: SessionStatus,
    moving: bool,

    optimistic: OptimisticMoveController,
    reconciler: Reconciler,
}

impl SessionDirector {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        store: Arc<dyn GameIdStore>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            storage_prefix: config.storage_prefix.clone(),
            address: None,
            state: PlayerState::empty(),
            status: SessionStatus::Disconnected,
            moving: false,
            optimistic: OptimisticMoveController::new(
                config.game.bounds(),
                config.stale_read_limit,
            ),
            reconciler: Reconciler::new(config.self_caused_window),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            address: self.address,
            state: self.state.clone(),
            effective_position: self.state.effective_position(),
            moving: self.moving,
        }
    }

    fn storage_key(&self) -> Option<String> {
        self.address
            .map(|address| session_key(&self.storage_prefix, address))
    }

    fn active_game(&self) -> Option<GameId> {
        self.state.game_id.filter(|_| self.state.is_spawned)
    }

    fn clear_session(&mut self) {
        self.state = PlayerState::empty();
        self.optimistic.reset(&mut self.state);
        self.reconciler.reset();
        self.moving = false;
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Connects `address` and resumes its persisted game if the ledger agrees.
    ///
    /// A stored id whose owner differs from `address` is discarded and
    /// reported as [`RuntimeError::OwnershipMismatch`]; the session is left in
    /// `NoActiveGame` so a fresh spawn can follow.
    pub async fn initialize(&mut self, address: Address) -> Result<SessionStatus> {
        if self.moving {
            return Err(RuntimeError::AlreadyMoving);
        }

        self.clear_session();
        self.address = Some(address);
        self.status = SessionStatus::Initializing;

        let key = session_key(&self.storage_prefix, address);
        let Some(game_id) = self.store.load(&key)? else {
            tracing::info!(address = %address.to_short_hex(), "No persisted game");
            self.status = SessionStatus::NoActiveGame;
            return Ok(self.status);
        };

        let onchain = match self.ledger.get_game_state(game_id, BlockTag::PreConfirmed).await {
            Ok(onchain) => onchain,
            Err(err) => {
                self.status = SessionStatus::Disconnected;
                return Err(err.into());
            }
        };

        let Some(onchain) = onchain else {
            tracing::warn!(%game_id, "Persisted game unknown to the ledger, discarding it");
            self.store.remove(&key)?;
            self.status = SessionStatus::NoActiveGame;
            return Ok(self.status);
        };

        if onchain.player != address {
            tracing::warn!(
                %game_id,
                owner = %onchain.player.to_short_hex(),
                connected = %address.to_short_hex(),
                "Persisted game belongs to another address, discarding it"
            );
            self.store.remove(&key)?;
            self.status = SessionStatus::NoActiveGame;
            return Err(RuntimeError::OwnershipMismatch {
                game_id,
                owner: onchain.player,
                connected: address,
            });
        }

        if !onchain.is_active && !onchain.is_dead() {
            tracing::info!(%game_id, "Persisted game has ended, discarding it");
            self.store.remove(&key)?;
            self.status = SessionStatus::NoActiveGame;
            return Ok(self.status);
        }

        self.apply_state(&onchain, Instant::now());
        if self.state.is_dead {
            // Died in an earlier run; not a new death.
            self.reconciler.report_death();
        }

        tracing::info!(
            %game_id,
            position = %onchain.position,
            hp = onchain.hp,
            status = %self.status,
            "Session resumed"
        );
        Ok(self.status)
    }

    /// Re-reads the aggregate state and diffs it against the last read.
    pub async fn refresh(&mut self) -> Result<Vec<Occurrence>> {
        let game_id = self.active_game().ok_or(RuntimeError::NoActiveGame)?;
        let onchain = self
            .ledger
            .get_game_state(game_id, BlockTag::PreConfirmed)
            .await?;

        let Some(onchain) = onchain else {
            tracing::warn!(%game_id, "Game missing from ledger during refresh");
            return Ok(Vec::new());
        };

        Ok(self.apply_state(&onchain, Instant::now()))
    }

    /// Repopulates the player record from one aggregate read.
    ///
    /// The diff against the previous read is taken before anything is
    /// overwritten.
    pub fn apply_state(&mut self, onchain: &OnChainGameState, now: Instant) -> Vec<Occurrence> {
        let occurrences = self.reconciler.observe(onchain, now);

        let was_dead = self.state.is_dead;
        let state = &mut self.state;
        state.game_id = Some(onchain.game_id);
        state.position = onchain.position;
        state.hp = onchain.hp;
        state.max_hp = onchain.max_hp;
        state.xp = onchain.xp;
        state.can_move = onchain.can_move;
        state.last_direction = onchain.last_direction;
        state.occupied_neighbors = onchain.neighbor_occupancy;
        state.is_spawned = true;
        state.is_dead = onchain.is_dead();

        self.optimistic.observe(&mut self.state, onchain.position);

        if self.state.is_dead {
            self.optimistic.reset(&mut self.state);
            if !was_dead {
                tracing::info!(game_id = %onchain.game_id, xp = onchain.xp, "Player died");
            }
            self.status = SessionStatus::Dead;
        } else {
            self.status = SessionStatus::Active;
        }

        occurrences
    }

    /// Returns to the lobby: forgets the game and its persisted hint.
    pub fn reset(&mut self) -> Result<SessionStatus> {
        if self.moving {
            return Err(RuntimeError::AlreadyMoving);
        }
        if let Some(key) = self.storage_key() {
            self.store.remove(&key)?;
        }

        self.clear_session();
        self.status = if self.address.is_some() {
            SessionStatus::NoActiveGame
        } else {
            SessionStatus::Disconnected
        };
        tracing::info!(status = %self.status, "Session reset");
        Ok(self.status)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Applies one decoded receipt event.
    ///
    /// Only fields the event speaks about change. Events about other games
    /// are ignored. Returns the death occurrence when this event is the first
    /// report of the local player's death.
    pub fn apply_event(&mut self, event: &DomainEvent) -> Option<Occurrence> {
        let address = self.address?;

        if let DomainEvent::Spawned {
            game_id,
            player,
            position,
        } = event
        {
            if *player == address && !self.state.is_alive() {
                self.clear_session();
                self.state = PlayerState {
                    game_id: Some(*game_id),
                    position: *position,
                    hp: GameConfig::SPAWN_HP,
                    max_hp: GameConfig::SPAWN_MAX_HP,
                    can_move: true,
                    is_spawned: true,
                    ..PlayerState::empty()
                };
                self.status = SessionStatus::Active;
            }
            return None;
        }

        let game_id = self.active_game()?;
        if !event.involves(game_id) {
            return None;
        }

        let was_dead = self.state.is_dead;
        match event {
            DomainEvent::Moved {
                direction,
                position,
                ..
            } => {
                self.state.position = *position;
                self.state.last_direction = Some(*direction);
                self.state.can_move = false;
            }
            DomainEvent::CombatResult(report) => match report.side_of(game_id) {
                Some(CombatSide::Attacker) => {
                    let hp = self
                        .state
                        .hp
                        .saturating_sub(report.retaliation_damage)
                        .saturating_add(report.hp_reward);
                    self.state.hp = hp.min(self.state.max_hp);
                    self.state.xp = self.state.xp.saturating_add(report.xp_awarded);
                    self.state.can_move = false;
                    if report.attacker_died {
                        self.mark_dead();
                    }
                }
                Some(CombatSide::Defender) => {
                    self.state.hp = self.state.hp.saturating_sub(report.damage_dealt);
                    if report.defender_died {
                        self.mark_dead();
                    }
                }
                None => {}
            },
            DomainEvent::NeighborsRevealed { mask, .. } => {
                self.state.occupied_neighbors = *mask;
            }
            DomainEvent::EncounterOccurred {
                hp_after,
                max_hp_after,
                xp_after,
                died,
                ..
            } => {
                self.state.hp = *hp_after;
                self.state.max_hp = *max_hp_after;
                self.state.xp = *xp_after;
                if *died {
                    self.mark_dead();
                }
            }
            DomainEvent::PlayerDied { position, .. } => {
                self.state.position = *position;
                self.mark_dead();
            }
            DomainEvent::Spawned { .. }
            | DomainEvent::HighestScoreUpdated { .. }
            | DomainEvent::Unknown => {}
        }

        (!was_dead && self.state.is_dead && self.reconciler.report_death()).then(|| {
            Occurrence::Died {
                game_id,
                xp: self.state.xp,
                position: self.state.position,
            }
        })
    }

    fn mark_dead(&mut self) {
        self.state.hp = 0;
        self.state.is_dead = true;
        self.optimistic.reset(&mut self.state);
        self.status = SessionStatus::Dead;
    }

    // ========================================================================
    // Moves
    // ========================================================================

    /// Checks every local guard, then publishes the optimistic position.
    pub fn begin_move(&mut self, direction: Direction) -> Result<MoveTicket> {
        if self.address.is_none() {
            return Err(RuntimeError::NotConnected);
        }
        if self.status == SessionStatus::Dead || self.state.is_dead {
            return Err(RuntimeError::SessionDead);
        }
        let game_id = self.active_game().ok_or(RuntimeError::NoActiveGame)?;
        if self.moving {
            return Err(RuntimeError::AlreadyMoving);
        }
        if !self.state.can_move {
            return Err(RuntimeError::CannotMoveYet);
        }

        let from = self.state.effective_position().unwrap_or(self.state.position);
        let predicted = self
            .optimistic
            .begin(&mut self.state, direction)
            .ok_or(RuntimeError::MoveOutOfBounds { from, direction })?;

        self.moving = true;
        self.reconciler.suppress_from(Instant::now());

        Ok(MoveTicket {
            game_id,
            direction,
            from,
            predicted,
            hp_before: self.state.hp,
            xp_before: self.state.xp,
        })
    }

    /// Settles the optimistic position against the executor's verdict.
    ///
    /// A revert or a failed submission rolls the prediction back. A timeout
    /// keeps it: the outcome is unknown and the next read decides. A success
    /// keeps it too, retargeted to the cell the receipt reports (landing cell
    /// or the attacker's cell after combat).
    pub fn finish_move(
        &mut self,
        ticket: &MoveTicket,
        result: std::result::Result<Vec<DomainEvent>, ExecutorError>,
    ) -> Result<MoveResolution> {
        self.moving = false;
        self.reconciler.suppress_from(Instant::now());

        let events = match result {
            Ok(events) => events,
            Err(err @ ExecutorError::Timeout { .. }) => {
                tracing::warn!(
                    direction = %ticket.direction,
                    error = %err,
                    "Move outcome unknown, keeping prediction until a read settles it"
                );
                return Err(err.into());
            }
            Err(err) => {
                self.optimistic.rollback(&mut self.state);
                return Err(err.into());
            }
        };

        let mut outcome = MoveOutcome::Moved;
        let mut landed = None;
        let mut fought_from = None;
        let mut deaths = Vec::new();
        for event in &events {
            match event {
                DomainEvent::Moved {
                    game_id, position, ..
                } if *game_id == ticket.game_id => landed = Some(*position),
                DomainEvent::CombatResult(report) if report.attacker_game_id == ticket.game_id => {
                    fought_from = Some(report.attacker_position);
                    outcome = if report.attacker_won {
                        MoveOutcome::CombatWon
                    } else {
                        MoveOutcome::CombatLost
                    };
                }
                _ => {}
            }
            deaths.extend(self.apply_event(event));
        }

        // The override is only ever cleared by a canonical read. A receipt
        // without a landing cell leaves the prediction for `apply_state` to
        // settle or expire.
        if let Some(position) = landed.or(fought_from) {
            self.optimistic.confirm(&mut self.state, position);
        }
        if self.state.is_dead {
            outcome = MoveOutcome::Died;
        }

        tracing::info!(
            direction = %ticket.direction,
            %outcome,
            events = events.len(),
            "Move accepted"
        );
        Ok(MoveResolution { outcome, deaths })
    }

    /// Summary of a move measured against the current record.
    pub fn move_report(&self, ticket: &MoveTicket, outcome: MoveOutcome) -> MoveReport {
        let outcome = if self.state.is_dead {
            MoveOutcome::Died
        } else {
            outcome
        };
        MoveReport {
            direction: ticket.direction,
            position: self.state.effective_position().unwrap_or(ticket.from),
            outcome,
            hp_delta: i64::from(self.state.hp) - i64::from(ticket.hp_before),
            xp_delta: i64::from(self.state.xp) - i64::from(ticket.xp_before),
        }
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    /// Address to spawn for, if nothing forbids a new game.
    pub fn begin_spawn(&self) -> Result<Address> {
        let address = self.address.ok_or(RuntimeError::NotConnected)?;
        if self.status == SessionStatus::Dead {
            return Err(RuntimeError::SessionDead);
        }
        if self.state.is_alive() {
            return Err(RuntimeError::AlreadySpawned);
        }
        if self.moving {
            return Err(RuntimeError::AlreadyMoving);
        }
        Ok(address)
    }

    /// Applies the spawn receipt and persists the new game id.
    pub fn finish_spawn(&mut self, events: &[DomainEvent]) -> Result<GameId> {
        for event in events {
            self.apply_event(event);
        }

        let game_id = self.active_game().ok_or(RuntimeError::SpawnNotObserved)?;
        if let Some(key) = self.storage_key() {
            self.store.save(&key, game_id)?;
        }
        tracing::info!(%game_id, position = %self.state.position, "Spawned");
        Ok(game_id)
    }
}

#[cfg(test)]
mod tests {
    use client_blockchain_core::MockLedger;
    use game_core::{CombatReport, NeighborMask};

    use super::*;
    use crate::repository::InMemoryGameIdStore;

    fn alice() -> Address {
        "0xa11ce".parse().unwrap()
    }

    fn onchain(game_id: u32, player: Address) -> OnChainGameState {
        OnChainGameState {
            game_id: GameId(game_id),
            player,
            position: HexCoord::new(3, 4),
            last_direction: Some(Direction::East),
            can_move: true,
            is_active: true,
            hp: 90,
            max_hp: 110,
            xp: 12,
            neighbor_occupancy: NeighborMask::WEST,
        }
    }

    fn director(ledger: &MockLedger, store: Arc<InMemoryGameIdStore>) -> SessionDirector {
        SessionDirector::new(Arc::new(ledger.clone()), store, &RuntimeConfig::default())
    }

    fn key(address: Address) -> String {
        session_key(RuntimeConfig::DEFAULT_STORAGE_PREFIX, address)
    }

    #[tokio::test]
    async fn initialize_without_hint_waits_for_spawn() {
        let ledger = MockLedger::new();
        let mut director = director(&ledger, Arc::new(InMemoryGameIdStore::new()));

        let status = director.initialize(alice()).await.unwrap();
        assert_eq!(status, SessionStatus::NoActiveGame);
        assert!(!director.state().is_spawned);
        assert_eq!(ledger.state_reads(), 0);
    }

    #[tokio::test]
    async fn initialize_repopulates_from_one_read() {
        let ledger = MockLedger::new();
        ledger.insert_game(onchain(7, alice()));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(7)).unwrap();

        let mut director = director(&ledger, store);
        let status = director.initialize(alice()).await.unwrap();

        assert_eq!(status, SessionStatus::Active);
        assert_eq!(ledger.state_reads(), 1);
        let state = director.state();
        assert_eq!(state.game_id, Some(GameId(7)));
        assert_eq!(state.position, HexCoord::new(3, 4));
        assert_eq!((state.hp, state.max_hp, state.xp), (90, 110, 12));
        assert_eq!(state.last_direction, Some(Direction::East));
        assert!(state.neighbor_occupied(Direction::West));
    }

    #[tokio::test]
    async fn ownership_mismatch_discards_hint() {
        let ledger = MockLedger::new();
        let mallory: Address = "0xbad".parse().unwrap();
        ledger.insert_game(onchain(7, mallory));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(7)).unwrap();

        let mut director = director(&ledger, store.clone());
        let err = director.initialize(alice()).await.unwrap_err();

        assert!(matches!(
            err,
            RuntimeError::OwnershipMismatch { game_id: GameId(7), owner, connected }
                if owner == mallory && connected == alice()
        ));
        assert_eq!(store.load(&key(alice())).unwrap(), None);
        assert_eq!(director.status(), SessionStatus::NoActiveGame);
        assert!(!director.state().is_spawned);
    }

    #[tokio::test]
    async fn ownership_compares_normalized_addresses() {
        let ledger = MockLedger::new();
        let padded: Address = "0x00000000000000000000000000000000000000000000000000000000000A11CE"
            .parse()
            .unwrap();
        ledger.insert_game(onchain(3, padded));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(3)).unwrap();

        let mut director = director(&ledger, store);
        assert_eq!(
            director.initialize(alice()).await.unwrap(),
            SessionStatus::Active
        );
    }

    #[tokio::test]
    async fn resuming_a_dead_game_does_not_report_a_new_death() {
        let ledger = MockLedger::new();
        ledger.insert_game(OnChainGameState {
            is_active: false,
            hp: 0,
            ..onchain(5, alice())
        });
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(5)).unwrap();

        let mut director = director(&ledger, store);
        assert_eq!(
            director.initialize(alice()).await.unwrap(),
            SessionStatus::Dead
        );
        assert!(director.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_for_other_games_are_ignored() {
        let ledger = MockLedger::new();
        ledger.insert_game(onchain(7, alice()));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(7)).unwrap();
        let mut director = director(&ledger, store);
        director.initialize(alice()).await.unwrap();

        let before = director.state().clone();
        director.apply_event(&DomainEvent::Moved {
            game_id: GameId(8),
            direction: Direction::West,
            position: HexCoord::new(0, 0),
        });
        director.apply_event(&DomainEvent::Unknown);
        assert_eq!(director.state(), &before);
    }

    #[tokio::test]
    async fn events_touch_only_their_fields() {
        let ledger = MockLedger::new();
        ledger.insert_game(onchain(7, alice()));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(7)).unwrap();
        let mut director = director(&ledger, store);
        director.initialize(alice()).await.unwrap();

        director.apply_event(&DomainEvent::NeighborsRevealed {
            game_id: GameId(7),
            position: HexCoord::new(3, 4),
            mask: NeighborMask::EAST | NeighborMask::SOUTH_EAST,
        });
        let state = director.state();
        assert!(state.neighbor_occupied(Direction::SouthEast));
        assert_eq!(state.hp, 90);
        assert_eq!(state.position, HexCoord::new(3, 4));

        director.apply_event(&DomainEvent::EncounterOccurred {
            game_id: GameId(7),
            is_gift: true,
            outcome: 2,
            hp_after: 105,
            max_hp_after: 120,
            xp_after: 20,
            died: false,
        });
        let state = director.state();
        assert_eq!((state.hp, state.max_hp, state.xp), (105, 120, 20));
        assert!(state.neighbor_occupied(Direction::East));
    }

    #[tokio::test]
    async fn defending_to_death_reports_once() {
        let ledger = MockLedger::new();
        ledger.insert_game(onchain(7, alice()));
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(7)).unwrap();
        let mut director = director(&ledger, store);
        director.initialize(alice()).await.unwrap();

        let combat = DomainEvent::CombatResult(CombatReport {
            attacker_game_id: GameId(2),
            defender_game_id: GameId(7),
            attacker_won: true,
            attacker_position: HexCoord::new(2, 4),
            defender_position: HexCoord::new(3, 4),
            damage_dealt: 90,
            retaliation_damage: 5,
            xp_awarded: 10,
            hp_reward: 0,
            attacker_died: false,
            defender_died: true,
        });

        let died = director.apply_event(&combat);
        assert!(matches!(died, Some(Occurrence::Died { game_id: GameId(7), .. })));
        assert_eq!(director.status(), SessionStatus::Dead);
        assert_eq!(director.state().hp, 0);

        assert_eq!(director.apply_event(&combat), None);
    }

    #[tokio::test]
    async fn move_guards() {
        let ledger = MockLedger::new();
        let mut director = director(&ledger, Arc::new(InMemoryGameIdStore::new()));
        assert!(matches!(
            director.begin_move(Direction::East),
            Err(RuntimeError::NotConnected)
        ));

        director.initialize(alice()).await.unwrap();
        assert!(matches!(
            director.begin_move(Direction::East),
            Err(RuntimeError::NoActiveGame)
        ));

        director.apply_event(&DomainEvent::Spawned {
            game_id: GameId(1),
            player: alice(),
            position: HexCoord::ORIGIN,
        });
        assert!(matches!(
            director.begin_move(Direction::West),
            Err(RuntimeError::MoveOutOfBounds { .. })
        ));

        let ticket = director.begin_move(Direction::East).unwrap();
        assert_eq!(ticket.predicted, HexCoord::new(1, 0));
        assert!(matches!(
            director.begin_move(Direction::East),
            Err(RuntimeError::AlreadyMoving)
        ));
    }

    #[tokio::test]
    async fn revert_rolls_back_prediction() {
        let ledger = MockLedger::new();
        let mut director = director(&ledger, Arc::new(InMemoryGameIdStore::new()));
        director.initialize(alice()).await.unwrap();
        director.apply_event(&DomainEvent::Spawned {
            game_id: GameId(1),
            player: alice(),
            position: HexCoord::ORIGIN,
        });

        let ticket = director.begin_move(Direction::SouthEast).unwrap();
        assert_eq!(
            director.state().effective_position(),
            Some(HexCoord::new(0, 1))
        );

        let reverted = Err(ExecutorError::Reverted {
            hash: client_blockchain_core::TransactionHash(client_blockchain_core::Word::ONE),
            reason: "cannot move yet".into(),
        });
        let err = director.finish_move(&ticket, reverted).unwrap_err();

        assert!(err.is_revert());
        assert!(!director.is_moving());
        assert_eq!(director.state().effective_position(), Some(HexCoord::ORIGIN));
    }

    #[tokio::test]
    async fn combat_receipt_keeps_player_in_place() {
        let ledger = MockLedger::new();
        let mut director = director(&ledger, Arc::new(InMemoryGameIdStore::new()));
        director.initialize(alice()).await.unwrap();
        director.apply_event(&DomainEvent::Spawned {
            game_id: GameId(1),
            player: alice(),
            position: HexCoord::ORIGIN,
        });

        let ticket = director.begin_move(Direction::East).unwrap();
        let events = vec![DomainEvent::CombatResult(CombatReport {
            attacker_game_id: GameId(1),
            defender_game_id: GameId(2),
            attacker_won: true,
            attacker_position: HexCoord::ORIGIN,
            defender_position: HexCoord::new(1, 0),
            damage_dealt: 20,
            retaliation_damage: 5,
            xp_awarded: 10,
            hp_reward: 0,
            attacker_died: false,
            defender_died: false,
        })];

        let resolution = director.finish_move(&ticket, Ok(events)).unwrap();
        assert_eq!(resolution.outcome, MoveOutcome::CombatWon);
        assert!(resolution.deaths.is_empty());
        assert_eq!(director.state().effective_position(), Some(HexCoord::ORIGIN));
        assert_eq!(director.state().optimistic_position, Some(HexCoord::ORIGIN));

        let report = director.move_report(&ticket, resolution.outcome);
        assert_eq!(report.hp_delta, -5);
        assert_eq!(report.xp_delta, 10);
        assert!(!director.state().can_move);

        director.apply_state(
            &OnChainGameState {
                position: HexCoord::ORIGIN,
                ..onchain(1, alice())
            },
            Instant::now(),
        );
        assert_eq!(director.state().optimistic_position, None);
        assert_eq!(director.state().effective_position(), Some(HexCoord::ORIGIN));
    }

    #[tokio::test]
    async fn receipt_without_landing_cell_keeps_prediction_until_read() {
        let ledger = MockLedger::new();
        let mut director = director(&ledger, Arc::new(InMemoryGameIdStore::new()));
        director.initialize(alice()).await.unwrap();
        director.apply_event(&DomainEvent::Spawned {
            game_id: GameId(1),
            player: alice(),
            position: HexCoord::ORIGIN,
        });

        let ticket = director.begin_move(Direction::East).unwrap();
        let resolution = director.finish_move(&ticket, Ok(Vec::new())).unwrap();
        assert_eq!(resolution.outcome, MoveOutcome::Moved);
        assert!(!director.is_moving());
        assert_eq!(director.state().optimistic_position, Some(HexCoord::new(1, 0)));
        assert_eq!(director.state().effective_position(), Some(HexCoord::new(1, 0)));

        director.apply_state(
            &OnChainGameState {
                position: HexCoord::new(1, 0),
                ..onchain(1, alice())
            },
            Instant::now(),
        );
        assert_eq!(director.state().optimistic_position, None);
        assert_eq!(director.state().position, HexCoord::new(1, 0));
    }

    #[tokio::test]
    async fn reset_returns_to_lobby_and_forgets_hint() {
        let ledger = MockLedger::new();
        ledger.insert_game(OnChainGameState {
            is_active: false,
            hp: 0,
            ..onchain(5, alice())
        });
        let store = Arc::new(InMemoryGameIdStore::new());
        store.save(&key(alice()), GameId(5)).unwrap();
        let mut director = director(&ledger, store.clone());
        director.initialize(alice()).await.unwrap();
        assert!(matches!(
            director.begin_spawn(),
            Err(RuntimeError::SessionDead)
        ));

        assert_eq!(director.reset().unwrap(), SessionStatus::NoActiveGame);
        assert_eq!(store.load(&key(alice())).unwrap(), None);
        assert_eq!(director.state(), &PlayerState::empty());
        assert_eq!(director.begin_spawn().unwrap(), alice());
    }
}
