//! In-memory ledger for tests.
//!
//! [`MockLedger`] plays the game contract: it keeps game sessions, applies
//! `spawn`/`move`/`register_score` batches atomically and records receipts whose
//! log records are encoded exactly like the real world contract emits them.
//! Tests script latency, reverts, stale reads and external attacks through the
//! `pub` helpers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use game_core::{
    Address, CombatReport, Direction, DomainEvent, GameConfig, GameId, HexCoord, NeighborMask,
    WorldBounds,
};

use crate::codec::{EventCodec, EventKind, SchemaTable};
use crate::executor::{ExecutorConfig, TransactionExecutor};
use crate::traits::{GameLedger, LedgerReader, SessionAccount, TransportError};
use crate::types::{
    BlockTag, ExecutionStatus, FinalityStatus, HighestScore, LedgerCall, OnChainGameState,
    Receipt, TransactionHash,
};
use crate::word::Word;

/// Damage a winning attacker deals.
const COMBAT_DAMAGE: u32 = 20;
const COMBAT_RETALIATION: u32 = 5;
const COMBAT_XP: u32 = 10;

struct StoredReceipt {
    receipt: Receipt,
    pending_polls: u32,
    ready_reads: u32,
}

#[derive(Default)]
struct MockWorld {
    games: HashMap<GameId, OnChainGameState>,
    next_game_id: u32,
    receipts: HashMap<TransactionHash, StoredReceipt>,
    tx_counter: u64,
    highest: Option<HighestScore>,

    revert_next: Option<String>,
    receipt_delay: u32,
    hold_cooldown: bool,
    stale_reads: VecDeque<OnChainGameState>,
    failing_reads: u32,

    submitted: usize,
    state_reads: usize,
    receipt_reads: usize,
    register_calls: Vec<(Address, Word, u32)>,
}

impl MockWorld {
    fn occupant(&self, at: HexCoord, except: GameId) -> Option<GameId> {
        self.games
            .values()
            .find(|g| g.is_active && g.position == at && g.game_id != except)
            .map(|g| g.game_id)
    }

    fn neighbor_mask(&self, game: &OnChainGameState) -> NeighborMask {
        game.position
            .neighbors()
            .filter(|(_, cell)| self.occupant(*cell, game.game_id).is_some())
            .fold(NeighborMask::empty(), |mask, (d, _)| {
                mask | NeighborMask::for_direction(d)
            })
    }

    fn view(&self, game: &OnChainGameState) -> OnChainGameState {
        OnChainGameState {
            neighbor_occupancy: self.neighbor_mask(game),
            ..game.clone()
        }
    }
}

/// In-memory stand-in for the game contract and its node.
#[derive(Clone)]
pub struct MockLedger {
    world: Arc<Mutex<MockWorld>>,
    codec: Arc<EventCodec>,
    bounds: WorldBounds,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::with_bounds(GameConfig::default().bounds())
    }

    pub fn with_bounds(bounds: WorldBounds) -> Self {
        Self {
            world: Arc::new(Mutex::new(MockWorld {
                next_game_id: 1,
                ..MockWorld::default()
            })),
            codec: Arc::new(EventCodec::new(Self::schema_table())),
            bounds,
        }
    }

    /// Selector table the mock encodes its records with.
    pub fn schema_table() -> SchemaTable {
        SchemaTable::builtin(|kind| {
            let index = EventKind::ALL.iter().position(|k| *k == kind)? as u64;
            Some(Word::from_u64(0x6d6f636b_0000 + index))
        })
    }

    pub fn codec(&self) -> Arc<EventCodec> {
        self.codec.clone()
    }

    /// Executor reading from this ledger, without an account.
    pub fn executor(&self, config: ExecutorConfig) -> TransactionExecutor {
        TransactionExecutor::new(Arc::new(self.clone()), self.codec.clone(), config)
    }

    /// Session account signing as `address`.
    pub fn account(&self, address: Address) -> Arc<dyn SessionAccount> {
        Arc::new(MockAccount {
            address,
            ledger: self.clone(),
        })
    }

    fn world(&self) -> MutexGuard<'_, MockWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== scripting =====

    /// Next submitted transaction reverts with `reason` and changes nothing.
    pub fn revert_next(&self, reason: &str) {
        self.world().revert_next = Some(reason.to_string());
    }

    /// Receipts of later transactions stay unknown for `polls` reads.
    pub fn delay_receipts(&self, polls: u32) {
        self.world().receipt_delay = polls;
    }

    /// While held, `can_move` stays false for every game.
    pub fn hold_cooldown(&self, hold: bool) {
        let mut world = self.world();
        world.hold_cooldown = hold;
        if hold {
            world.games.values_mut().for_each(|g| g.can_move = false);
        }
    }

    /// The next state read returns `state` instead of the live one.
    pub fn queue_stale_read(&self, state: OnChainGameState) {
        self.world().stale_reads.push_back(state);
    }

    /// The next `count` state reads fail with a network error.
    pub fn fail_next_reads(&self, count: u32) {
        self.world().failing_reads = count;
    }

    /// Seeds a session directly, e.g. one owned by another account.
    pub fn insert_game(&self, state: OnChainGameState) {
        let mut world = self.world();
        world.next_game_id = world.next_game_id.max(state.game_id.0 + 1);
        world.games.insert(state.game_id, state);
    }

    /// Mutates a session out of band, as another player's transaction would.
    pub fn modify_game(&self, game_id: GameId, f: impl FnOnce(&mut OnChainGameState)) {
        if let Some(game) = self.world().games.get_mut(&game_id) {
            f(game);
        }
    }

    pub fn game(&self, game_id: GameId) -> Option<OnChainGameState> {
        let world = self.world();
        world.games.get(&game_id).map(|g| world.view(g))
    }

    // ===== counters =====

    pub fn submitted_count(&self) -> usize {
        self.world().submitted
    }

    pub fn state_reads(&self) -> usize {
        self.world().state_reads
    }

    pub fn receipt_reads(&self) -> usize {
        self.world().receipt_reads
    }

    pub fn register_score_calls(&self) -> Vec<(Address, Word, u32)> {
        self.world().register_calls.clone()
    }

    // ===== contract =====

    fn submit(&self, caller: Address, calls: &[LedgerCall]) -> TransactionHash {
        let mut world = self.world();
        world.submitted += 1;
        world.tx_counter += 1;
        let hash = TransactionHash(Word::from_u64(0x7478_0000 + world.tx_counter));

        let outcome = match world.revert_next.take() {
            Some(reason) => Err(reason),
            None => {
                let snapshot_games = world.games.clone();
                let snapshot_next = world.next_game_id;
                let snapshot_highest = world.highest.clone();
                let mut events = Vec::new();
                let result = calls
                    .iter()
                    .try_for_each(|call| self.apply(&mut world, caller, call, &mut events));
                if result.is_err() {
                    world.games = snapshot_games;
                    world.next_game_id = snapshot_next;
                    world.highest = snapshot_highest;
                }
                result.map(|()| events)
            }
        };

        let (execution, events) = match outcome {
            Ok(events) => (
                ExecutionStatus::Succeeded,
                events
                    .iter()
                    .filter_map(|event| self.codec.encode(event))
                    .collect(),
            ),
            Err(reason) => (ExecutionStatus::Reverted { reason }, Vec::new()),
        };

        let pending_polls = world.receipt_delay;
        world.receipts.insert(
            hash,
            StoredReceipt {
                receipt: Receipt {
                    hash,
                    finality: FinalityStatus::PreConfirmed,
                    execution,
                    events,
                },
                pending_polls,
                ready_reads: 0,
            },
        );
        hash
    }

    fn apply(
        &self,
        world: &mut MockWorld,
        caller: Address,
        call: &LedgerCall,
        events: &mut Vec<DomainEvent>,
    ) -> Result<(), String> {
        match call {
            LedgerCall::Spawn => {
                let game_id = GameId(world.next_game_id);
                world.next_game_id += 1;
                let game = OnChainGameState {
                    game_id,
                    player: caller,
                    position: HexCoord::ORIGIN,
                    last_direction: None,
                    can_move: !world.hold_cooldown,
                    is_active: true,
                    hp: GameConfig::SPAWN_HP,
                    max_hp: GameConfig::SPAWN_MAX_HP,
                    xp: 0,
                    neighbor_occupancy: NeighborMask::empty(),
                };
                let mask = world.neighbor_mask(&game);
                world.games.insert(game_id, game);
                events.push(DomainEvent::Spawned {
                    game_id,
                    player: caller,
                    position: HexCoord::ORIGIN,
                });
                events.push(DomainEvent::NeighborsRevealed {
                    game_id,
                    position: HexCoord::ORIGIN,
                    mask,
                });
                Ok(())
            }
            LedgerCall::Move { game_id, direction } => {
                let game = world
                    .games
                    .get(game_id)
                    .cloned()
                    .ok_or_else(|| "game not found".to_string())?;
                if game.player != caller {
                    return Err("not game owner".to_string());
                }
                if !game.is_active {
                    return Err("game not active".to_string());
                }
                if !game.can_move {
                    return Err("cannot move yet".to_string());
                }
                let target = game
                    .position
                    .neighbor(*direction)
                    .ok_or_else(|| "move out of bounds".to_string())?;
                if !self.bounds.contains(target) {
                    return Err("move out of bounds".to_string());
                }

                match world.occupant(target, *game_id) {
                    Some(defender_id) => Self::fight(world, *game_id, defender_id, *direction, events),
                    None => {
                        if let Some(mover) = world.games.get_mut(game_id) {
                            mover.position = target;
                            mover.last_direction = Some(*direction);
                            mover.can_move = false;
                        }
                        events.push(DomainEvent::Moved {
                            game_id: *game_id,
                            direction: *direction,
                            position: target,
                        });
                    }
                }

                if let Some(mover) = world.games.get(game_id).cloned() {
                    let mask = world.neighbor_mask(&mover);
                    events.push(DomainEvent::NeighborsRevealed {
                        game_id: *game_id,
                        position: mover.position,
                        mask,
                    });
                }
                Ok(())
            }
            LedgerCall::RegisterScore {
                player,
                username,
                xp,
            } => {
                world.register_calls.push((*player, *username, *xp));
                let beats = world.highest.as_ref().is_none_or(|h| *xp > h.xp);
                if beats {
                    world.highest = Some(HighestScore {
                        player: *player,
                        username: *username,
                        xp: *xp,
                    });
                    events.push(DomainEvent::HighestScoreUpdated {
                        player: *player,
                        username: username.to_short_string().unwrap_or_default(),
                        xp: *xp,
                    });
                }
                Ok(())
            }
        }
    }

    /// Higher hp wins; ties go to the attacker. Nobody changes cells.
    fn fight(
        world: &mut MockWorld,
        attacker_id: GameId,
        defender_id: GameId,
        direction: Direction,
        events: &mut Vec<DomainEvent>,
    ) {
        let (Some(attacker), Some(defender)) = (
            world.games.get(&attacker_id).cloned(),
            world.games.get(&defender_id).cloned(),
        ) else {
            return;
        };
        let attacker_won = attacker.hp >= defender.hp;
        let (damage_dealt, retaliation_damage, xp_awarded) = if attacker_won {
            (COMBAT_DAMAGE, COMBAT_RETALIATION, COMBAT_XP)
        } else {
            (0, COMBAT_DAMAGE, 0)
        };

        let defender_hp = defender.hp.saturating_sub(damage_dealt);
        let attacker_hp = attacker.hp.saturating_sub(retaliation_damage);
        let defender_died = defender_hp == 0;
        let attacker_died = attacker_hp == 0;

        if let Some(d) = world.games.get_mut(&defender_id) {
            d.hp = defender_hp;
            d.is_active = !defender_died;
        }
        if let Some(a) = world.games.get_mut(&attacker_id) {
            a.hp = attacker_hp;
            a.xp += xp_awarded;
            a.is_active = !attacker_died;
            a.last_direction = Some(direction);
            a.can_move = false;
        }

        events.push(DomainEvent::CombatResult(CombatReport {
            attacker_game_id: attacker_id,
            defender_game_id: defender_id,
            attacker_won,
            attacker_position: attacker.position,
            defender_position: defender.position,
            damage_dealt,
            retaliation_damage,
            xp_awarded,
            hp_reward: 0,
            attacker_died,
            defender_died,
        }));
        for (died, victim, killer, position) in [
            (defender_died, defender_id, attacker_id, defender.position),
            (attacker_died, attacker_id, defender_id, attacker.position),
        ] {
            if died {
                events.push(DomainEvent::PlayerDied {
                    game_id: victim,
                    killed_by: Some(killer),
                    position,
                });
            }
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn get_game_state(
        &self,
        game_id: GameId,
        _tag: BlockTag,
    ) -> Result<Option<OnChainGameState>, TransportError> {
        let mut world = self.world();
        world.state_reads += 1;
        if world.failing_reads > 0 {
            world.failing_reads -= 1;
            return Err(TransportError::NetworkError("mock read failure".to_string()));
        }
        if world
            .stale_reads
            .front()
            .is_some_and(|stale| stale.game_id == game_id)
        {
            return Ok(world.stale_reads.pop_front());
        }

        let view = world.games.get(&game_id).map(|g| world.view(g));
        // A cooldown lasts until it has been observed once.
        if let Some(state) = &view
            && !state.can_move
            && !world.hold_cooldown
            && state.is_active
            && let Some(game) = world.games.get_mut(&game_id)
        {
            game.can_move = true;
        }
        Ok(view)
    }

    async fn get_highest_score(&self, _tag: BlockTag) -> Result<Option<HighestScore>, TransportError> {
        Ok(self.world().highest.clone())
    }

    async fn get_receipt(&self, hash: &TransactionHash) -> Result<Option<Receipt>, TransportError> {
        let mut world = self.world();
        world.receipt_reads += 1;
        let Some(stored) = world.receipts.get_mut(hash) else {
            return Ok(None);
        };
        if stored.pending_polls > 0 {
            stored.pending_polls -= 1;
            return Ok(None);
        }
        stored.ready_reads += 1;
        let mut receipt = stored.receipt.clone();
        if stored.ready_reads > 1 {
            receipt.finality = FinalityStatus::AcceptedOnL2;
        }
        Ok(Some(receipt))
    }
}

impl GameLedger for MockLedger {
    fn name(&self) -> &str {
        "Mock"
    }

    fn network(&self) -> &str {
        "mock-network"
    }
}

struct MockAccount {
    address: Address,
    ledger: MockLedger,
}

#[async_trait]
impl SessionAccount for MockAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn execute(&self, calls: &[LedgerCall]) -> Result<TransactionHash, TransportError> {
        Ok(self.ledger.submit(self.address, calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::parse("0xa11ce").unwrap()
    }

    fn bob() -> Address {
        Address::parse("0xb0b").unwrap()
    }

    async fn receipt(ledger: &MockLedger, hash: TransactionHash) -> Receipt {
        ledger.get_receipt(&hash).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn spawn_creates_fresh_session() {
        let ledger = MockLedger::new();
        let hash = ledger.account(alice()).execute(&[LedgerCall::Spawn]).await.unwrap();
        let receipt = receipt(&ledger, hash).await;
        assert_eq!(receipt.execution, ExecutionStatus::Succeeded);
        assert_eq!(receipt.events.len(), 2);

        let state = ledger.get_game_state(GameId(1), BlockTag::Latest).await.unwrap().unwrap();
        assert_eq!(state.player, alice());
        assert_eq!((state.hp, state.max_hp, state.xp), (100, 110, 0));
        assert!(state.can_move && state.is_active);
    }

    #[tokio::test]
    async fn cooldown_is_seen_once_then_clears() {
        let ledger = MockLedger::new();
        let account = ledger.account(alice());
        account.execute(&[LedgerCall::Spawn]).await.unwrap();
        account
            .execute(&[LedgerCall::Move {
                game_id: GameId(1),
                direction: Direction::East,
            }])
            .await
            .unwrap();

        let first = ledger.get_game_state(GameId(1), BlockTag::Latest).await.unwrap().unwrap();
        assert_eq!(first.position, HexCoord::new(1, 0));
        assert!(!first.can_move);
        let second = ledger.get_game_state(GameId(1), BlockTag::Latest).await.unwrap().unwrap();
        assert!(second.can_move);
    }

    #[tokio::test]
    async fn failed_call_rolls_back_whole_batch() {
        let ledger = MockLedger::new();
        let hash = ledger
            .account(alice())
            .execute(&[
                LedgerCall::Spawn,
                LedgerCall::Move {
                    game_id: GameId(1),
                    direction: Direction::West,
                },
            ])
            .await
            .unwrap();
        let receipt = receipt(&ledger, hash).await;
        assert!(receipt.is_reverted());
        assert!(ledger.game(GameId(1)).is_none());
    }

    #[tokio::test]
    async fn moving_into_a_player_fights() {
        let ledger = MockLedger::new();
        ledger.account(alice()).execute(&[LedgerCall::Spawn]).await.unwrap();
        ledger.modify_game(GameId(1), |g| g.position = HexCoord::new(1, 0));
        ledger.account(bob()).execute(&[LedgerCall::Spawn]).await.unwrap();

        let hash = ledger
            .account(bob())
            .execute(&[LedgerCall::Move {
                game_id: GameId(2),
                direction: Direction::East,
            }])
            .await
            .unwrap();
        let events = ledger.codec().decode_all(&receipt(&ledger, hash).await.events);
        let DomainEvent::CombatResult(report) = &events[0] else {
            panic!("expected combat, got {events:?}");
        };
        assert!(report.attacker_won);
        assert_eq!(ledger.game(GameId(1)).unwrap().hp, 80);
        assert_eq!(ledger.game(GameId(2)).unwrap().position, HexCoord::ORIGIN);
        assert!(ledger.game(GameId(2)).unwrap().neighbor_occupancy.is_occupied(Direction::East));
    }

    #[tokio::test]
    async fn other_accounts_cannot_move_my_game() {
        let ledger = MockLedger::new();
        ledger.account(alice()).execute(&[LedgerCall::Spawn]).await.unwrap();
        let hash = ledger
            .account(bob())
            .execute(&[LedgerCall::Move {
                game_id: GameId(1),
                direction: Direction::East,
            }])
            .await
            .unwrap();
        assert!(receipt(&ledger, hash).await.is_reverted());
    }
}
