//! Typed decoding of receipt log records and view results.
//!
//! A record's `data` is laid out as:
//!
//! ```text
//! data[0]              key count k
//! data[1..=k]          keys (first is the game id or player)
//! data[k+1]            value word count m
//! data[k+2..k+2+m]     values, read per the schema's value layout
//! ```
//!
//! Decoding is per-record and never fails outward: anything the codec cannot
//! make sense of becomes [`DomainEvent::Unknown`], so one bad record never
//! blocks the rest of a batch.

mod cursor;
mod schema;

pub use cursor::{FieldValue, Values, WordCursor, write_value};
pub use schema::{EventKind, EventSchema, FieldSpec, SchemaTable};

use game_core::{CombatReport, DomainEvent, GameId, NeighborMask};

use crate::types::{HighestScore, LogRecord, OnChainGameState};
use crate::word::Word;

/// Why a record did not decode. Logged, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record has no selector key")]
    MissingSelector,

    #[error("unknown selector {0}")]
    UnknownSelector(Word),

    #[error("record truncated at word {at}")]
    Truncated { at: usize },

    #[error("key count mismatch: schema expects {expected}, record declares {found}")]
    KeyCountMismatch { expected: usize, found: usize },

    #[error("invalid option discriminant {0}")]
    InvalidDiscriminant(Word),

    #[error("{word} does not fit a {what}")]
    OutOfRange { what: &'static str, word: Word },

    #[error("decoded values do not match layout at {0}")]
    LayoutMismatch(&'static str),
}

/// Marker the world contract puts in `keys[0]` of every emitted event.
pub const EVENT_EMITTED_MARKER: Word = Word::from_bytes([
    0x01, 0xc9, 0x3f, 0x6e, 0x47, 0x03, 0xae, 0x90, 0xf7, 0x53, 0x38, 0xf2, 0x9b, 0xff, 0xbe, 0x9c,
    0x16, 0x62, 0x20, 0x0c, 0xee, 0x98, 0x1f, 0x49, 0xaf, 0xee, 0xc2, 0x6e, 0x89, 0x2d, 0xeb, 0xcd,
]);

/// Turns log records into domain events using a selector table.
#[derive(Debug, Clone)]
pub struct EventCodec {
    schemas: SchemaTable,
}

impl EventCodec {
    pub fn new(schemas: SchemaTable) -> Self {
        Self { schemas }
    }

    pub fn schemas(&self) -> &SchemaTable {
        &self.schemas
    }

    /// Decodes a record, reporting why it failed.
    pub fn try_decode(&self, record: &LogRecord) -> Result<DomainEvent, DecodeError> {
        let selector = record.selector().ok_or(DecodeError::MissingSelector)?;
        let schema = self
            .schemas
            .get(&selector)
            .ok_or(DecodeError::UnknownSelector(selector))?;

        let mut cursor = WordCursor::new(&record.data);

        let key_count = cursor.next_len()?;
        if key_count != schema.key_count() {
            return Err(DecodeError::KeyCountMismatch {
                expected: schema.key_count(),
                found: key_count,
            });
        }
        let mut key_words = cursor.take(key_count)?;
        let keys = key_words.read_layout(&schema.key_layout)?;

        let value_len = cursor.next_len()?;
        let mut value_words = cursor.take(value_len)?;
        let values = value_words.read_layout(&schema.value_layout)?;

        build_event(schema.kind, Values::new(keys), Values::new(values))
    }

    /// Decodes a record; failures become [`DomainEvent::Unknown`].
    pub fn decode(&self, record: &LogRecord) -> DomainEvent {
        match self.try_decode(record) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, keys = record.keys.len(), "Dropping undecodable record");
                DomainEvent::Unknown
            }
        }
    }

    /// Decodes every record and keeps only the known events, in order.
    pub fn decode_all(&self, records: &[LogRecord]) -> Vec<DomainEvent> {
        records
            .iter()
            .map(|record| self.decode(record))
            .filter(|event| !event.is_unknown())
            .collect()
    }

    /// Builds the log record the contract would emit for `event`.
    ///
    /// Returns `None` for [`DomainEvent::Unknown`] or when the table has no
    /// selector for the event's kind.
    pub fn encode(&self, event: &DomainEvent) -> Option<LogRecord> {
        let (kind, keys, values) = split_event(event)?;
        let selector = self.schemas.selector_of(kind)?;

        let mut key_words = Vec::new();
        keys.iter().for_each(|v| write_value(&mut key_words, v));
        let mut value_words = Vec::new();
        values.iter().for_each(|v| write_value(&mut value_words, v));

        let mut data = Vec::with_capacity(key_words.len() + value_words.len() + 2);
        data.push(Word::from_u64(key_words.len() as u64));
        data.extend(key_words);
        data.push(Word::from_u64(value_words.len() as u64));
        data.extend(value_words);

        Some(LogRecord {
            keys: vec![EVENT_EMITTED_MARKER, selector],
            data,
        })
    }
}

fn build_event(
    kind: EventKind,
    mut keys: Values,
    mut values: Values,
) -> Result<DomainEvent, DecodeError> {
    let event = match kind {
        EventKind::Spawned => DomainEvent::Spawned {
            game_id: GameId(keys.u32()?),
            player: values.address()?,
            position: values.hex()?,
        },
        EventKind::Moved => DomainEvent::Moved {
            game_id: GameId(keys.u32()?),
            direction: values.direction()?,
            position: values.hex()?,
        },
        EventKind::CombatResult => DomainEvent::CombatResult(CombatReport {
            attacker_game_id: GameId(keys.u32()?),
            defender_game_id: GameId(values.u32()?),
            attacker_won: values.boolean()?,
            attacker_position: values.hex()?,
            defender_position: values.hex()?,
            damage_dealt: values.u32()?,
            retaliation_damage: values.u32()?,
            xp_awarded: values.u32()?,
            hp_reward: values.u32()?,
            attacker_died: values.boolean()?,
            defender_died: values.boolean()?,
        }),
        EventKind::NeighborsRevealed => DomainEvent::NeighborsRevealed {
            game_id: GameId(keys.u32()?),
            position: values.hex()?,
            mask: NeighborMask::from_bits_truncate(values.u8()?),
        },
        EventKind::EncounterOccurred => DomainEvent::EncounterOccurred {
            game_id: GameId(keys.u32()?),
            is_gift: values.boolean()?,
            outcome: values.u8()?,
            hp_after: values.u32()?,
            max_hp_after: values.u32()?,
            xp_after: values.u32()?,
            died: values.boolean()?,
        },
        EventKind::PlayerDied => DomainEvent::PlayerDied {
            game_id: GameId(keys.u32()?),
            // 0 is the contract's "no killer" sentinel.
            killed_by: Some(values.u32()?).filter(|id| *id != 0).map(GameId),
            position: values.hex()?,
        },
        EventKind::HighestScoreUpdated => {
            let player = keys.address()?;
            let username = values.felt()?;
            DomainEvent::HighestScoreUpdated {
                player,
                username: username.to_short_string().unwrap_or_default(),
                xp: values.u32()?,
            }
        }
    };
    Ok(event)
}

fn split_event(event: &DomainEvent) -> Option<(EventKind, Vec<FieldValue>, Vec<FieldValue>)> {
    use FieldValue as V;
    let split = match event {
        DomainEvent::Spawned {
            game_id,
            player,
            position,
        } => (
            EventKind::Spawned,
            vec![V::U32(game_id.0)],
            vec![V::Address(*player), V::Vec2(*position)],
        ),
        DomainEvent::Moved {
            game_id,
            direction,
            position,
        } => (
            EventKind::Moved,
            vec![V::U32(game_id.0)],
            vec![V::Direction(*direction), V::Vec2(*position)],
        ),
        DomainEvent::CombatResult(report) => (
            EventKind::CombatResult,
            vec![V::U32(report.attacker_game_id.0)],
            vec![
                V::U32(report.defender_game_id.0),
                V::Bool(report.attacker_won),
                V::Vec2(report.attacker_position),
                V::Vec2(report.defender_position),
                V::U32(report.damage_dealt),
                V::U32(report.retaliation_damage),
                V::U32(report.xp_awarded),
                V::U32(report.hp_reward),
                V::Bool(report.attacker_died),
                V::Bool(report.defender_died),
            ],
        ),
        DomainEvent::NeighborsRevealed {
            game_id,
            position,
            mask,
        } => (
            EventKind::NeighborsRevealed,
            vec![V::U32(game_id.0)],
            vec![V::Vec2(*position), V::U8(mask.bits())],
        ),
        DomainEvent::EncounterOccurred {
            game_id,
            is_gift,
            outcome,
            hp_after,
            max_hp_after,
            xp_after,
            died,
        } => (
            EventKind::EncounterOccurred,
            vec![V::U32(game_id.0)],
            vec![
                V::Bool(*is_gift),
                V::U8(*outcome),
                V::U32(*hp_after),
                V::U32(*max_hp_after),
                V::U32(*xp_after),
                V::Bool(*died),
            ],
        ),
        DomainEvent::PlayerDied {
            game_id,
            killed_by,
            position,
        } => (
            EventKind::PlayerDied,
            vec![V::U32(game_id.0)],
            vec![
                V::U32(killed_by.map_or(0, |id| id.0)),
                V::Vec2(*position),
            ],
        ),
        DomainEvent::HighestScoreUpdated {
            player,
            username,
            xp,
        } => (
            EventKind::HighestScoreUpdated,
            vec![V::Address(*player)],
            vec![
                V::Felt(Word::from_short_string(username).unwrap_or(Word::ZERO)),
                V::U32(*xp),
            ],
        ),
        DomainEvent::Unknown => return None,
    };
    Some(split)
}

// ============================================================================
// View results
// ============================================================================

fn game_state_layout() -> [FieldSpec; 10] {
    [
        FieldSpec::U32,
        FieldSpec::Address,
        FieldSpec::Vec2,
        FieldSpec::optional(FieldSpec::Direction),
        FieldSpec::Bool,
        FieldSpec::Bool,
        FieldSpec::U32,
        FieldSpec::U32,
        FieldSpec::U32,
        FieldSpec::U8,
    ]
}

/// Decodes the `get_game_state` aggregate.
///
/// The contract answers unknown ids with a zeroed struct; that decodes to `None`.
pub fn decode_game_state(words: &[Word]) -> Result<Option<OnChainGameState>, DecodeError> {
    let mut cursor = WordCursor::new(words);
    let mut values = Values::new(cursor.read_layout(&game_state_layout())?);

    let game_id = GameId(values.u32()?);
    let player = values.address()?;
    let position = values.hex()?;
    let last_direction = match values.optional()? {
        Some(FieldValue::Direction(direction)) => Some(direction),
        Some(_) => return Err(DecodeError::LayoutMismatch("Direction")),
        None => None,
    };
    let state = OnChainGameState {
        game_id,
        player,
        position,
        last_direction,
        can_move: values.boolean()?,
        is_active: values.boolean()?,
        hp: values.u32()?,
        max_hp: values.u32()?,
        xp: values.u32()?,
        neighbor_occupancy: NeighborMask::from_bits_truncate(values.u8()?),
    };

    if state.player.is_zero() {
        return Ok(None);
    }
    Ok(Some(state))
}

/// Inverse of [`decode_game_state`].
pub fn encode_game_state(state: &OnChainGameState) -> Vec<Word> {
    let values = [
        FieldValue::U32(state.game_id.0),
        FieldValue::Address(state.player),
        FieldValue::Vec2(state.position),
        FieldValue::Option(
            state
                .last_direction
                .map(|d| Box::new(FieldValue::Direction(d))),
        ),
        FieldValue::Bool(state.can_move),
        FieldValue::Bool(state.is_active),
        FieldValue::U32(state.hp),
        FieldValue::U32(state.max_hp),
        FieldValue::U32(state.xp),
        FieldValue::U8(state.neighbor_occupancy.bits()),
    ];
    let mut out = Vec::new();
    values.iter().for_each(|v| write_value(&mut out, v));
    out
}

/// Decodes `get_highest_score`; a zero player means no score yet.
pub fn decode_highest_score(words: &[Word]) -> Result<Option<HighestScore>, DecodeError> {
    let mut cursor = WordCursor::new(words);
    let mut values = Values::new(cursor.read_layout(&[
        FieldSpec::Address,
        FieldSpec::Felt,
        FieldSpec::U32,
    ])?);
    let score = HighestScore {
        player: values.address()?,
        username: values.felt()?,
        xp: values.u32()?,
    };
    Ok((!score.player.is_zero()).then_some(score))
}

#[cfg(test)]
mod tests {
    use game_core::{Address, Direction, HexCoord};

    use super::*;

    const SPAWNED: u64 = 0x51;
    const MOVED: u64 = 0x52;
    const COMBAT: u64 = 0x53;
    const NEIGHBORS: u64 = 0x54;
    const ENCOUNTER: u64 = 0x55;
    const DIED: u64 = 0x56;

    fn codec() -> EventCodec {
        EventCodec::new(SchemaTable::builtin(|kind| {
            Some(Word::from_u64(match kind {
                EventKind::Spawned => SPAWNED,
                EventKind::Moved => MOVED,
                EventKind::CombatResult => COMBAT,
                EventKind::NeighborsRevealed => NEIGHBORS,
                EventKind::EncounterOccurred => ENCOUNTER,
                EventKind::PlayerDied => DIED,
                EventKind::HighestScoreUpdated => 0x57,
            }))
        }))
    }

    fn w(values: &[u64]) -> Vec<Word> {
        values.iter().map(|v| Word::from_u64(*v)).collect()
    }

    fn record(selector: u64, data: Vec<Word>) -> LogRecord {
        LogRecord {
            keys: vec![EVENT_EMITTED_MARKER, Word::from_u64(selector)],
            data,
        }
    }

    #[test]
    fn decodes_spawned() {
        let mut data = w(&[1, 4, 3]);
        data.push(Word::from_hex("0xabc").unwrap());
        data.extend(w(&[0, 0]));
        let event = codec().decode(&record(SPAWNED, data));
        assert_eq!(
            event,
            DomainEvent::Spawned {
                game_id: GameId(4),
                player: Address::parse("0xabc").unwrap(),
                position: HexCoord::new(0, 0),
            }
        );
    }

    #[test]
    fn decodes_moved() {
        let event = codec().decode(&record(MOVED, w(&[1, 4, 3, 0, 1, 0])));
        assert_eq!(
            event,
            DomainEvent::Moved {
                game_id: GameId(4),
                direction: Direction::East,
                position: HexCoord::new(1, 0),
            }
        );
    }

    #[test]
    fn decodes_combat_result_with_negative_position() {
        let mut data = w(&[1, 4, 12, 9, 1]);
        // Attacker at (-1, 2): x is stored field-negative.
        data.push(Word::from_i64(-1));
        data.extend(w(&[2, 0, 2, 25, 6, 30, 10, 0, 1]));
        let event = codec().decode(&record(COMBAT, data));
        assert_eq!(
            event,
            DomainEvent::CombatResult(CombatReport {
                attacker_game_id: GameId(4),
                defender_game_id: GameId(9),
                attacker_won: true,
                attacker_position: HexCoord::new(-1, 2),
                defender_position: HexCoord::new(0, 2),
                damage_dealt: 25,
                retaliation_damage: 6,
                xp_awarded: 30,
                hp_reward: 10,
                attacker_died: false,
                defender_died: true,
            })
        );
    }

    #[test]
    fn decodes_twos_complement_coordinate() {
        let event = codec().decode(&record(MOVED, w(&[1, 4, 3, 3, 0xFFFF_FFFF, 0])));
        assert_eq!(
            event,
            DomainEvent::Moved {
                game_id: GameId(4),
                direction: Direction::West,
                position: HexCoord::new(-1, 0),
            }
        );
    }

    #[test]
    fn decodes_neighbors_revealed() {
        let event = codec().decode(&record(NEIGHBORS, w(&[1, 4, 3, 5, 6, 0b101])));
        assert_eq!(
            event,
            DomainEvent::NeighborsRevealed {
                game_id: GameId(4),
                position: HexCoord::new(5, 6),
                mask: NeighborMask::EAST | NeighborMask::NORTH_WEST,
            }
        );
    }

    #[test]
    fn decodes_encounter() {
        let event = codec().decode(&record(ENCOUNTER, w(&[1, 4, 6, 0, 2, 0, 110, 45, 1])));
        assert_eq!(
            event,
            DomainEvent::EncounterOccurred {
                game_id: GameId(4),
                is_gift: false,
                outcome: 2,
                hp_after: 0,
                max_hp_after: 110,
                xp_after: 45,
                died: true,
            }
        );
    }

    #[test]
    fn player_died_without_killer() {
        let event = codec().decode(&record(DIED, w(&[1, 4, 3, 0, 7, 7])));
        assert_eq!(
            event,
            DomainEvent::PlayerDied {
                game_id: GameId(4),
                killed_by: None,
                position: HexCoord::new(7, 7),
            }
        );
    }

    #[test]
    fn unknown_selector_is_dropped_not_fatal() {
        let codec = codec();
        let records = vec![
            record(0xdead, w(&[1, 4, 0])),
            record(MOVED, w(&[1, 4, 3, 0, 1, 0])),
        ];
        assert_eq!(codec.decode(&records[0]), DomainEvent::Unknown);
        let events = codec.decode_all(&records);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::Moved { .. }));
    }

    #[test]
    fn malformed_records_decode_to_unknown() {
        let codec = codec();
        // Key count disagrees with schema.
        assert_eq!(
            codec.try_decode(&record(MOVED, w(&[2, 4, 4, 3, 0, 1, 0]))),
            Err(DecodeError::KeyCountMismatch {
                expected: 1,
                found: 2
            })
        );
        // Value count larger than the record.
        assert!(matches!(
            codec.try_decode(&record(MOVED, w(&[1, 4, 9, 0, 1]))),
            Err(DecodeError::Truncated { .. })
        ));
        // Direction index out of range.
        assert_eq!(
            codec.decode(&record(MOVED, w(&[1, 4, 3, 6, 1, 0]))),
            DomainEvent::Unknown
        );
        // No selector key.
        assert_eq!(
            codec.try_decode(&LogRecord {
                keys: vec![EVENT_EMITTED_MARKER],
                data: vec![],
            }),
            Err(DecodeError::MissingSelector)
        );
    }

    #[test]
    fn game_state_with_absent_direction() {
        let mut words = w(&[4]);
        words.push(Word::from_hex("0xabc").unwrap());
        words.extend(w(&[0, 0, 1, 1, 1, 100, 110, 0, 0]));
        let state = decode_game_state(&words).unwrap().unwrap();
        assert_eq!(state.game_id, GameId(4));
        assert_eq!(state.last_direction, None);
        assert!(state.can_move);
        assert!(state.is_active);
        assert_eq!((state.hp, state.max_hp, state.xp), (100, 110, 0));
        assert_eq!(state.neighbor_occupancy, NeighborMask::empty());
    }

    #[test]
    fn game_state_with_present_direction() {
        let mut words = w(&[4]);
        words.push(Word::from_hex("0xabc").unwrap());
        words.extend(w(&[1, 0, 0, 0, 0, 1, 80, 110, 12, 0b10]));
        let state = decode_game_state(&words).unwrap().unwrap();
        assert_eq!(state.position, HexCoord::new(1, 0));
        assert_eq!(state.last_direction, Some(Direction::East));
        assert!(!state.can_move);
        assert_eq!(state.hp, 80);
        assert!(state.neighbor_occupancy.is_occupied(Direction::NorthEast));
        assert_eq!(encode_game_state(&state), words);
    }

    #[test]
    fn zeroed_game_state_is_none() {
        let words = w(&[0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_game_state(&words), Ok(None));
    }

    #[test]
    fn encode_matches_contract_layout() {
        let codec = codec();
        let record = codec
            .encode(&DomainEvent::Moved {
                game_id: GameId(4),
                direction: Direction::East,
                position: HexCoord::new(1, 0),
            })
            .unwrap();
        assert_eq!(record.keys[1], Word::from_u64(MOVED));
        assert_eq!(record.data, w(&[1, 4, 3, 0, 1, 0]));
        assert!(codec.encode(&DomainEvent::Unknown).is_none());
    }
}
