//! Event layouts and the selector table.

use std::collections::HashMap;

use crate::word::Word;

/// How one logical field is laid out in the word stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    /// Raw field element.
    Felt,
    Address,
    U8,
    U32,
    U64,
    Bool,
    /// Signed integer of the declared width.
    Signed { bits: u32 },
    /// Enum index into [`game_core::Direction`].
    Direction,
    /// Two signed 32-bit words `x, y` mapped to axial `q, r`.
    Vec2,
    /// Discriminant word (`0` present, `1` absent), then the payload if present.
    Option(Box<FieldSpec>),
}

impl FieldSpec {
    pub fn optional(inner: FieldSpec) -> Self {
        FieldSpec::Option(Box::new(inner))
    }

    pub const I32: FieldSpec = FieldSpec::Signed { bits: 32 };
}

/// Event kinds the client knows how to turn into domain events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
pub enum EventKind {
    Spawned,
    Moved,
    CombatResult,
    NeighborsRevealed,
    EncounterOccurred,
    PlayerDied,
    HighestScoreUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Spawned,
        EventKind::Moved,
        EventKind::CombatResult,
        EventKind::NeighborsRevealed,
        EventKind::EncounterOccurred,
        EventKind::PlayerDied,
        EventKind::HighestScoreUpdated,
    ];

    /// Parses a manifest tag such as `hexed-Moved`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let name = tag.rsplit_once('-').map_or(tag, |(_, name)| name);
        name.parse().ok()
    }

    /// Key and value layouts as emitted by the game contract.
    pub fn layout(self) -> (Vec<FieldSpec>, Vec<FieldSpec>) {
        use FieldSpec::*;
        match self {
            EventKind::Spawned => (vec![U32], vec![Address, Vec2]),
            EventKind::Moved => (vec![U32], vec![Direction, Vec2]),
            EventKind::CombatResult => (
                vec![U32],
                vec![U32, Bool, Vec2, Vec2, U32, U32, U32, U32, Bool, Bool],
            ),
            EventKind::NeighborsRevealed => (vec![U32], vec![Vec2, U8]),
            EventKind::EncounterOccurred => (vec![U32], vec![Bool, U8, U32, U32, U32, Bool]),
            EventKind::PlayerDied => (vec![U32], vec![U32, Vec2]),
            EventKind::HighestScoreUpdated => (vec![Address], vec![Felt, U32]),
        }
    }
}

/// Decoding recipe for one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSchema {
    pub name: String,
    pub kind: EventKind,
    pub key_layout: Vec<FieldSpec>,
    pub value_layout: Vec<FieldSpec>,
}

impl EventSchema {
    /// Contract layout for `kind`.
    pub fn builtin(kind: EventKind) -> Self {
        let (key_layout, value_layout) = kind.layout();
        Self {
            name: kind.to_string(),
            kind,
            key_layout,
            value_layout,
        }
    }

    pub fn key_count(&self) -> usize {
        self.key_layout.len()
    }
}

/// Selector → schema lookup.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    by_selector: HashMap<Word, EventSchema>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builtin layouts for every kind, keyed by the selector `selector_of` yields.
    pub fn builtin(selector_of: impl Fn(EventKind) -> Option<Word>) -> Self {
        let mut table = Self::new();
        for kind in EventKind::ALL {
            if let Some(selector) = selector_of(kind) {
                table.insert(selector, EventSchema::builtin(kind));
            }
        }
        table
    }

    pub fn insert(&mut self, selector: Word, schema: EventSchema) {
        self.by_selector.insert(selector, schema);
    }

    pub fn get(&self, selector: &Word) -> Option<&EventSchema> {
        self.by_selector.get(selector)
    }

    pub fn selector_of(&self, kind: EventKind) -> Option<Word> {
        self.by_selector
            .iter()
            .find(|(_, schema)| schema.kind == kind)
            .map(|(selector, _)| *selector)
    }

    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest_tags() {
        assert_eq!(EventKind::from_tag("hexed-Moved"), Some(EventKind::Moved));
        assert_eq!(
            EventKind::from_tag("hexed-HighestScoreUpdated"),
            Some(EventKind::HighestScoreUpdated)
        );
        assert_eq!(EventKind::from_tag("hexed-GameCounter"), None);
        assert_eq!(EventKind::from_tag("Spawned"), Some(EventKind::Spawned));
    }

    #[test]
    fn builtin_table_skips_missing_selectors() {
        let table = SchemaTable::builtin(|kind| match kind {
            EventKind::Moved => Some(Word::from_u64(1)),
            EventKind::Spawned => Some(Word::from_u64(2)),
            _ => None,
        });
        assert_eq!(table.len(), 2);
        assert_eq!(table.selector_of(EventKind::Spawned), Some(Word::from_u64(2)));
        assert_eq!(table.get(&Word::from_u64(1)).map(|s| s.key_count()), Some(1));
    }
}
