//! Dojo deployment manifest.
//!
//! Only the parts the client reads are modelled: the world address, contract
//! tags with their addresses, and event tags with their selectors. Everything
//! else in the file is ignored.

use std::fs;
use std::path::Path;

use client_blockchain_core::{EventKind, EventSchema, SchemaTable, Word};
use game_core::Address;
use serde::Deserialize;

use crate::error::{Result, StarknetError};

#[derive(Debug, Clone, Deserialize)]
pub struct WorldEntry {
    pub address: Word,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractEntry {
    pub tag: String,
    pub address: Word,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventEntry {
    pub tag: String,
    pub selector: Word,
}

/// Parsed `manifest_<profile>.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DojoManifest {
    pub world: WorldEntry,
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    #[serde(default)]
    pub events: Vec<EventEntry>,
}

impl DojoManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| StarknetError::Manifest(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| StarknetError::Manifest(e.to_string()))
    }

    pub fn world_address(&self) -> Address {
        self.world.address.into()
    }

    /// Address of the contract registered under `tag` (e.g. `hexed-game_systems`).
    pub fn contract_address(&self, tag: &str) -> Option<Address> {
        self.contracts
            .iter()
            .find(|contract| contract.tag == tag)
            .map(|contract| contract.address.into())
    }

    /// Schema table for every known event in `namespace`.
    ///
    /// Tags outside the namespace or with unknown names are skipped.
    pub fn schema_table(&self, namespace: &str) -> SchemaTable {
        let mut table = SchemaTable::new();
        for event in &self.events {
            let Some((ns, _)) = event.tag.split_once('-') else {
                continue;
            };
            if ns != namespace {
                continue;
            }
            match EventKind::from_tag(&event.tag) {
                Some(kind) => table.insert(event.selector, EventSchema::builtin(kind)),
                None => tracing::debug!(tag = %event.tag, "Skipping unknown manifest event"),
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "world": { "address": "0x1", "class_hash": "0xabc", "seed": "hexed" },
        "contracts": [
            { "address": "0x2a", "tag": "hexed-game_systems", "systems": ["spawn", "move"] }
        ],
        "models": [],
        "events": [
            { "tag": "hexed-Moved", "selector": "0x100", "members": [] },
            { "tag": "hexed-Spawned", "selector": "0x101" },
            { "tag": "hexed-Teleported", "selector": "0x102" },
            { "tag": "other-Moved", "selector": "0x103" }
        ]
    }"#;

    #[test]
    fn reads_contract_and_world_addresses() {
        let manifest = DojoManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.world_address(), "0x1".parse().unwrap());
        assert_eq!(
            manifest.contract_address("hexed-game_systems"),
            Some("0x2a".parse().unwrap())
        );
        assert_eq!(manifest.contract_address("hexed-missing"), None);
    }

    #[test]
    fn schema_table_keeps_known_events_of_namespace() {
        let manifest = DojoManifest::parse(MANIFEST).unwrap();
        let table = manifest.schema_table("hexed");

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.selector_of(EventKind::Moved),
            Some(Word::from_u64(0x100))
        );
        assert_eq!(
            table.selector_of(EventKind::Spawned),
            Some(Word::from_u64(0x101))
        );
    }

    #[test]
    fn invalid_json_is_a_manifest_error() {
        let err = DojoManifest::parse("{").unwrap_err();
        assert!(matches!(err, StarknetError::Manifest(_)));
    }
}
