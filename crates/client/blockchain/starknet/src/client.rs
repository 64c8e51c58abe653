//! Starknet ledger reader.

use std::sync::Arc;

use async_trait::async_trait;
use client_blockchain_core::{
    BlockTag, BlockchainConfig, EventCodec, GameLedger, HighestScore, LedgerReader,
    OnChainGameState, Receipt, SchemaTable, TransactionHash, TransportError, Word,
    decode_game_state, decode_highest_score,
};
use game_core::{Address, GameId};
use serde_json::json;

use crate::config::StarknetConfig;
use crate::error::{Result, StarknetError};
use crate::manifest::DojoManifest;
use crate::rpc::JsonRpcClient;
use crate::selectors;
use crate::utils::{RawReceipt, block_id, parse_words, receipt_from_raw, words_to_hex};

/// Reads game views and receipts from a Starknet node.
pub struct StarknetLedger {
    config: StarknetConfig,
    rpc: Arc<JsonRpcClient>,
    game_contract: Address,
    schemas: SchemaTable,
}

impl StarknetLedger {
    /// Builds a ledger from configuration, loading the manifest when one is set.
    pub fn new(config: StarknetConfig) -> Result<Self> {
        config.validate().map_err(StarknetError::InvalidConfig)?;

        let manifest = match &config.manifest_path {
            Some(path) => Some(DojoManifest::load(path)?),
            None => None,
        };

        let game_contract = config
            .game_contract
            .or_else(|| {
                manifest
                    .as_ref()
                    .and_then(|m| m.contract_address(&config.contract_tag()))
            })
            .ok_or_else(|| {
                StarknetError::Manifest(format!(
                    "contract {} not found in manifest",
                    config.contract_tag()
                ))
            })?;

        let schemas = manifest
            .as_ref()
            .map(|m| m.schema_table(&config.namespace))
            .unwrap_or_default();
        if schemas.is_empty() {
            tracing::warn!("No event selectors configured; receipts will decode to nothing");
        }

        tracing::info!(
            network = config.network_name(),
            rpc = config.get_rpc_url(),
            contract = %game_contract.to_short_hex(),
            events = schemas.len(),
            "Starknet ledger configured"
        );

        let rpc = Arc::new(JsonRpcClient::new(config.get_rpc_url()));
        Ok(Self {
            config,
            rpc,
            game_contract,
            schemas,
        })
    }

    pub fn game_contract(&self) -> Address {
        self.game_contract
    }

    pub fn config(&self) -> &StarknetConfig {
        &self.config
    }

    /// Shared RPC transport, reused by the session account.
    pub fn rpc(&self) -> Arc<JsonRpcClient> {
        Arc::clone(&self.rpc)
    }

    /// Codec over the event selectors from the manifest.
    pub fn codec(&self) -> EventCodec {
        EventCodec::new(self.schemas.clone())
    }

    /// Invokes a view function of the game contract.
    async fn call(&self, selector: Word, calldata: &[Word], tag: BlockTag) -> Result<Vec<Word>> {
        let request = json!({
            "contract_address": Word::from(self.game_contract).to_hex(),
            "entry_point_selector": selector.to_hex(),
            "calldata": words_to_hex(calldata),
        });
        let raw: Vec<String> = self
            .rpc
            .request("starknet_call", json!([request, block_id(tag)]))
            .await?;
        parse_words(&raw)
    }
}

fn decode_failure(what: &str, err: impl std::fmt::Display) -> StarknetError {
    StarknetError::MalformedResponse(format!("{what}: {err}"))
}

#[async_trait]
impl LedgerReader for StarknetLedger {
    async fn get_game_state(
        &self,
        game_id: GameId,
        tag: BlockTag,
    ) -> std::result::Result<Option<OnChainGameState>, TransportError> {
        let words = self
            .call(selectors::GET_GAME_STATE, &[Word::from(game_id.0)], tag)
            .await?;
        let state = decode_game_state(&words).map_err(|e| decode_failure("get_game_state", e))?;
        Ok(state)
    }

    async fn get_highest_score(
        &self,
        tag: BlockTag,
    ) -> std::result::Result<Option<HighestScore>, TransportError> {
        let words = self.call(selectors::GET_HIGHEST_SCORE, &[], tag).await?;
        let score =
            decode_highest_score(&words).map_err(|e| decode_failure("get_highest_score", e))?;
        Ok(score)
    }

    async fn get_receipt(
        &self,
        hash: &TransactionHash,
    ) -> std::result::Result<Option<Receipt>, TransportError> {
        let result = self
            .rpc
            .request::<RawReceipt>("starknet_getTransactionReceipt", json!([hash.0.to_hex()]))
            .await;

        match result {
            Ok(raw) => Ok(Some(receipt_from_raw(raw)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl GameLedger for StarknetLedger {
    fn name(&self) -> &str {
        "Starknet"
    }

    fn network(&self) -> &str {
        self.config.network_name()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn explicit_contract_needs_no_manifest() {
        let contract: Address = "0x2a".parse().unwrap();
        let ledger =
            StarknetLedger::new(StarknetConfig::default().with_game_contract(contract)).unwrap();

        assert_eq!(ledger.game_contract(), contract);
        assert_eq!(ledger.name(), "Starknet");
        assert_eq!(ledger.network(), "katana");
        assert!(ledger.codec().schemas().is_empty());
    }

    #[test]
    fn contract_and_selectors_come_from_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "world": {{ "address": "0x1" }},
                "contracts": [{{ "tag": "hexed-game_systems", "address": "0x77" }}],
                "events": [{{ "tag": "hexed-Moved", "selector": "0x5" }}]
            }}"#
        )
        .unwrap();

        let config = StarknetConfig::default().with_manifest_path(file.path());
        let ledger = StarknetLedger::new(config).unwrap();

        assert_eq!(ledger.game_contract(), "0x77".parse().unwrap());
        assert_eq!(ledger.codec().schemas().len(), 1);
    }

    #[test]
    fn missing_contract_is_a_manifest_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "world": {{ "address": "0x1" }} }}"#).unwrap();

        let config = StarknetConfig::default().with_manifest_path(file.path());
        let err = StarknetLedger::new(config).err().unwrap();
        assert!(matches!(err, StarknetError::Manifest(_)));
    }
}
