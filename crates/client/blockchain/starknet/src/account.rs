//! Development session account.
//!
//! Submits unsigned v3 invoke transactions with zero resource bounds. This is
//! only accepted by a devnet running with account validation and fees
//! disabled (`katana --dev --dev.no-fee --dev.no-account-validation`).

use std::sync::Arc;

use async_trait::async_trait;
use client_blockchain_core::{
    BlockTag, LedgerCall, SessionAccount, TransactionHash, TransportError, Word,
};
use game_core::Address;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::{Result, StarknetError};
use crate::rpc::JsonRpcClient;
use crate::selectors;
use crate::utils::{block_id, words_to_hex};

#[derive(Debug, Deserialize)]
struct InvokeResult {
    transaction_hash: Word,
}

/// Account that submits invokes to a validation-free devnet.
pub struct DevAccount {
    address: Address,
    game_contract: Address,
    rpc: Arc<JsonRpcClient>,
    // Held across nonce read and submission so concurrent batches never share a nonce.
    submit_lock: Mutex<()>,
}

impl DevAccount {
    pub fn new(address: Address, game_contract: Address, rpc: Arc<JsonRpcClient>) -> Self {
        Self {
            address,
            game_contract,
            rpc,
            submit_lock: Mutex::new(()),
        }
    }

    async fn nonce(&self) -> Result<Word> {
        let raw: String = self
            .rpc
            .request(
                "starknet_getNonce",
                json!([block_id(BlockTag::PreConfirmed), Word::from(self.address).to_hex()]),
            )
            .await?;
        Word::from_hex(&raw).map_err(|e| StarknetError::MalformedResponse(format!("nonce: {e}")))
    }
}

/// Account `__execute__` calldata: `[n, (to, selector, len, args...)*]`.
pub fn multicall_calldata(contract: Address, calls: &[LedgerCall]) -> Vec<Word> {
    let mut out = vec![Word::from_u64(calls.len() as u64)];
    for call in calls {
        let args = call.calldata();
        out.push(Word::from(contract));
        out.push(selectors::for_call(call));
        out.push(Word::from_u64(args.len() as u64));
        out.extend(args);
    }
    out
}

fn zero_bounds() -> Value {
    json!({ "max_amount": "0x0", "max_price_per_unit": "0x0" })
}

fn invoke_request(sender: Address, calldata: &[Word], nonce: Word) -> Value {
    json!({
        "type": "INVOKE",
        "version": "0x3",
        "sender_address": Word::from(sender).to_hex(),
        "calldata": words_to_hex(calldata),
        "signature": [],
        "nonce": nonce.to_hex(),
        "resource_bounds": {
            "l1_gas": zero_bounds(),
            "l2_gas": zero_bounds(),
            "l1_data_gas": zero_bounds(),
        },
        "tip": "0x0",
        "paymaster_data": [],
        "account_deployment_data": [],
        "nonce_data_availability_mode": "L1",
        "fee_data_availability_mode": "L1",
    })
}

#[async_trait]
impl SessionAccount for DevAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn execute(
        &self,
        calls: &[LedgerCall],
    ) -> std::result::Result<TransactionHash, TransportError> {
        let _guard = self.submit_lock.lock().await;

        let nonce = self.nonce().await?;
        let calldata = multicall_calldata(self.game_contract, calls);
        let request = invoke_request(self.address, &calldata, nonce);

        tracing::debug!(
            account = %self.address.to_short_hex(),
            nonce = %nonce,
            calls = calls.len(),
            "Submitting invoke transaction"
        );

        let result: InvokeResult = self
            .rpc
            .request(
                "starknet_addInvokeTransaction",
                json!({ "invoke_transaction": request }),
            )
            .await
            .map_err(|err| match err {
                StarknetError::Rpc { code, message } => {
                    TransportError::TransactionRejected(format!("{code}: {message}"))
                }
                other => other.into(),
            })?;

        Ok(TransactionHash(result.transaction_hash))
    }
}

#[cfg(test)]
mod tests {
    use game_core::{Direction, GameId};

    use super::*;

    #[test]
    fn multicall_layout_wraps_each_call() {
        let contract: Address = "0x2a".parse().unwrap();
        let calls = [
            LedgerCall::Spawn,
            LedgerCall::Move {
                game_id: GameId(7),
                direction: Direction::SouthEast,
            },
        ];

        let calldata = multicall_calldata(contract, &calls);
        assert_eq!(
            calldata,
            vec![
                Word::from_u64(2),
                Word::from_u64(0x2a),
                selectors::SPAWN,
                Word::ZERO,
                Word::from_u64(0x2a),
                selectors::MOVE,
                Word::from_u64(2),
                Word::from_u64(7),
                Word::from_u64(5),
            ]
        );
    }

    #[test]
    fn invoke_request_is_unsigned_v3() {
        let sender: Address = "0x1".parse().unwrap();
        let request = invoke_request(sender, &[Word::ONE], Word::from_u64(3));

        assert_eq!(request["version"], "0x3");
        assert_eq!(request["nonce"], "0x3");
        assert_eq!(request["sender_address"], "0x1");
        assert_eq!(request["calldata"], json!(["0x1"]));
        assert_eq!(request["signature"], json!([]));
        assert_eq!(request["resource_bounds"]["l2_gas"]["max_amount"], "0x0");
    }
}
