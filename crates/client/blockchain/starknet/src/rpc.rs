//! Minimal JSON-RPC 2.0 transport over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Result, StarknetError};

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// JSON-RPC client for one node endpoint.
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one request and decodes its `result`.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::trace!(method, id, "JSON-RPC request");

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StarknetError::MalformedResponse(format!(
                "{method} returned HTTP {status}: {text}"
            )));
        }

        parse_response(method, &text)
    }
}

fn parse_response<T: DeserializeOwned>(method: &str, text: &str) -> Result<T> {
    let envelope: RpcResponse<T> = serde_json::from_str(text).map_err(|e| {
        StarknetError::MalformedResponse(format!("{method}: {e}; body: {text}"))
    })?;

    if let Some(error) = envelope.error {
        let message = match error.data {
            Some(data) => format!("{} ({data})", error.message),
            None => error.message,
        };
        return Err(StarknetError::Rpc {
            code: error.code,
            message,
        });
    }

    envelope
        .result
        .ok_or_else(|| StarknetError::MalformedResponse(format!("{method}: missing result")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result() {
        let words: Vec<String> =
            parse_response("starknet_call", r#"{"jsonrpc":"2.0","id":1,"result":["0x1","0x2"]}"#)
                .unwrap();
        assert_eq!(words, vec!["0x1", "0x2"]);
    }

    #[test]
    fn maps_error_object() {
        let err = parse_response::<Value>(
            "starknet_getTransactionReceipt",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":29,"message":"Transaction hash not found"}}"#,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_response::<Value>("starknet_call", "not json").unwrap_err();
        assert!(matches!(err, StarknetError::MalformedResponse(_)));
    }
}
