use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::hex;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::WalletError;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// The JSON-RPC operations the engine needs from a node.
///
/// Kept behind a trait so the signing and balance paths can run against a
/// canned chain in tests.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native-coin balance in wei.
    async fn get_native_balance(&self, address: Address) -> Result<U256, WalletError>;

    /// Current gas price in wei.
    async fn get_gas_price(&self) -> Result<u128, WalletError>;

    /// Gas required by the given call. Estimation failures propagate; the
    /// engine never substitutes a hardcoded limit.
    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
        value: U256,
    ) -> Result<u64, WalletError>;

    /// Next nonce for the address.
    async fn get_transaction_count(&self, address: Address) -> Result<u64, WalletError>;

    /// Read-only contract call; returns the raw return data.
    async fn call_contract(&self, contract: Address, data: &[u8]) -> Result<Vec<u8>, WalletError>;

    /// Broadcast a signed transaction; returns its hash.
    async fn submit_raw_transaction(&self, raw: &[u8]) -> Result<B256, WalletError>;
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client for a single node endpoint.
pub struct HttpChainReader {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl HttpChainReader {
    pub fn new(url: Url) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Network(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc call");

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("{method}: {e}")))?;
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("{method}: invalid response: {e}")))?;

        if let Some(err) = body.error {
            return Err(WalletError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| WalletError::Network(format!("{method}: empty result")))
    }
}

#[async_trait]
impl ChainRpc for HttpChainReader {
    async fn get_native_balance(&self, address: Address) -> Result<U256, WalletError> {
        let result = self
            .call("eth_getBalance", json!([addr_hex(address), "latest"]))
            .await?;
        quantity(&result)
    }

    async fn get_gas_price(&self) -> Result<u128, WalletError> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        quantity_u128(&result)
    }

    async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
        value: U256,
    ) -> Result<u64, WalletError> {
        let mut call_object = json!({
            "from": addr_hex(from),
            "to": addr_hex(to),
        });
        if !data.is_empty() {
            call_object["data"] = json!(bytes_hex(data));
        }
        if !value.is_zero() {
            call_object["value"] = json!(format!("{value:#x}"));
        }
        let result = self.call("eth_estimateGas", json!([call_object])).await?;
        quantity_u64(&result)
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64, WalletError> {
        let result = self
            .call(
                "eth_getTransactionCount",
                json!([addr_hex(address), "latest"]),
            )
            .await?;
        quantity_u64(&result)
    }

    async fn call_contract(&self, contract: Address, data: &[u8]) -> Result<Vec<u8>, WalletError> {
        let result = self
            .call(
                "eth_call",
                json!([{"to": addr_hex(contract), "data": bytes_hex(data)}, "latest"]),
            )
            .await?;
        let returned = result
            .as_str()
            .ok_or_else(|| WalletError::Network(format!("eth_call: expected hex data, got {result}")))?;
        hex::decode(returned.trim_start_matches("0x"))
            .map_err(|e| WalletError::Network(format!("eth_call: invalid return data: {e}")))
    }

    async fn submit_raw_transaction(&self, raw: &[u8]) -> Result<B256, WalletError> {
        let result = self
            .call("eth_sendRawTransaction", json!([bytes_hex(raw)]))
            .await
            .map_err(|e| match e {
                // The node refused the transaction; surface its reason verbatim.
                WalletError::Rpc { message, .. } => WalletError::Submission(message),
                other => other,
            })?;
        let hash = result.as_str().ok_or_else(|| {
            WalletError::Network(format!("eth_sendRawTransaction: expected hash, got {result}"))
        })?;
        hash.parse::<B256>().map_err(|e| {
            WalletError::Network(format!("eth_sendRawTransaction: invalid hash {hash:?}: {e}"))
        })
    }
}

fn addr_hex(address: Address) -> String {
    format!("0x{}", hex::encode(address))
}

fn bytes_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn quantity(value: &Value) -> Result<U256, WalletError> {
    let raw = value
        .as_str()
        .ok_or_else(|| WalletError::Network(format!("expected hex quantity, got {value}")))?;
    U256::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| WalletError::Network(format!("invalid hex quantity {raw:?}: {e}")))
}

fn quantity_u64(value: &Value) -> Result<u64, WalletError> {
    u64::try_from(quantity(value)?)
        .map_err(|_| WalletError::Network(format!("quantity {value} exceeds u64")))
}

fn quantity_u128(value: &Value) -> Result<u128, WalletError> {
    u128::try_from(quantity(value)?)
        .map_err(|_| WalletError::Network(format!("quantity {value} exceeds u128")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(quantity(&json!("0x1b")).unwrap(), U256::from(27));
        assert_eq!(quantity_u64(&json!("0x0")).unwrap(), 0);
        assert_eq!(quantity_u128(&json!("0x170cdc1e00")).unwrap(), 99_000_000_000);
    }

    #[test]
    fn rejects_non_string_quantities() {
        assert!(quantity(&json!(27)).is_err());
        assert!(quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn classifies_error_envelopes() {
        let body: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        let err = body.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "nonce too low");
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn live_gas_price() {
        let url = Url::parse(crate::network::DEFAULT_RPC_ENDPOINT).unwrap();
        let reader = HttpChainReader::new(url).unwrap();
        let gas_price = reader.get_gas_price().await.unwrap();
        assert!(gas_price > 0);
    }
}
