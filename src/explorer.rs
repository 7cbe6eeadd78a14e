use std::time::Duration;

use alloy::hex;
use alloy::primitives::{Address, U256};
use serde::Deserialize;
use tracing::warn;

use crate::codec;
use crate::error::WalletError;
use crate::network::Network;
use crate::types::{TokenDescriptor, TransferRecord};

const EXPLORER_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the block-explorer account API.
pub struct HistoryFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    message: String,
    // A not-OK response carries an error string here instead of rows.
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenTransfer {
    from: String,
    to: String,
    time_stamp: String,
    hash: String,
    value: String,
}

impl HistoryFetcher {
    /// Build a fetcher against the given network's explorer subdomain.
    pub fn new(network: &Network, api_key: impl Into<String>) -> Result<Self, WalletError> {
        Self::with_base_url(
            format!("https://{}.etherscan.io/api", network.explorer_subdomain()),
            api_key,
        )
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(EXPLORER_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Network(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Transfer history of one token for one wallet, newest first.
    ///
    /// The explorer is asked for descending block-time order (`sort=desc`)
    /// and its order is trusted as-is. A not-OK status degrades to an empty
    /// list, so an empty history and a failed lookup are indistinguishable
    /// here; only transport and decoding failures surface as errors.
    pub async fn fetch_transfer_history(
        &self,
        token_contract_address: Address,
        decimals: u8,
        wallet_address: Address,
    ) -> Result<Vec<TransferRecord>, WalletError> {
        let url = format!(
            "{}?module=account&action=tokentx&contractaddress=0x{}&address=0x{}&sort=desc&apikey={}",
            self.base_url,
            hex::encode(token_contract_address),
            hex::encode(wallet_address),
            self.api_key,
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("explorer: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| WalletError::Network(format!("explorer: {e}")))?;
        parse_transfer_history(&body, decimals)
    }
}

/// Parse the explorer's `{message, result}` envelope into transfer records.
pub(crate) fn parse_transfer_history(
    body: &str,
    decimals: u8,
) -> Result<Vec<TransferRecord>, WalletError> {
    let envelope: ExplorerEnvelope = serde_json::from_str(body)
        .map_err(|e| WalletError::Network(format!("explorer: invalid response: {e}")))?;
    if envelope.message != "OK" {
        warn!(status = %envelope.message, "explorer status not OK, treating history as empty");
        return Ok(Vec::new());
    }
    let rows: Vec<RawTokenTransfer> = serde_json::from_value(envelope.result)
        .map_err(|e| WalletError::Network(format!("explorer: invalid result rows: {e}")))?;
    Ok(rows
        .iter()
        .filter_map(|row| match transfer_record(row, decimals) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(hash = %row.hash, error = %e, "skipping malformed transfer row");
                None
            }
        })
        .collect())
}

fn transfer_record(row: &RawTokenTransfer, decimals: u8) -> Result<TransferRecord, WalletError> {
    let raw_value = U256::from_str_radix(&row.value, 10)
        .map_err(|e| WalletError::InvalidInput(format!("value {:?}: {e}", row.value)))?;
    Ok(TransferRecord {
        from: row
            .from
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("from address: {e}")))?,
        to: row
            .to
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("to address: {e}")))?,
        timestamp: row
            .time_stamp
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("timestamp: {e}")))?,
        transaction_hash: row
            .hash
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("transaction hash: {e}")))?,
        value: codec::format_fixed2(raw_value, decimals),
    })
}

/// Finds tokens a wallet holds that are not yet in its token list.
pub struct TokenDiscovery {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    tokens: Vec<HeldToken>,
}

#[derive(Debug, Deserialize)]
struct HeldToken {
    #[serde(rename = "tokenInfo")]
    token_info: HeldTokenInfo,
}

#[derive(Debug, Deserialize)]
struct HeldTokenInfo {
    address: String,
    #[serde(default)]
    symbol: Option<String>,
    // The API serves this as either a number or a string.
    decimals: serde_json::Value,
}

impl TokenDiscovery {
    pub fn new() -> Result<Self, WalletError> {
        Self::with_base_url("https://api.ethplorer.io")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(EXPLORER_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Network(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Tokens held by `wallet_address` that are missing from `known`.
    ///
    /// Discovery is only meaningful against mainnet data; every other
    /// network short-circuits to an empty list without touching the network.
    pub async fn discover(
        &self,
        network: &Network,
        wallet_address: Address,
        known: &[TokenDescriptor],
    ) -> Result<Vec<TokenDescriptor>, WalletError> {
        if *network != Network::Mainnet {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/getAddressInfo/0x{}?apiKey=freekey",
            self.base_url,
            hex::encode(wallet_address),
        );
        let info: AddressInfo = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("token discovery: {e}")))?
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("token discovery: invalid response: {e}")))?;

        let known_addresses: Vec<Address> =
            known.iter().filter_map(|t| t.contract_address).collect();
        let mut found = Vec::new();
        for held in info.tokens {
            let Ok(address) = held.token_info.address.parse::<Address>() else {
                warn!(address = %held.token_info.address, "skipping token with malformed address");
                continue;
            };
            if known_addresses.contains(&address) {
                continue;
            }
            let Some(decimals) = parse_decimals(&held.token_info.decimals) else {
                warn!(%address, "skipping token with malformed decimals");
                continue;
            };
            let symbol = held.token_info.symbol.unwrap_or_default();
            match TokenDescriptor::erc20(symbol, address, decimals) {
                Ok(token) => found.push(token),
                Err(e) => warn!(%address, error = %e, "skipping token"),
            }
        }
        Ok(found)
    }
}

fn parse_decimals(value: &serde_json::Value) -> Option<u8> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
