use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::WalletError;

/// Quote-service asset id for the native coin.
pub const NATIVE_COIN_TICKER: u32 = 1027;

/// Quote-service asset id for the wallet's listed ERC20 token.
pub const DEFAULT_TOKEN_TICKER: u32 = 2634;

const QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of USD prices, keyed by the quote service's asset id.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self, ticker_id: u32) -> Result<f64, WalletError>;
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    data: TickerData,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    quotes: TickerQuotes,
}

#[derive(Debug, Deserialize)]
struct TickerQuotes {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    price: f64,
}

/// HTTP client for the public ticker API.
pub struct PriceOracle {
    client: reqwest::Client,
    base_url: String,
}

impl PriceOracle {
    pub fn new() -> Result<Self, WalletError> {
        Self::with_base_url("https://api.coinmarketcap.com/v2/ticker")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(QUOTE_TIMEOUT)
            .build()
            .map_err(|e| WalletError::Network(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceSource for PriceOracle {
    async fn usd_price(&self, ticker_id: u32) -> Result<f64, WalletError> {
        let url = format!("{}/{}/?convert=USD", self.base_url, ticker_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("price quote: {e}")))?;
        let body: TickerResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("price quote: invalid response: {e}")))?;
        debug!(ticker_id, price = body.data.quotes.usd.price, "usd quote");
        Ok(body.data.quotes.usd.price)
    }
}
