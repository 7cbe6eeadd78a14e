//! Transaction and balance engine for a single-account Ethereum wallet.
//!
//! The engine reads balances and transfer history for the native coin and
//! ERC20 tokens, and builds, signs and broadcasts transfers, against three
//! external services: a JSON-RPC node, a block-explorer HTTP API and a
//! price-quote API. [`WalletFacade`] is the only entry point callers need.

mod chain;
mod codec;
mod error;
mod explorer;
mod network;
mod price;
mod signer;
mod types;

pub use chain::{ChainRpc, HttpChainReader};
pub use codec::{
    decode_balance_of, encode_balance_of, encode_transfer, format_fixed2, scale_from_raw,
    scale_to_raw,
};
pub use error::WalletError;
pub use explorer::{HistoryFetcher, TokenDiscovery};
pub use network::{ApiKeys, Network, DEFAULT_RPC_ENDPOINT};
pub use price::{PriceOracle, PriceSource, DEFAULT_TOKEN_TICKER, NATIVE_COIN_TICKER};
pub use signer::TransactionSigner;
pub use types::{
    Account, BalanceRecord, SessionContext, TokenDescriptor, TransactionRequest, TransferRecord,
    NATIVE_DECIMALS, NATIVE_SYMBOL,
};

use alloy::primitives::{Address, B256};
use tracing::warn;

/// The engine's single entry point.
///
/// Dispatches each call to the native-coin or ERC20 code path and shapes
/// the results into the canonical record types. Distinct calls may run
/// concurrently; they share only the read-only session.
pub struct WalletFacade<C = HttpChainReader, P = PriceOracle>
where
    C: ChainRpc,
    P: PriceSource,
{
    session: SessionContext,
    chain: C,
    price: P,
    history: HistoryFetcher,
    discovery: TokenDiscovery,
}

impl WalletFacade {
    /// Wire up the facade for the session's network.
    pub fn new(session: SessionContext, keys: &ApiKeys) -> Result<Self, WalletError> {
        let endpoint = session.network.rpc_endpoint(&keys.infura)?;
        let chain = HttpChainReader::new(endpoint)?;
        let price = PriceOracle::new()?;
        let history = HistoryFetcher::new(&session.network, keys.etherscan.clone())?;
        let discovery = TokenDiscovery::new()?;
        Ok(Self::with_parts(session, chain, price, history, discovery))
    }
}

impl<C, P> WalletFacade<C, P>
where
    C: ChainRpc,
    P: PriceSource,
{
    /// Assemble a facade from explicit parts; used by tests and embedders
    /// that bring their own transports.
    pub fn with_parts(
        session: SessionContext,
        chain: C,
        price: P,
        history: HistoryFetcher,
        discovery: TokenDiscovery,
    ) -> Self {
        Self {
            session,
            chain,
            price,
            history,
            discovery,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Balance of the given token for the session's wallet, with a
    /// best-effort USD figure.
    ///
    /// A failing price lookup degrades `usd_balance` to `None`; it never
    /// blocks the balance itself.
    pub async fn get_balance(&self, token: &TokenDescriptor) -> Result<BalanceRecord, WalletError> {
        let wallet = self.session.account.address();
        let (raw, ticker) = match token.contract_address {
            None => (
                self.chain.get_native_balance(wallet).await?,
                NATIVE_COIN_TICKER,
            ),
            Some(contract) => {
                let call = codec::encode_balance_of(wallet);
                let returned = self.chain.call_contract(contract, &call).await?;
                (codec::decode_balance_of(&returned)?, DEFAULT_TOKEN_TICKER)
            }
        };
        let balance = codec::scale_from_raw(raw, token.decimals);

        let usd_balance = match self.price.usd_price(ticker).await {
            Ok(price) => balance.parse::<f64>().ok().map(|b| price * b),
            Err(e) => {
                warn!(token = %token.symbol, error = %e, "price lookup failed, omitting usd balance");
                None
            }
        };
        Ok(BalanceRecord {
            balance,
            usd_balance,
        })
    }

    /// Transfer history for the given token, newest first.
    ///
    /// Native-coin history has no data source here (known gap); it comes
    /// back empty.
    pub async fn get_transactions(
        &self,
        token: &TokenDescriptor,
    ) -> Result<Vec<TransferRecord>, WalletError> {
        match token.contract_address {
            Some(contract) => {
                self.history
                    .fetch_transfer_history(contract, token.decimals, self.session.account.address())
                    .await
            }
            None => {
                warn!("native-coin history is not supported, returning an empty list");
                Ok(Vec::new())
            }
        }
    }

    /// Build, sign and broadcast a transfer; returns the transaction hash.
    pub async fn send_transaction(
        &self,
        token: &TokenDescriptor,
        to_address: Address,
        amount: &str,
    ) -> Result<B256, WalletError> {
        let request = TransactionRequest {
            token: token.clone(),
            to_address,
            amount: amount.to_string(),
        };
        TransactionSigner::new(&self.session, &self.chain)
            .send(&request)
            .await
    }

    /// Tokens the wallet holds that are missing from `known` (mainnet only).
    pub async fn discover_tokens(
        &self,
        known: &[TokenDescriptor],
    ) -> Result<Vec<TokenDescriptor>, WalletError> {
        self.discovery
            .discover(
                &self.session.network,
                self.session.account.address(),
                known,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::chain::testing::MockChain;
    use crate::price::testing::{FailingPrice, StaticPrice};

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe512961708279feb1be6ae5538da033";

    fn test_facade<C: ChainRpc, P: PriceSource>(chain: C, price: P) -> WalletFacade<C, P> {
        let session = SessionContext {
            network: Network::Ropsten,
            account: Account::from_private_key_hex(TEST_KEY).unwrap(),
        };
        WalletFacade::with_parts(
            session,
            chain,
            price,
            HistoryFetcher::with_base_url("http://127.0.0.1:1/api", "").unwrap(),
            TokenDiscovery::with_base_url("http://127.0.0.1:1").unwrap(),
        )
    }

    #[tokio::test]
    async fn erc20_balance_scales_by_the_token_decimals() {
        let chain = MockChain {
            call_result: U256::from(12345).to_be_bytes::<32>().to_vec(),
            ..Default::default()
        };
        let facade = test_facade(chain, StaticPrice(2.0));
        let token = TokenDescriptor::erc20("TEST", Address::repeat_byte(0xab), 2).unwrap();

        let record = facade.get_balance(&token).await.unwrap();
        assert_eq!(record.balance, "123.45");
        assert_eq!(record.usd_balance, Some(2.0 * 123.45));
    }

    #[tokio::test]
    async fn price_failure_degrades_to_a_null_usd_balance() {
        let chain = MockChain {
            native_balance: U256::from(1_500_000_000_000_000_000u64),
            ..Default::default()
        };
        let facade = test_facade(chain, FailingPrice);

        let record = facade.get_balance(&TokenDescriptor::native()).await.unwrap();
        assert_eq!(record.balance, "1.5");
        assert_eq!(record.usd_balance, None);
    }

    #[tokio::test]
    async fn native_history_is_an_empty_list() {
        let facade = test_facade(MockChain::default(), StaticPrice(1.0));
        let records = facade
            .get_transactions(&TokenDescriptor::native())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn send_transaction_returns_the_submitted_hash() {
        let facade = test_facade(MockChain::default(), StaticPrice(1.0));
        let hash = facade
            .send_transaction(&TokenDescriptor::native(), Address::repeat_byte(0x22), "0.5")
            .await
            .unwrap();
        assert_ne!(hash, B256::ZERO);
        assert_eq!(facade.chain.submitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn live_native_balance() {
        let session = SessionContext {
            network: Network::Ropsten,
            account: Account::generate(),
        };
        let facade = WalletFacade::new(session, &ApiKeys::from_env()).unwrap();
        let record = facade.get_balance(&TokenDescriptor::native()).await.unwrap();
        assert!(!record.balance.is_empty());
    }
}
