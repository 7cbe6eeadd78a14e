use std::fmt;

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::network::Network;

/// Reserved symbol for the chain's base currency.
pub const NATIVE_SYMBOL: &str = "native";

/// Decimals of the native coin (wei scaling).
pub const NATIVE_DECIMALS: u8 = 18;

/// A wallet account: the address and the signing key behind it.
///
/// The key never appears in `Debug` output or logs; key derivation is
/// delegated to the signer implementation.
#[derive(Clone)]
pub struct Account {
    address: Address,
    signer: PrivateKeySigner,
}

impl Account {
    /// Restore an account from a hex-encoded private key, with or without a
    /// `0x` prefix.
    pub fn from_private_key_hex(key: &str) -> Result<Self, WalletError> {
        let key = key.trim();
        let key = key
            .strip_prefix("0x")
            .or_else(|| key.strip_prefix("0X"))
            .unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| WalletError::InvalidInput(format!("private key: {e}")))?;
        Ok(Self {
            address: signer.address(),
            signer,
        })
    }

    /// Generate a fresh random account.
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        Self {
            address: signer.address(),
            signer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Everything an engine call needs to know about the current session.
///
/// Passed explicitly into the facade instead of being read from ambient
/// state, so the engine stays independently testable.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub network: Network,
    pub account: Account,
}

/// A coin the wallet knows how to handle.
///
/// `contract_address` is `None` exactly when the descriptor names the
/// native coin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub contract_address: Option<Address>,
    pub decimals: u8,
}

impl TokenDescriptor {
    /// The chain's base currency.
    pub fn native() -> Self {
        Self {
            symbol: NATIVE_SYMBOL.to_string(),
            contract_address: None,
            decimals: NATIVE_DECIMALS,
        }
    }

    /// An ERC20 token. `decimals` outside `[0, 36]` is rejected.
    pub fn erc20(
        symbol: impl Into<String>,
        contract_address: Address,
        decimals: u8,
    ) -> Result<Self, WalletError> {
        if decimals > 36 {
            return Err(WalletError::InvalidInput(format!(
                "token decimals {decimals} out of range (max 36)"
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            contract_address: Some(contract_address),
            decimals,
        })
    }

    pub fn is_native(&self) -> bool {
        self.contract_address.is_none()
    }
}

/// A token balance, with a best-effort USD figure.
///
/// `usd_balance` is `None` when the price lookup failed; the balance itself
/// is never blocked by a failing price query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub balance: String,
    pub usd_balance: Option<f64>,
}

/// One historical token transfer, as reported by the block explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    /// Unix seconds.
    pub timestamp: u64,
    pub transaction_hash: B256,
    /// Transferred amount, fixed to 2 fractional digits.
    pub value: String,
}

/// A transfer to execute. Consumed whole by a single `send_transaction`
/// call; never retried automatically.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub token: TokenDescriptor,
    pub to_address: Address,
    /// Amount in whole tokens, e.g. `"1.5"`.
    pub amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Key/address pair from the standard web3 account test vector.
    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe512961708279feb1be6ae5538da033";
    const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn restores_account_from_private_key() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        assert_eq!(account.address(), TEST_ADDRESS.parse::<Address>().unwrap());

        let prefixed = Account::from_private_key_hex(&format!("0x{TEST_KEY}")).unwrap();
        assert_eq!(prefixed.address(), account.address());
    }

    #[test]
    fn rejects_malformed_private_key() {
        assert!(Account::from_private_key_hex("not-a-key").is_err());
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let account = Account::from_private_key_hex(TEST_KEY).unwrap();
        let rendered = format!("{account:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(TEST_KEY));
    }

    #[test]
    fn native_descriptor_has_no_contract_address() {
        let native = TokenDescriptor::native();
        assert!(native.is_native());
        assert_eq!(native.symbol, NATIVE_SYMBOL);
        assert_eq!(native.decimals, NATIVE_DECIMALS);
    }

    #[test]
    fn erc20_descriptor_validates_decimals() {
        let contract = Address::repeat_byte(0xab);
        assert!(TokenDescriptor::erc20("TEST", contract, 36).is_ok());
        assert!(TokenDescriptor::erc20("TEST", contract, 37).is_err());
    }
}
