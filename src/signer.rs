use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Bytes, TxKind, B256, U256};
use alloy::signers::SignerSync;
use tracing::debug;

use crate::chain::ChainRpc;
use crate::codec;
use crate::error::WalletError;
use crate::types::{SessionContext, TransactionRequest, NATIVE_DECIMALS};

/// Builds, signs and broadcasts one transfer.
///
/// Each [`send`](Self::send) runs the full read / assemble / sign / submit
/// sequence against fresh chain state and is terminal on the first failure:
/// nothing is cached, partially applied or retried.
pub struct TransactionSigner<'a, C: ChainRpc> {
    session: &'a SessionContext,
    chain: &'a C,
}

impl<'a, C: ChainRpc> TransactionSigner<'a, C> {
    pub fn new(session: &'a SessionContext, chain: &'a C) -> Self {
        Self { session, chain }
    }

    /// Execute the transfer and return the broadcast transaction hash.
    pub async fn send(&self, request: &TransactionRequest) -> Result<B256, WalletError> {
        let from = self.session.account.address();

        let gas_price = self.chain.get_gas_price().await?;

        // Native transfers move value directly; ERC20 transfers call the
        // token contract with value 0.
        let (to, value, input) = match request.token.contract_address {
            None => {
                let value = codec::scale_to_raw(&request.amount, NATIVE_DECIMALS)?;
                (request.to_address, value, Vec::new())
            }
            Some(contract) => {
                let raw_amount = codec::scale_to_raw(&request.amount, request.token.decimals)?;
                let input = codec::encode_transfer(request.to_address, raw_amount);
                (contract, U256::ZERO, input)
            }
        };

        // Estimation failures abort the send; a guessed limit is worse than
        // a loud error.
        let gas_limit = self.chain.estimate_gas(from, to, &input, value).await?;
        let nonce = self.chain.get_transaction_count(from).await?;

        let tx = TxLegacy {
            chain_id: Some(self.session.network.chain_id()),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value,
            input: Bytes::from(input),
        };
        debug!(
            %to,
            nonce,
            gas_price,
            gas_limit,
            token = %request.token.symbol,
            "assembled transfer"
        );

        let signature = self
            .session
            .account
            .signer()
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| WalletError::InvalidInput(format!("signing: {e}")))?;
        let raw = TxEnvelope::Legacy(tx.into_signed(signature)).encoded_2718();

        self.chain.submit_raw_transaction(&raw).await
    }
}
