use thiserror::Error;

/// Errors surfaced by the wallet engine.
///
/// `Network` covers connectivity, timeouts and malformed responses and is
/// retryable by the caller. `Rpc` means the node rejected the call itself;
/// retrying without changing inputs will not help. `Submission` carries the
/// node's rejection reason for a broadcast transaction verbatim.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction rejected: {0}")]
    Submission(String),

    #[error("amount {amount} has more fractional digits than the token's {decimals} decimals allow")]
    Precision { amount: String, decimals: u8 },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
