use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::WalletError;

// ERC-20 ABI, just the two calls the engine makes.
sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
    }
}

/// ABI-encode a `balanceOf(owner)` call.
pub fn encode_balance_of(owner: Address) -> Vec<u8> {
    IERC20::balanceOfCall { account: owner }.abi_encode()
}

/// Decode the return data of a `balanceOf` call into the raw,
/// undecimalized balance.
pub fn decode_balance_of(data: &[u8]) -> Result<U256, WalletError> {
    IERC20::balanceOfCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| WalletError::InvalidInput(format!("balanceOf return data: {e}")))
}

/// ABI-encode a `transfer(to, rawAmount)` call.
pub fn encode_transfer(to: Address, raw_amount: U256) -> Vec<u8> {
    IERC20::transferCall {
        to,
        value: raw_amount,
    }
    .abi_encode()
}

/// Scale a human decimal amount (e.g. `"1.5"`) to the token's raw integer
/// representation.
///
/// Integer arithmetic only. Amounts with more fractional digits than
/// `decimals` are rejected with [`WalletError::Precision`] instead of being
/// rounded.
pub fn scale_to_raw(amount: &str, decimals: u8) -> Result<U256, WalletError> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(WalletError::InvalidInput("empty amount".to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(WalletError::InvalidInput(format!(
            "malformed amount {amount:?}"
        )));
    }
    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(WalletError::Precision {
            amount: amount.to_string(),
            decimals,
        });
    }

    let scale = U256::from(10).pow(U256::from(decimals));
    let whole_part = if whole.is_empty() {
        U256::ZERO
    } else {
        parse_decimal_digits(whole)?
    };
    let frac_part = if frac.is_empty() {
        U256::ZERO
    } else {
        let shift = U256::from(10).pow(U256::from(decimals as usize - frac.len()));
        parse_decimal_digits(frac)? * shift
    };

    whole_part
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(frac_part))
        .ok_or_else(|| WalletError::InvalidInput(format!("amount {amount:?} overflows")))
}

/// Render a raw integer amount as a decimal string, trimming trailing
/// zeros from the fractional part.
pub fn scale_from_raw(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = raw / divisor;
    let fractional = raw % divisor;

    if fractional.is_zero() {
        whole.to_string()
    } else {
        let digits = fractional.to_string();
        let padded = format!("{}{digits}", "0".repeat(decimals as usize - digits.len()));
        let trimmed = padded.trim_end_matches('0');
        format!("{whole}.{trimmed}")
    }
}

/// Render a raw amount with exactly 2 fractional digits (half-up rounding),
/// the format transfer-history values are displayed in.
pub fn format_fixed2(raw: U256, decimals: u8) -> String {
    let divisor = U256::from(10).pow(U256::from(decimals));
    let mut whole = raw / divisor;
    let remainder = raw % divisor;
    let mut cents = match decimals {
        0 => U256::ZERO,
        1 => remainder * U256::from(10),
        _ => {
            let unit = U256::from(10).pow(U256::from(decimals - 2));
            (remainder + unit / U256::from(2)) / unit
        }
    };
    if cents >= U256::from(100) {
        whole += U256::from(1);
        cents -= U256::from(100);
    }
    format!("{whole}.{:02}", cents.to::<u64>())
}

fn parse_decimal_digits(digits: &str) -> Result<U256, WalletError> {
    U256::from_str_radix(digits, 10)
        .map_err(|e| WalletError::InvalidInput(format!("amount digits {digits:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
    const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

    #[test]
    fn encodes_balance_of_with_the_canonical_selector() {
        let encoded = encode_balance_of(Address::repeat_byte(0x11));
        assert_eq!(&encoded[..4], &BALANCE_OF_SELECTOR);
        assert_eq!(encoded.len(), 4 + 32);
    }

    #[test]
    fn encodes_transfer_with_the_canonical_selector() {
        let encoded = encode_transfer(Address::repeat_byte(0x22), U256::from(1000));
        assert_eq!(&encoded[..4], &TRANSFER_SELECTOR);
        assert_eq!(encoded.len(), 4 + 32 + 32);
    }

    #[test]
    fn decodes_balance_of_return_data() {
        let data = U256::from(12345).to_be_bytes::<32>();
        assert_eq!(decode_balance_of(&data).unwrap(), U256::from(12345));
    }

    #[test]
    fn rejects_truncated_return_data() {
        assert!(decode_balance_of(&[0u8; 16]).is_err());
    }

    #[test]
    fn scales_whole_and_fractional_amounts() {
        assert_eq!(
            scale_to_raw("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(scale_to_raw("123.45", 2).unwrap(), U256::from(12345));
        assert_eq!(scale_to_raw("0.01", 2).unwrap(), U256::from(1));
        assert_eq!(scale_to_raw("42", 0).unwrap(), U256::from(42));
        assert_eq!(scale_to_raw("0", 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        assert_eq!(scale_to_raw("1.50", 1).unwrap(), U256::from(15));
    }

    #[test]
    fn rejects_excess_fractional_digits() {
        let err = scale_to_raw("0.123", 2).unwrap_err();
        assert!(matches!(
            err,
            WalletError::Precision { decimals: 2, .. }
        ));
        assert!(matches!(
            scale_to_raw("1.5", 0).unwrap_err(),
            WalletError::Precision { .. }
        ));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", ".", "1.2.3", "-1", "1,5", "abc"] {
            assert!(
                matches!(scale_to_raw(bad, 18), Err(WalletError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn round_trips_accepted_amounts() {
        for (amount, decimals) in [("1.5", 18u8), ("123.45", 2), ("0.000001", 6), ("7", 3)] {
            let raw = scale_to_raw(amount, decimals).unwrap();
            assert_eq!(scale_from_raw(raw, decimals), amount);
        }
    }

    #[test]
    fn formats_raw_balances() {
        assert_eq!(scale_from_raw(U256::from(12345), 2), "123.45");
        assert_eq!(scale_from_raw(U256::from(1000), 2), "10");
        assert_eq!(scale_from_raw(U256::from(5), 4), "0.0005");
        assert_eq!(scale_from_raw(U256::from(7), 0), "7");
    }

    #[test]
    fn formats_history_values_to_two_digits() {
        assert_eq!(format_fixed2(U256::from(12345), 2), "123.45");
        assert_eq!(format_fixed2(U256::from(5), 0), "5.00");
        assert_eq!(format_fixed2(U256::from(15), 1), "1.50");
        // Half-up rounding at the third fractional digit.
        assert_eq!(format_fixed2(U256::from(1999), 3), "2.00");
        assert_eq!(format_fixed2(U256::from(1994), 3), "1.99");
    }
}
