//! Display formatting for storage words and wei amounts
//!
//! Every function here is pure and total. Reinterpreting a storage word as
//! an address or an integer is a guess; when no nicer reading applies the
//! word is shown as raw hex.

use crate::types::{Address, StorageAccess, StorageOpcode, StorageOperation, B256, I256, U256};
use alloy::primitives::utils::format_ether;
use serde::Serialize;
use std::fmt;

/// Formats a word as `0x`-prefixed hex padded to 32 bytes
pub fn pad_hex32(word: U256) -> String {
    B256::from(word.to_be_bytes::<32>()).to_string()
}

/// Best-effort reading of a 32-byte storage word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordInterpretation {
    Zero,
    /// Fits 128 bits, most likely a counter, amount or flag
    Uint(U256),
    /// Twelve leading zero bytes followed by a wide value
    Address(Address),
    Raw(B256),
}

impl fmt::Display for WordInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("0"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Address(address) => write!(f, "{address}"),
            Self::Raw(word) => write!(f, "{word}"),
        }
    }
}

/// Interprets a storage word as the most plausible display value
///
/// # Example
/// ```
/// use evm_state_diff::utils::format_utils::{interpret_word, WordInterpretation};
/// use alloy::primitives::{B256, U256};
///
/// let word = B256::from(U256::from(1000).to_be_bytes::<32>());
/// assert_eq!(interpret_word(word), WordInterpretation::Uint(U256::from(1000)));
/// ```
pub fn interpret_word(word: B256) -> WordInterpretation {
    if word.is_zero() {
        return WordInterpretation::Zero;
    }
    let value = U256::from_be_bytes(word.0);
    if value <= U256::from(u128::MAX) {
        return WordInterpretation::Uint(value);
    }
    if word[..12].iter().all(|byte| *byte == 0) {
        return WordInterpretation::Address(Address::from_word(word));
    }
    WordInterpretation::Raw(word)
}

/// Display strings for one storage operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedStorageOperation {
    pub op: StorageOpcode,
    pub address: String,
    /// Slot as padded hex
    pub key: String,
    /// Overwritten value (SSTORE only)
    pub previous: Option<String>,
    /// Written or read value
    pub current: String,
}

/// Formats a storage operation for display
pub fn format_storage_operation(operation: &StorageOperation) -> FormattedStorageOperation {
    let (previous, current) = match operation.access {
        StorageAccess::Store {
            old_value,
            new_value,
        } => (
            Some(interpret_word(old_value).to_string()),
            interpret_word(new_value).to_string(),
        ),
        StorageAccess::Load { value } => (None, interpret_word(value).to_string()),
    };
    FormattedStorageOperation {
        op: operation.op(),
        address: operation.address.to_string(),
        key: operation.key.to_string(),
        previous,
        current,
    }
}

/// Formats a wei amount in ether units
pub fn format_wei(value: U256) -> String {
    format!("{} ETH", format_ether(value))
}

/// Formats a signed wei difference in ether units with an explicit sign
pub fn format_wei_diff(diff: I256) -> String {
    let sign = if diff.is_negative() { "-" } else { "+" };
    format!("{sign}{}", format_wei(diff.unsigned_abs()))
}
