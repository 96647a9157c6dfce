//! Token transfer detection from receipt logs
//!
//! Decodes ERC20, ERC721 and ERC1155 Transfer-family events into
//! [`TokenTransfer`] records without needing the emitting contract's ABI.
//!
//! # Dispatch
//!
//! `topics[0]` is matched against a closed set of known signatures
//! ([`KnownEventSignature`]); each signature has one decoder. Logs that
//! match nothing, or match a signature but not its expected shape, are
//! skipped. Receipts routinely carry unrelated events, so a miss is not an
//! error.
//!
//! # Known limitation
//!
//! ERC20 and ERC721 share the `Transfer(address,address,uint256)` topic.
//! The standard layouts are told apart by shape: two indexed arguments plus
//! a 32-byte amount is ERC20, three indexed arguments and empty data is
//! ERC721. A token that indexes its amount is misread as ERC721 unless the
//! caller supplies the token type through [`TransferDetector::with_token_type`].

mod probe;

pub use probe::detect_token_type;

use crate::{
    types::{Address, Log, TokenTransfer, TokenType, B256, U256},
    utils::token_utils::{
        TRANSFER_BATCH_EVENT_SIGNATURE, TRANSFER_EVENT_SIGNATURE, TRANSFER_SINGLE_EVENT_SIGNATURE,
    },
};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Transfer-family events this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownEventSignature {
    /// `Transfer(address,address,uint256)`, shared by ERC20 and ERC721
    Transfer,
    /// ERC1155 `TransferSingle(address,address,address,uint256,uint256)`
    TransferSingle,
    /// ERC1155 `TransferBatch(address,address,address,uint256[],uint256[])`
    TransferBatch,
}

/// Decodes one log into zero or more transfers
///
/// Arguments: the log, the caller-supplied token type of the emitter if
/// any, and the log's index in the receipt.
type TransferDecoder = fn(&Log, Option<TokenType>, usize) -> Vec<TokenTransfer>;

impl KnownEventSignature {
    pub const ALL: [Self; 3] = [Self::Transfer, Self::TransferSingle, Self::TransferBatch];

    /// Topic hash of the event
    pub fn hash(self) -> B256 {
        match self {
            Self::Transfer => *TRANSFER_EVENT_SIGNATURE,
            Self::TransferSingle => *TRANSFER_SINGLE_EVENT_SIGNATURE,
            Self::TransferBatch => *TRANSFER_BATCH_EVENT_SIGNATURE,
        }
    }

    /// Looks up the signature of a log's first topic
    pub fn from_topic(topic: &B256) -> Option<Self> {
        Self::ALL.into_iter().find(|signature| signature.hash() == *topic)
    }

    fn decoder(self) -> TransferDecoder {
        match self {
            Self::Transfer => decode_transfer,
            Self::TransferSingle => decode_transfer_single,
            Self::TransferBatch => decode_transfer_batch,
        }
    }
}

/// Transfer detector with optional per-token type overrides
///
/// Overrides come from whoever knows better than the shape heuristic,
/// usually an uploaded ABI.
#[derive(Debug, Clone, Default)]
pub struct TransferDetector {
    overrides: HashMap<Address, TokenType>,
}

impl TransferDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the token standard of a contract, bypassing the shape heuristic
    pub fn with_token_type(mut self, token: Address, token_type: TokenType) -> Self {
        self.overrides.insert(token, token_type);
        self
    }

    /// Decodes every recognizable transfer in `logs`, preserving log order
    pub fn detect(&self, logs: &[Log]) -> Vec<TokenTransfer> {
        let transfers: Vec<TokenTransfer> = logs
            .iter()
            .enumerate()
            .flat_map(|(index, log)| {
                let Some(signature) = log.topics().first().and_then(KnownEventSignature::from_topic)
                else {
                    return Vec::new();
                };
                let decode = signature.decoder();
                decode(log, self.overrides.get(&log.address).copied(), index)
            })
            .collect();
        debug!(logs = logs.len(), transfers = transfers.len(), "detected token transfers");
        transfers
    }
}

/// Decodes every recognizable transfer in `logs`, preserving log order
///
/// # Example
/// ```
/// use alloy::primitives::{address, Bytes, Log, U256};
/// use evm_state_diff::{detect_transfers, types::TokenType};
/// use evm_state_diff::utils::token_utils::TRANSFER_EVENT_SIGNATURE;
///
/// let token = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
/// let from = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
/// let to = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
/// let log = Log::new_unchecked(
///     token,
///     vec![*TRANSFER_EVENT_SIGNATURE, from.into_word(), to.into_word()],
///     Bytes::from(U256::from(1000).to_be_bytes::<32>().to_vec()),
/// );
///
/// let transfers = detect_transfers(&[log]);
/// assert_eq!(transfers[0].token_type, TokenType::Erc20);
/// assert_eq!(transfers[0].value, Some(U256::from(1000)));
/// ```
pub fn detect_transfers(logs: &[Log]) -> Vec<TokenTransfer> {
    TransferDetector::default().detect(logs)
}

fn decode_transfer(log: &Log, declared: Option<TokenType>, log_index: usize) -> Vec<TokenTransfer> {
    let topics = log.topics();
    let data = &log.data.data;
    let (token_type, value, token_id) = match (topics.len(), data.len(), declared) {
        // ERC20 that indexes its amount
        (4, 0, Some(TokenType::Erc20)) => (TokenType::Erc20, Some(word_to_u256(&topics[3])), None),
        (4, 0, _) => (TokenType::Erc721, None, Some(word_to_u256(&topics[3]))),
        // ERC721 that does not index its token id
        (3, 32, Some(TokenType::Erc721)) => {
            (TokenType::Erc721, None, Some(U256::from_be_slice(data)))
        }
        (3, 32, _) => (TokenType::Erc20, Some(U256::from_be_slice(data)), None),
        (topic_count, data_len, _) => {
            trace!(
                token = %log.address,
                topic_count,
                data_len,
                "Transfer log matches neither ERC20 nor ERC721 layout"
            );
            return Vec::new();
        }
    };
    vec![TokenTransfer {
        token: log.address,
        from: Address::from_word(topics[1]),
        to: Address::from_word(topics[2]),
        operator: None,
        token_type,
        value,
        token_id,
        log_index,
    }]
}

fn decode_transfer_single(log: &Log, _: Option<TokenType>, log_index: usize) -> Vec<TokenTransfer> {
    let topics = log.topics();
    let data = &log.data.data;
    if topics.len() != 4 || data.len() != 64 {
        trace!(token = %log.address, "malformed TransferSingle log");
        return Vec::new();
    }
    vec![TokenTransfer {
        token: log.address,
        from: Address::from_word(topics[2]),
        to: Address::from_word(topics[3]),
        operator: Some(Address::from_word(topics[1])),
        token_type: TokenType::Erc1155,
        value: Some(U256::from_be_slice(&data[32..64])),
        token_id: Some(U256::from_be_slice(&data[..32])),
        log_index,
    }]
}

fn decode_transfer_batch(log: &Log, _: Option<TokenType>, log_index: usize) -> Vec<TokenTransfer> {
    let topics = log.topics();
    if topics.len() != 4 {
        trace!(token = %log.address, "malformed TransferBatch log");
        return Vec::new();
    }
    let Some((ids, values)) = decode_batch_amounts(&log.data.data) else {
        trace!(token = %log.address, "undecodable TransferBatch data");
        return Vec::new();
    };
    let operator = Address::from_word(topics[1]);
    let from = Address::from_word(topics[2]);
    let to = Address::from_word(topics[3]);
    ids.into_iter()
        .zip(values)
        .map(|(id, value)| TokenTransfer {
            token: log.address,
            from,
            to,
            operator: Some(operator),
            token_type: TokenType::Erc1155,
            value: Some(value),
            token_id: Some(id),
            log_index,
        })
        .collect()
}

/// Decodes `(uint256[] ids, uint256[] values)`, requiring equal lengths
fn decode_batch_amounts(data: &[u8]) -> Option<(Vec<U256>, Vec<U256>)> {
    let uint_array = DynSolType::Array(Box::new(DynSolType::Uint(256)));
    let decoded = DynSolType::Tuple(vec![uint_array.clone(), uint_array])
        .abi_decode_params(data)
        .ok()?;
    let DynSolValue::Tuple(mut parts) = decoded else {
        return None;
    };
    if parts.len() != 2 {
        return None;
    }
    let values = uints(parts.pop()?)?;
    let ids = uints(parts.pop()?)?;
    (ids.len() == values.len()).then_some((ids, values))
}

fn uints(value: DynSolValue) -> Option<Vec<U256>> {
    match value {
        DynSolValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                DynSolValue::Uint(value, _) => Some(value),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn word_to_u256(word: &B256) -> U256 {
    U256::from_be_bytes(word.0)
}
