//! In-memory chain data source shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use alloy::primitives::{address, Address, Bytes, Log, LogData, B256, U256};
use evm_state_diff::{
    errors::FetchError,
    traits::ChainDataSource,
    types::{AccountSnapshot, OpcodeTraceEntry, SnapshotPair},
    utils::token_utils::TRANSFER_EVENT_SIGNATURE,
};

// Default anvil accounts
pub const ALICE: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BOB: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const TOKEN: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const NFT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Chain data for a single known transaction
#[derive(Debug, Default)]
pub struct MockSource {
    pub tx_hash: B256,
    pub logs: Vec<Log>,
    pub snapshots: SnapshotPair,
    /// `None` behaves like a node without debug tracing
    pub trace: Option<Vec<OpcodeTraceEntry>>,
    pub calls: HashMap<(Address, Bytes), Bytes>,
    pub code: HashMap<Address, Bytes>,
    /// Makes every `code_at` fail
    pub offline: bool,
}

impl MockSource {
    pub fn new(tx_hash: B256) -> Self {
        Self {
            tx_hash,
            ..Default::default()
        }
    }

    pub fn with_call(mut self, to: Address, calldata: Bytes, output: Vec<u8>) -> Self {
        self.calls.insert((to, calldata), output.into());
        self
    }

    pub fn with_code(mut self, address: Address, code: Vec<u8>) -> Self {
        self.code.insert(address, code.into());
        self
    }

    fn known(&self, tx_hash: B256) -> Result<(), FetchError> {
        if tx_hash == self.tx_hash {
            Ok(())
        } else {
            Err(FetchError::TransactionNotFound(tx_hash.to_string()))
        }
    }
}

impl ChainDataSource for MockSource {
    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>, FetchError> {
        self.known(tx_hash)?;
        Ok(self.logs.clone())
    }

    async fn state_snapshots(&self, tx_hash: B256) -> Result<SnapshotPair, FetchError> {
        self.known(tx_hash)?;
        Ok(self.snapshots.clone())
    }

    async fn opcode_trace(&self, tx_hash: B256) -> Result<Vec<OpcodeTraceEntry>, FetchError> {
        self.known(tx_hash)?;
        self.trace
            .clone()
            .ok_or_else(|| FetchError::TraceUnsupported("debug namespace disabled".to_string()))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, FetchError> {
        self.calls
            .get(&(to, data))
            .cloned()
            .ok_or_else(|| FetchError::Rpc("execution reverted".to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, FetchError> {
        if self.offline {
            return Err(FetchError::Connection("connection refused".to_string()));
        }
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }
}

pub fn word(value: u64) -> B256 {
    B256::from(U256::from(value).to_be_bytes::<32>())
}

pub fn address_topic(address: Address) -> B256 {
    address.into_word()
}

/// ERC20-shaped Transfer log: three topics, amount in data
pub fn erc20_transfer(token: Address, from: Address, to: Address, amount: u64) -> Log {
    Log {
        address: token,
        data: LogData::new_unchecked(
            vec![*TRANSFER_EVENT_SIGNATURE, address_topic(from), address_topic(to)],
            word(amount).0.to_vec().into(),
        ),
    }
}

/// ERC721-shaped Transfer log: four topics, no data
pub fn erc721_transfer(token: Address, from: Address, to: Address, token_id: u64) -> Log {
    Log {
        address: token,
        data: LogData::new_unchecked(
            vec![
                *TRANSFER_EVENT_SIGNATURE,
                address_topic(from),
                address_topic(to),
                word(token_id),
            ],
            Bytes::new(),
        ),
    }
}

pub fn account(address: Address, balance: u64, nonce: u64, code: &[u8]) -> AccountSnapshot {
    AccountSnapshot::new(address, U256::from(balance), nonce, code.to_vec())
}
