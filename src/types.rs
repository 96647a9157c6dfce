//! Core types for state diff reconstruction and transfer detection
//!
//! This module defines the data structures shared by the whole crate:
//! - Account snapshots and the before/after snapshot sets of a transaction
//! - Per-address balance, nonce and code changes
//! - Storage read/write operations recovered from an opcode trace
//! - Decoded token transfers and token type information
//!
//! All result types implement `Serialize` and `Deserialize`. Big integers
//! (`U256`, `I256`) are written as decimal strings so exported documents
//! never lose precision.

use crate::utils::serde_utils::{decimal, decimal_opt};
pub use alloy::primitives::{Address, Bytes, Log, B256, I256, U256};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

/// Observable state of one account at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Account address
    pub address: Address,
    /// Balance in wei
    #[serde(with = "decimal")]
    pub balance: U256,
    /// Account nonce
    pub nonce: u64,
    /// Runtime bytecode, empty for externally-owned accounts
    pub code: Bytes,
}

impl AccountSnapshot {
    /// Creates a snapshot from its parts
    pub fn new(address: Address, balance: U256, nonce: u64, code: impl Into<Bytes>) -> Self {
        Self {
            address,
            balance,
            nonce,
            code: code.into(),
        }
    }

    /// Snapshot of an account that does not exist (zero balance, zero nonce, no code)
    pub fn empty(address: Address) -> Self {
        Self::new(address, U256::ZERO, 0, Bytes::new())
    }

    /// Returns true if the account holds code
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }
}

/// Snapshots keyed by address, iterated in insertion order
///
/// Insertion order is what makes diff output reproducible: the same
/// snapshots inserted in the same order always produce the same diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotMap {
    order: Vec<Address>,
    entries: HashMap<Address, AccountSnapshot>,
}

impl SnapshotMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a snapshot under its own address
    ///
    /// Replacing an existing entry keeps its original position and returns
    /// the previous snapshot.
    pub fn insert(&mut self, snapshot: AccountSnapshot) -> Option<AccountSnapshot> {
        let address = snapshot.address;
        let previous = self.entries.insert(address, snapshot);
        if previous.is_none() {
            self.order.push(address);
        }
        previous
    }

    pub fn get(&self, address: &Address) -> Option<&AccountSnapshot> {
        self.entries.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Addresses in insertion order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.order.iter()
    }

    /// Snapshots in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AccountSnapshot> {
        self.order.iter().filter_map(|address| self.entries.get(address))
    }
}

impl FromIterator<AccountSnapshot> for SnapshotMap {
    fn from_iter<I: IntoIterator<Item = AccountSnapshot>>(iter: I) -> Self {
        let mut map = SnapshotMap::new();
        for snapshot in iter {
            map.insert(snapshot);
        }
        map
    }
}

/// Account snapshots captured immediately before and after a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotPair {
    pub before: SnapshotMap,
    pub after: SnapshotMap,
}

/// Balance movement of one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    #[serde(with = "decimal")]
    pub before: U256,
    #[serde(with = "decimal")]
    pub after: U256,
    /// `after - before`
    #[serde(with = "decimal")]
    pub diff: I256,
}

/// Nonce movement of one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceChange {
    pub before: u64,
    pub after: u64,
    /// `after - before`, negative only for inconsistent input
    pub diff: i128,
}

impl NonceChange {
    /// Nonces only increase within a transaction
    pub fn is_consistent(&self) -> bool {
        self.diff >= 0
    }
}

/// How an account's code changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeChangeKind {
    /// No code before, code after
    Deployment,
    /// Code before, no code after
    Destruction,
    /// Code replaced by different code
    ///
    /// Standard EVM semantics do not allow this within one transaction; it
    /// usually points at a low-level overwrite and deserves attention.
    InPlaceModification,
}

/// Code movement of one address
///
/// Exported documents also carry the derived `isDeployment` and
/// `isDestruction` flags. On import the classification is recomputed from
/// the code bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CodeChangeRecord", from = "CodeChangeRecord")]
pub struct CodeChange {
    pub before: Bytes,
    pub after: Bytes,
    pub kind: CodeChangeKind,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeChangeRecord {
    before: Bytes,
    after: Bytes,
    kind: CodeChangeKind,
    #[serde(default)]
    is_deployment: bool,
    #[serde(default)]
    is_destruction: bool,
}

impl From<CodeChange> for CodeChangeRecord {
    fn from(change: CodeChange) -> Self {
        Self {
            is_deployment: change.is_deployment(),
            is_destruction: change.is_destruction(),
            before: change.before,
            after: change.after,
            kind: change.kind,
        }
    }
}

impl From<CodeChangeRecord> for CodeChange {
    fn from(record: CodeChangeRecord) -> Self {
        CodeChange::new(record.before, record.after)
    }
}

impl CodeChange {
    /// Classifies a code transition
    ///
    /// Callers only construct this for byte sequences that differ.
    pub fn new(before: Bytes, after: Bytes) -> Self {
        let kind = match (before.is_empty(), after.is_empty()) {
            (true, false) => CodeChangeKind::Deployment,
            (false, true) => CodeChangeKind::Destruction,
            _ => CodeChangeKind::InPlaceModification,
        };
        Self {
            before,
            after,
            kind,
        }
    }

    pub fn is_deployment(&self) -> bool {
        self.kind == CodeChangeKind::Deployment
    }

    pub fn is_destruction(&self) -> bool {
        self.kind == CodeChangeKind::Destruction
    }

    /// Neither a clean deployment nor a clean destruction
    pub fn is_anomalous(&self) -> bool {
        self.kind == CodeChangeKind::InPlaceModification
    }
}

/// Unusual but displayable facts attached to an address change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiffAnomaly {
    /// The nonce went down, which a single transaction cannot do
    InconsistentNonceChange { before: u64, after: u64 },
    /// Code changed without being deployed or destroyed
    UnclassifiableCodeChange,
}

/// All substantive changes of one address within a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressChange {
    pub address: Address,
    pub balance: Option<BalanceChange>,
    pub nonce: Option<NonceChange>,
    pub code: Option<CodeChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<DiffAnomaly>,
}

impl AddressChange {
    /// Returns true if at least one field changed
    pub fn has_changes(&self) -> bool {
        self.balance.is_some() || self.nonce.is_some() || self.code.is_some()
    }
}

/// Classification of an address for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressCategory {
    #[serde(rename = "EOA")]
    Eoa,
    Contract,
    NewlyDeployed,
    Destroyed,
}

/// Storage opcode recorded in a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOpcode {
    #[serde(rename = "SSTORE")]
    Sstore,
    #[serde(rename = "SLOAD")]
    Sload,
}

impl StorageOpcode {
    /// Parses an opcode name, returning `None` for non-storage opcodes
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SSTORE" => Some(Self::Sstore),
            "SLOAD" => Some(Self::Sload),
            _ => None,
        }
    }
}

impl fmt::Display for StorageOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sstore => f.write_str("SSTORE"),
            Self::Sload => f.write_str("SLOAD"),
        }
    }
}

/// Values moved by a storage opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum StorageAccess {
    /// Slot write
    #[serde(rename = "SSTORE", rename_all = "camelCase")]
    Store { old_value: B256, new_value: B256 },
    /// Slot read
    #[serde(rename = "SLOAD")]
    Load { value: B256 },
}

/// One SSTORE or SLOAD recorded by the opcode trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOperation {
    /// Contract whose storage was accessed
    pub address: Address,
    /// Storage slot
    pub key: B256,
    #[serde(flatten)]
    pub access: StorageAccess,
    pub program_counter: u64,
    pub call_depth: u64,
    pub gas_remaining: u64,
    pub gas_cost: u64,
}

impl StorageOperation {
    pub fn op(&self) -> StorageOpcode {
        match self.access {
            StorageAccess::Store { .. } => StorageOpcode::Sstore,
            StorageAccess::Load { .. } => StorageOpcode::Sload,
        }
    }

    pub fn is_write(&self) -> bool {
        self.op() == StorageOpcode::Sstore
    }

    /// Returns true for a write that leaves the slot value unchanged
    pub fn is_noop_write(&self) -> bool {
        matches!(self.access, StorageAccess::Store { old_value, new_value } if old_value == new_value)
    }
}

/// Complete state diff of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiff {
    pub transaction_hash: B256,
    /// Changed addresses, in the order they were first observed
    pub changes: Vec<AddressChange>,
    /// Storage operations in trace emission order, if a trace was available
    pub storage_operations: Option<Vec<StorageOperation>>,
}

impl StateDiff {
    /// Returns the change recorded for an address, if any
    pub fn change_for(&self, address: &Address) -> Option<&AddressChange> {
        self.changes.iter().find(|change| change.address == *address)
    }
}

/// One step of an opcode-level execution trace
///
/// The stack is listed bottom first, so the top of the stack is the last
/// element. `old_value` is the value an SSTORE overwrites and `value` the
/// value an SLOAD reads; both are supplied by the trace provider since
/// neither can be recovered from the stack of the step itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeTraceEntry {
    pub op: String,
    pub pc: u64,
    pub depth: u64,
    pub gas: u64,
    pub gas_cost: u64,
    /// Storage context of the step
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub stack: Option<Vec<U256>>,
    #[serde(default)]
    pub old_value: Option<B256>,
    #[serde(default)]
    pub value: Option<B256>,
}

impl OpcodeTraceEntry {
    /// Creates an entry without stack or storage data
    pub fn new(op: impl Into<String>, pc: u64, depth: u64, gas: u64, gas_cost: u64) -> Self {
        Self {
            op: op.into(),
            pc,
            depth,
            gas,
            gas_cost,
            address: None,
            stack: None,
            old_value: None,
            value: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_stack(mut self, stack: Vec<U256>) -> Self {
        self.stack = Some(stack);
        self
    }

    pub fn with_old_value(mut self, old_value: B256) -> Self {
        self.old_value = Some(old_value);
        self
    }

    pub fn with_value(mut self, value: B256) -> Self {
        self.value = Some(value);
        self
    }

    /// Stack item `n` positions below the top (0 is the top)
    pub fn stack_item(&self, n: usize) -> Option<U256> {
        let stack = self.stack.as_ref()?;
        stack.len().checked_sub(n + 1).map(|index| stack[index])
    }
}

/// Token standard of a transfer or a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Erc20 => f.write_str("ERC20"),
            Self::Erc721 => f.write_str("ERC721"),
            Self::Erc1155 => f.write_str("ERC1155"),
        }
    }
}

/// Record of a decoded token transfer event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    /// Token contract address
    pub token: Address,
    /// Sender address
    pub from: Address,
    /// Recipient address
    pub to: Address,
    /// Operator that moved the tokens (ERC1155 only)
    pub operator: Option<Address>,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// ERC20 amount or ERC1155 quantity
    #[serde(with = "decimal_opt")]
    pub value: Option<U256>,
    /// Token id (ERC721 and ERC1155 only)
    #[serde(with = "decimal_opt")]
    pub token_id: Option<U256>,
    /// Position of the emitting log in the receipt's log list
    pub log_index: usize,
}

impl TokenTransfer {
    /// Returns true if tokens were created rather than moved
    pub fn is_mint(&self) -> bool {
        self.from == Address::ZERO
    }

    /// Returns true if tokens were destroyed rather than moved
    pub fn is_burn(&self) -> bool {
        self.to == Address::ZERO
    }
}

/// Result of probing a contract for token behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTypeInfo {
    pub is_token: bool,
    #[serde(rename = "type")]
    pub token_type: Option<TokenType>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    #[serde(with = "decimal_opt")]
    pub total_supply: Option<U256>,
}

impl TokenTypeInfo {
    /// The answer for anything that is not a recognizable token
    pub fn not_token() -> Self {
        Self::default()
    }
}
