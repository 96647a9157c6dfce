//! Summary statistics and JSON export
//!
//! Aggregates a [`StateDiff`] or a transfer list into counts for display,
//! and serializes results to JSON documents that parse back exactly.

use crate::{
    errors::ExportError,
    types::*,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Aggregate counts over one state diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiffSummary {
    pub addresses_changed: usize,
    pub balance_changes: usize,
    pub nonce_changes: usize,
    pub code_changes: usize,
    pub deployments: usize,
    pub destructions: usize,
    pub in_place_code_modifications: usize,
    /// Anomalies across all addresses
    pub anomalies: usize,
    pub storage_reads: usize,
    pub storage_writes: usize,
    /// Distinct `(address, slot)` pairs written
    pub slots_written: usize,
    /// Gas charged by all storage opcodes
    pub storage_gas_cost: u64,
}

/// Counts the changes recorded in a state diff
pub fn summarize_state_diff(diff: &StateDiff) -> StateDiffSummary {
    let mut summary = StateDiffSummary {
        addresses_changed: diff.changes.len(),
        ..Default::default()
    };

    for change in &diff.changes {
        summary.balance_changes += usize::from(change.balance.is_some());
        summary.nonce_changes += usize::from(change.nonce.is_some());
        summary.anomalies += change.anomalies.len();
        if let Some(code) = &change.code {
            summary.code_changes += 1;
            match code.kind {
                CodeChangeKind::Deployment => summary.deployments += 1,
                CodeChangeKind::Destruction => summary.destructions += 1,
                CodeChangeKind::InPlaceModification => summary.in_place_code_modifications += 1,
            }
        }
    }

    let operations = diff.storage_operations.as_deref().unwrap_or_default();
    let mut written = HashSet::new();
    for operation in operations {
        summary.storage_gas_cost = summary.storage_gas_cost.saturating_add(operation.gas_cost);
        if operation.is_write() {
            summary.storage_writes += 1;
            written.insert((operation.address, operation.key));
        } else {
            summary.storage_reads += 1;
        }
    }
    summary.slots_written = written.len();
    summary
}

/// Aggregate counts over a list of token transfers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSummary {
    pub total: usize,
    /// Transfers per token standard
    pub by_type: BTreeMap<String, usize>,
    /// Distinct token contracts involved
    pub tokens: usize,
    pub mints: usize,
    pub burns: usize,
}

/// Counts token transfers by standard and contract
pub fn summarize_transfers(transfers: &[TokenTransfer]) -> TransferSummary {
    let mut by_type = BTreeMap::new();
    for transfer in transfers {
        *by_type.entry(transfer.token_type.to_string()).or_insert(0) += 1;
    }
    TransferSummary {
        total: transfers.len(),
        by_type,
        tokens: transfers
            .iter()
            .map(|transfer| transfer.token)
            .collect::<HashSet<_>>()
            .len(),
        mints: transfers.iter().filter(|transfer| transfer.is_mint()).count(),
        burns: transfers.iter().filter(|transfer| transfer.is_burn()).count(),
    }
}

/// Serializes a state diff to a pretty-printed JSON document
///
/// Balances and balance differences are decimal strings; every address
/// change and storage operation is included.
pub fn export_state_diff(diff: &StateDiff) -> Result<String, ExportError> {
    serde_json::to_string_pretty(diff).map_err(ExportError::Serialize)
}

/// Parses a document produced by [`export_state_diff`]
pub fn import_state_diff(json: &str) -> Result<StateDiff, ExportError> {
    serde_json::from_str(json).map_err(ExportError::Parse)
}

/// Serializes token transfers to a pretty-printed JSON array
pub fn export_token_transfers(transfers: &[TokenTransfer]) -> Result<String, ExportError> {
    serde_json::to_string_pretty(transfers).map_err(ExportError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, bytes};

    fn storage_op(key: u8, access: StorageAccess, gas_cost: u64) -> StorageOperation {
        StorageOperation {
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            key: B256::repeat_byte(key),
            access,
            program_counter: 0,
            call_depth: 1,
            gas_remaining: 100_000,
            gas_cost,
        }
    }

    #[test]
    fn test_summarize_state_diff() {
        let deployed = AddressChange {
            address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            balance: None,
            nonce: Some(NonceChange { before: 0, after: 1, diff: 1 }),
            code: Some(CodeChange::new(Bytes::new(), bytes!("6080"))),
            anomalies: vec![],
        };
        let sender = AddressChange {
            address: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            balance: Some(BalanceChange {
                before: U256::from(10),
                after: U256::from(4),
                diff: I256::try_from(-6).unwrap(),
            }),
            nonce: Some(NonceChange { before: 4, after: 3, diff: -1 }),
            code: None,
            anomalies: vec![DiffAnomaly::InconsistentNonceChange { before: 4, after: 3 }],
        };
        let write = StorageAccess::Store {
            old_value: B256::ZERO,
            new_value: B256::repeat_byte(1),
        };
        let diff = StateDiff {
            transaction_hash: B256::ZERO,
            changes: vec![deployed, sender],
            storage_operations: Some(vec![
                storage_op(1, StorageAccess::Load { value: B256::ZERO }, 2_100),
                storage_op(1, write, 20_000),
                storage_op(1, write, 100),
                storage_op(2, write, 20_000),
            ]),
        };

        let summary = summarize_state_diff(&diff);
        assert_eq!(summary.addresses_changed, 2);
        assert_eq!(summary.balance_changes, 1);
        assert_eq!(summary.nonce_changes, 2);
        assert_eq!(summary.code_changes, 1);
        assert_eq!(summary.deployments, 1);
        assert_eq!(summary.destructions, 0);
        assert_eq!(summary.anomalies, 1);
        assert_eq!(summary.storage_reads, 1);
        assert_eq!(summary.storage_writes, 3);
        assert_eq!(summary.slots_written, 2);
        assert_eq!(summary.storage_gas_cost, 42_200);
    }

    #[test]
    fn test_summarize_transfers() {
        let token = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
        let holder = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let mint = TokenTransfer {
            token,
            from: Address::ZERO,
            to: holder,
            operator: None,
            token_type: TokenType::Erc20,
            value: Some(U256::from(5)),
            token_id: None,
            log_index: 0,
        };
        let burn = TokenTransfer {
            from: holder,
            to: Address::ZERO,
            log_index: 1,
            ..mint.clone()
        };
        let summary = summarize_transfers(&[mint, burn]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.tokens, 1);
        assert_eq!(summary.by_type.get("ERC20"), Some(&2));
        assert_eq!(summary.mints, 1);
        assert_eq!(summary.burns, 1);
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(import_state_diff("{"), Err(ExportError::Parse(_))));
    }
}
