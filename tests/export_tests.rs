mod common;

use alloy::primitives::{address, b256, Address, Bytes, B256, U256};
use anyhow::Result;
use common::*;
use evm_state_diff::{
    build_state_diff, detect_transfers, export_state_diff, export_token_transfers,
    import_state_diff,
    types::{AccountSnapshot, AddressCategory, OpcodeTraceEntry, SnapshotMap},
    ExportError,
};
use serde_json::Value;

const TX_HASH: B256 = b256!("0xa1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90");
const DEPLOYED: Address = address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");
const DESTROYED: Address = address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");

fn snapshots() -> (SnapshotMap, SnapshotMap) {
    let before: SnapshotMap = [
        AccountSnapshot::new(ALICE, U256::MAX, 9, Bytes::new()),
        account(DESTROYED, 5, 1, &[0x60, 0x00, 0xff]),
    ]
    .into_iter()
    .collect();
    let after: SnapshotMap = [
        AccountSnapshot::new(ALICE, U256::MAX - U256::from(5), 10, Bytes::new()),
        AccountSnapshot::empty(DESTROYED),
        account(DEPLOYED, 0, 1, &[0x60, 0x80]),
    ]
    .into_iter()
    .collect();
    (before, after)
}

fn trace() -> Vec<OpcodeTraceEntry> {
    vec![
        OpcodeTraceEntry::new("SSTORE", 12, 2, 60_000, 22_100)
            .with_address(DEPLOYED)
            .with_stack(vec![U256::MAX, U256::ZERO])
            .with_old_value(B256::ZERO),
        OpcodeTraceEntry::new("SLOAD", 30, 2, 37_000, 100)
            .with_address(DEPLOYED)
            .with_stack(vec![U256::ZERO])
            .with_value(B256::from(U256::MAX.to_be_bytes::<32>())),
    ]
}

#[test]
fn test_state_diff_export_round_trip() -> Result<()> {
    init_logger();
    let (before, after) = snapshots();
    let diff = build_state_diff(TX_HASH, &before, &after, Some(&trace()))?;
    assert_eq!(diff.changes.len(), 3);

    let json = export_state_diff(&diff)?;
    let restored = import_state_diff(&json)?;
    assert_eq!(restored, diff);

    assert_eq!(
        restored.categorize_address(&DEPLOYED, &[0x60, 0x80]),
        AddressCategory::NewlyDeployed
    );
    assert_eq!(
        restored.categorize_address(&DESTROYED, &[]),
        AddressCategory::Destroyed
    );
    assert_eq!(restored.categorize_address(&ALICE, &[]), AddressCategory::Eoa);
    Ok(())
}

#[test]
fn test_export_document_shape() -> Result<()> {
    let (before, after) = snapshots();
    let diff = build_state_diff(TX_HASH, &before, &after, Some(&trace()))?;
    let document: Value = serde_json::from_str(&export_state_diff(&diff)?)?;

    assert_eq!(
        document["transactionHash"],
        Value::String(TX_HASH.to_string())
    );
    let alice = &document["changes"][0];
    // big integers are decimal strings
    assert_eq!(alice["balance"]["before"], Value::String(U256::MAX.to_string()));
    assert_eq!(alice["balance"]["diff"], Value::String("-5".to_string()));
    assert_eq!(alice["nonce"]["diff"], Value::from(1));

    let store = &document["storageOperations"][0];
    assert_eq!(store["op"], Value::String("SSTORE".to_string()));
    assert!(store.get("oldValue").is_some());
    assert!(store.get("newValue").is_some());
    assert_eq!(document["storageOperations"][1]["op"], "SLOAD");
    Ok(())
}

#[test]
fn test_missing_trace_exports_null_operations() -> Result<()> {
    let (before, after) = snapshots();
    let diff = build_state_diff(TX_HASH, &before, &after, None)?;
    let document: Value = serde_json::from_str(&export_state_diff(&diff)?)?;
    assert!(document["storageOperations"].is_null());
    assert_eq!(import_state_diff(&export_state_diff(&diff)?)?, diff);
    Ok(())
}

#[test]
fn test_reconstruction_is_idempotent() -> Result<()> {
    let (before, after) = snapshots();
    let first = build_state_diff(TX_HASH, &before, &after, Some(&trace()))?;
    let second = build_state_diff(TX_HASH, &before, &after, Some(&trace()))?;
    assert_eq!(first, second);
    assert_eq!(export_state_diff(&first)?, export_state_diff(&second)?);
    Ok(())
}

#[test]
fn test_import_rejects_hex_integers() {
    let (before, after) = snapshots();
    let diff = build_state_diff(TX_HASH, &before, &after, None).unwrap();
    let json = export_state_diff(&diff)
        .unwrap()
        .replacen("\"-5\"", "\"-0x5\"", 1);

    assert!(matches!(import_state_diff(&json), Err(ExportError::Parse(_))));
    assert!(matches!(import_state_diff("{"), Err(ExportError::Parse(_))));
}

#[test]
fn test_token_transfer_export() -> Result<()> {
    let logs = vec![
        erc20_transfer(TOKEN, Address::ZERO, ALICE, 1_000),
        erc721_transfer(NFT, ALICE, BOB, 7),
    ];
    let transfers = detect_transfers(&logs);
    let document: Value = serde_json::from_str(&export_token_transfers(&transfers)?)?;

    assert_eq!(document[0]["type"], "ERC20");
    assert_eq!(document[0]["value"], "1000");
    assert!(document[0]["tokenId"].is_null());
    assert_eq!(document[1]["type"], "ERC721");
    assert_eq!(document[1]["tokenId"], "7");
    assert_eq!(document[1]["logIndex"], 1);
    Ok(())
}
