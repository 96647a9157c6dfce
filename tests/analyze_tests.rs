mod common;

use alloy::primitives::{b256, B256, U256};
use anyhow::Result;
use common::*;
use evm_state_diff::{
    analyze_transaction,
    types::{OpcodeTraceEntry, SnapshotPair, StorageAccess, TokenType},
    AnalysisOptions, DiffError, FetchError, ReconstructError, TransferDetector,
};

const TX_HASH: B256 = b256!("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060");
const TOKEN_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

/// ALICE transfers 250 tokens to BOB, paying 21_000 wei of fees
fn token_transfer_source() -> MockSource {
    let mut source = MockSource::new(TX_HASH);
    source.logs = vec![erc20_transfer(TOKEN, ALICE, BOB, 250)];
    source.snapshots = SnapshotPair {
        before: [
            account(ALICE, 1_000_000, 3, &[]),
            account(TOKEN, 0, 1, TOKEN_CODE),
        ]
        .into_iter()
        .collect(),
        after: [
            account(ALICE, 979_000, 4, &[]),
            account(TOKEN, 0, 1, TOKEN_CODE),
        ]
        .into_iter()
        .collect(),
    };
    let alice_slot = U256::from(7);
    let bob_slot = U256::from(8);
    source.trace = Some(vec![
        OpcodeTraceEntry::new("PUSH1", 0, 1, 80_000, 3).with_address(TOKEN),
        OpcodeTraceEntry::new("SLOAD", 110, 1, 79_000, 2100)
            .with_address(TOKEN)
            .with_stack(vec![alice_slot])
            .with_value(word(1_000)),
        OpcodeTraceEntry::new("SSTORE", 140, 1, 76_000, 2900)
            .with_address(TOKEN)
            .with_stack(vec![U256::from(750), alice_slot])
            .with_old_value(word(1_000)),
        OpcodeTraceEntry::new("SSTORE", 180, 1, 73_000, 20_000)
            .with_address(TOKEN)
            .with_stack(vec![U256::from(250), bob_slot])
            .with_old_value(B256::ZERO),
        OpcodeTraceEntry::new("STOP", 200, 1, 53_000, 0).with_address(TOKEN),
    ]);
    source
}

#[tokio::test(flavor = "multi_thread")]
async fn test_analyze_token_transfer() -> Result<()> {
    init_logger();
    let source = token_transfer_source();

    let analysis = analyze_transaction(&source, TX_HASH, &AnalysisOptions::default()).await?;

    assert_eq!(analysis.token_transfers.len(), 1);
    let transfer = &analysis.token_transfers[0];
    assert_eq!(transfer.token_type, TokenType::Erc20);
    assert_eq!(transfer.value, Some(U256::from(250)));
    assert_eq!((transfer.from, transfer.to), (ALICE, BOB));

    let diff = &analysis.state_diff;
    assert_eq!(diff.transaction_hash, TX_HASH);
    // the token contract itself did not change
    assert_eq!(diff.changes.len(), 1);
    let alice = diff.change_for(&ALICE).expect("sender changed");
    assert_eq!(alice.balance.as_ref().map(|b| b.diff.to_string()), Some("-21000".to_string()));
    assert_eq!(alice.nonce.as_ref().map(|n| n.diff), Some(1));
    assert!(alice.code.is_none());

    let operations = diff.storage_operations.as_ref().expect("trace captured");
    assert_eq!(operations.len(), 3);
    assert!(operations.iter().all(|op| op.address == TOKEN));
    assert_eq!(
        operations[1].access,
        StorageAccess::Store {
            old_value: word(1_000),
            new_value: word(750),
        }
    );

    assert_eq!(analysis.summary.storage_reads, 1);
    assert_eq!(analysis.summary.storage_writes, 2);
    assert_eq!(analysis.summary.slots_written, 2);
    assert_eq!(analysis.summary.storage_gas_cost, 25_000);
    assert_eq!(analysis.transfer_summary.total, 1);
    Ok(())
}

#[tokio::test]
async fn test_analyze_without_storage_capture() -> Result<()> {
    let mut source = token_transfer_source();
    // a node without debug tracing is fine when no trace is requested
    source.trace = None;

    let options = AnalysisOptions::default().with_capture_storage(false);
    let analysis = analyze_transaction(&source, TX_HASH, &options).await?;

    assert!(analysis.state_diff.storage_operations.is_none());
    assert_eq!(analysis.summary.storage_writes, 0);
    assert_eq!(analysis.token_transfers.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_trace_unsupported_surfaces_as_fetch_error() {
    let mut source = token_transfer_source();
    source.trace = None;

    let result = analyze_transaction(&source, TX_HASH, &AnalysisOptions::default()).await;
    assert!(matches!(
        result,
        Err(DiffError::Fetch(FetchError::TraceUnsupported(_)))
    ));
}

#[tokio::test]
async fn test_unknown_transaction() {
    let source = token_transfer_source();
    let result = analyze_transaction(&source, B256::ZERO, &AnalysisOptions::default()).await;
    assert!(matches!(
        result,
        Err(DiffError::Fetch(FetchError::TransactionNotFound(_)))
    ));
}

#[tokio::test]
async fn test_malformed_trace_fails_whole_analysis() {
    let mut source = token_transfer_source();
    if let Some(trace) = source.trace.as_mut() {
        // SLOAD without the value read
        trace[1].value = None;
    }

    let result = analyze_transaction(&source, TX_HASH, &AnalysisOptions::default()).await;
    match result {
        Err(DiffError::Reconstruct(ReconstructError::MalformedTraceEntry { index, op, field })) => {
            assert_eq!(index, 1);
            assert_eq!(op, "SLOAD");
            assert_eq!(field, "value");
        }
        other => panic!("expected malformed trace entry, got {other:?}"),
    }
}

#[tokio::test]
async fn test_token_type_override_reinterprets_nft_transfer() -> Result<()> {
    let mut source = MockSource::new(TX_HASH);
    // an ERC721 contract emitting the three-topic shape
    source.logs = vec![erc20_transfer(NFT, ALICE, BOB, 42)];

    let plain = analyze_transaction(
        &source,
        TX_HASH,
        &AnalysisOptions::default().with_capture_storage(false),
    )
    .await?;
    assert_eq!(plain.token_transfers[0].token_type, TokenType::Erc20);

    let options = AnalysisOptions::default()
        .with_capture_storage(false)
        .with_detector(TransferDetector::new().with_token_type(NFT, TokenType::Erc721));
    let overridden = analyze_transaction(&source, TX_HASH, &options).await?;
    let transfer = &overridden.token_transfers[0];
    assert_eq!(transfer.token_type, TokenType::Erc721);
    assert_eq!(transfer.token_id, Some(U256::from(42)));
    assert_eq!(transfer.value, None);
    Ok(())
}

#[test]
fn test_analysis_is_reproducible() {
    let source = token_transfer_source();
    let options = AnalysisOptions::default();

    let first = tokio_test::block_on(analyze_transaction(&source, TX_HASH, &options)).unwrap();
    let second = tokio_test::block_on(analyze_transaction(&source, TX_HASH, &options)).unwrap();
    assert_eq!(first, second);
}
