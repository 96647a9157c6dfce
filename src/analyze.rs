//! End-to-end analysis of one transaction
//!
//! Fetches raw data from a [`ChainDataSource`] and runs the pure
//! reconstruction steps over it: transfer detection on the receipt logs and
//! state diff reconstruction on the snapshots and, optionally, the opcode trace.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    diff::build_state_diff,
    errors::DiffError,
    summary::{summarize_state_diff, summarize_transfers, StateDiffSummary, TransferSummary},
    traits::ChainDataSource,
    transfers::TransferDetector,
    types::{StateDiff, TokenTransfer, B256},
};

/// Controls what [`analyze_transaction`] fetches and how logs are decoded
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Fetch the opcode trace and extract storage operations (default: true)
    pub capture_storage: bool,
    /// Transfer decoder, carrying any per-contract token type overrides
    pub detector: TransferDetector,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            capture_storage: true,
            detector: TransferDetector::default(),
        }
    }
}

impl AnalysisOptions {
    pub fn with_capture_storage(mut self, capture_storage: bool) -> Self {
        self.capture_storage = capture_storage;
        self
    }

    pub fn with_detector(mut self, detector: TransferDetector) -> Self {
        self.detector = detector;
        self
    }
}

/// Everything reconstructed for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub state_diff: StateDiff,
    pub token_transfers: Vec<TokenTransfer>,
    pub summary: StateDiffSummary,
    pub transfer_summary: TransferSummary,
}

/// Reconstructs token transfers and the state diff of a mined transaction
///
/// # Arguments
/// * `source` - Chain data collaborator
/// * `tx_hash` - Hash of the transaction to analyze
/// * `options` - Storage capture toggle and transfer decoder
///
/// # Errors
/// Collaborator failures surface as [`DiffError::Fetch`] and are never
/// retried. Malformed trace data surfaces as [`DiffError::Reconstruct`].
///
/// # Example
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use evm_state_diff::{analyze_transaction, AnalysisOptions, RpcSource, SourceConfig, B256};
///
/// let source = RpcSource::connect(SourceConfig::default()).await?;
/// let analysis = analyze_transaction(&source, B256::ZERO, &AnalysisOptions::default()).await?;
/// println!("{} addresses changed", analysis.summary.addresses_changed);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_transaction<S>(
    source: &S,
    tx_hash: B256,
    options: &AnalysisOptions,
) -> Result<TransactionAnalysis, DiffError>
where
    S: ChainDataSource + Sync,
{
    let logs = source.receipt_logs(tx_hash).await?;
    let token_transfers = options.detector.detect(&logs);

    let snapshots = source.state_snapshots(tx_hash).await?;
    let trace = if options.capture_storage {
        Some(source.opcode_trace(tx_hash).await?)
    } else {
        None
    };

    let state_diff = build_state_diff(
        tx_hash,
        &snapshots.before,
        &snapshots.after,
        trace.as_deref(),
    )?;

    let summary = summarize_state_diff(&state_diff);
    let transfer_summary = summarize_transfers(&token_transfers);
    debug!(
        %tx_hash,
        addresses = summary.addresses_changed,
        transfers = transfer_summary.total,
        "analyzed transaction"
    );

    Ok(TransactionAnalysis {
        state_diff,
        token_transfers,
        summary,
        transfer_summary,
    })
}
