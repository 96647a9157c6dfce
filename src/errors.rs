//! Error types for state diff reconstruction and chain data fetching
//!
//! This module separates failures by where they originate:
//! - Reconstruction errors: malformed trace or snapshot input
//! - Fetch errors: the JSON-RPC collaborator could not deliver data
//! - Export errors: JSON serialization and parsing
//!
//! Legitimate but unusual chain states (a decreasing nonce, an in-place
//! code overwrite, a log that is not a recognizable transfer) are never
//! errors. They are carried as data on the results.

use alloy::primitives::Address;
use thiserror::Error;

/// Top-level error type for the crate
///
/// Keeps collaborator failures distinct from reconstruction failures so
/// callers can tell "the node could not answer" from "the answer was bad".
#[derive(Debug, Error)]
pub enum DiffError {
    /// Input data could not be reconstructed into a diff
    #[error("Reconstruction failed: {0}")]
    Reconstruct(#[from] ReconstructError),

    /// The chain data source failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Serialization or parsing of an exported document failed
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

/// Errors raised by the pure reconstruction functions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// A trace entry of a recognized opcode lacks a field the extraction needs
    ///
    /// # Fields
    /// * `index` - Position of the entry in the opcode trace
    /// * `op` - Opcode name of the entry
    /// * `field` - Name of the missing or malformed field
    #[error("Malformed {op} trace entry at index {index}: missing or invalid {field}")]
    MalformedTraceEntry {
        index: usize,
        op: String,
        field: &'static str,
    },

    /// A balance difference does not fit a signed 256-bit integer
    #[error("Balance difference for {address} exceeds the signed 256-bit range")]
    BalanceDiffOverflow { address: Address },
}

/// Errors raised while fetching data from the JSON-RPC collaborator
///
/// These propagate to the caller unchanged; nothing in this crate retries them.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Invalid or malformed RPC URL
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    /// Connection establishment errors
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The node does not know the requested transaction
    #[error("Transaction {0} not found")]
    TransactionNotFound(String),

    /// The node refuses debug tracing for this transaction
    #[error("Tracing not supported by node: {0}")]
    TraceUnsupported(String),

    /// The tracer answered with a frame of a different shape than requested
    #[error("Unexpected trace frame: {0}")]
    UnexpectedTraceFrame(String),

    /// Any other JSON-RPC or transport error
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Errors raised while exporting or importing JSON documents
#[derive(Debug, Error)]
pub enum ExportError {
    /// Serializing a result to JSON failed
    #[error("Failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Parsing a JSON document back into a result failed
    #[error("Failed to parse: {0}")]
    Parse(#[source] serde_json::Error),
}
