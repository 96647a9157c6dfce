//! Trait definitions for the chain data collaborator
//!
//! The reconstruction logic in this crate is pure. Everything it consumes
//! comes from a [`ChainDataSource`]: receipts, before/after account
//! snapshots, opcode traces and read-only contract calls.
//!
//! # Key Traits
//! - `ChainDataSource`: Fetch raw transaction data from a node

use crate::{
    errors::FetchError,
    types::{Address, Bytes, Log, OpcodeTraceEntry, SnapshotPair, B256},
};
use std::future::Future;

/// Source of raw transaction data, typically a JSON-RPC node
///
/// Implementors surface every failure as a [`FetchError`] and never retry;
/// retry policy belongs to the caller.
pub trait ChainDataSource {
    /// Logs of the transaction's receipt, in emission order
    fn receipt_logs(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Vec<Log>, FetchError>> + Send;

    /// Account snapshots of every touched address, before and after the transaction
    fn state_snapshots(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<SnapshotPair, FetchError>> + Send;

    /// Instruction-level trace of the transaction
    fn opcode_trace(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Vec<OpcodeTraceEntry>, FetchError>> + Send;

    /// Read-only call against the latest state
    fn call(
        &self,
        to: Address,
        data: Bytes,
    ) -> impl Future<Output = Result<Bytes, FetchError>> + Send;

    /// Deployed code of an address
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}
