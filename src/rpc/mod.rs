//! JSON-RPC implementation of [`ChainDataSource`]
//!
//! Talks to a development node exposing the standard `eth_*` namespace and
//! `debug_traceTransaction`. Before/after snapshots come from the prestate
//! tracer in diff mode; opcode traces come from the default struct-log tracer,
//! enriched with storage context by [`convert`].

pub mod config;
pub mod convert;

use std::collections::BTreeMap;

use alloy::{
    network::TransactionBuilder,
    providers::{ext::DebugApi, DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::types::{
        trace::geth::{
            AccountState, DefaultFrame, GethDebugBuiltInTracerType, GethDebugTracingOptions,
            GethDefaultTracingOptions, GethTrace, PreStateConfig, PreStateFrame, PreStateMode,
        },
        TransactionReceipt, TransactionRequest,
    },
    transports::TransportError,
};
use tracing::{debug, warn};

use crate::{
    errors::FetchError,
    traits::ChainDataSource,
    types::{Address, Bytes, Log, OpcodeTraceEntry, SnapshotPair, B256},
};

pub use config::SourceConfig;
pub use convert::{entries_from_struct_logs, snapshots_from_prestate_diff, TraceRoot};

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND: i64 = -32601;

/// Chain data source backed by an alloy provider
#[derive(Debug, Clone)]
pub struct RpcSource<P> {
    provider: P,
    config: SourceConfig,
}

impl RpcSource<DynProvider> {
    /// Connects to the configured endpoint
    ///
    /// `http(s)://` URLs get an HTTP transport, `ws(s)://` URLs a WebSocket
    /// transport. Anything else is rejected with [`FetchError::InvalidRpcUrl`].
    ///
    /// # Example
    /// ```no_run
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use evm_state_diff::{RpcSource, SourceConfig};
    /// let source = RpcSource::connect(SourceConfig::default()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: SourceConfig) -> Result<Self, FetchError> {
        let provider = if config.is_http() {
            let url = config
                .rpc_url
                .parse()
                .map_err(|_| FetchError::InvalidRpcUrl(config.rpc_url.clone()))?;
            ProviderBuilder::new().connect_http(url).erased()
        } else if config.is_ws() {
            let ws_connect = WsConnect::new(config.rpc_url.clone());
            ProviderBuilder::new()
                .connect_ws(ws_connect)
                .await
                .map_err(|err| FetchError::Connection(err.to_string()))?
                .erased()
        } else {
            return Err(FetchError::InvalidRpcUrl(config.rpc_url.clone()));
        };

        debug!(rpc_url = %config.rpc_url, "connected chain data source");
        Ok(Self::new(provider, config))
    }
}

impl<P: Provider> RpcSource<P> {
    /// Wraps an existing provider
    pub fn new(provider: P, config: SourceConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, FetchError> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| FetchError::TransactionNotFound(tx_hash.to_string()))
    }

    async fn debug_trace(
        &self,
        tx_hash: B256,
        mut options: GethDebugTracingOptions,
    ) -> Result<GethTrace, FetchError> {
        if let Some(timeout) = self.config.trace_timeout {
            options = options.with_timeout(timeout);
        }
        self.provider
            .debug_trace_transaction(tx_hash, options)
            .await
            .map_err(trace_error)
    }

    async fn prestate(
        &self,
        tx_hash: B256,
        diff_mode: bool,
    ) -> Result<PreStateFrame, FetchError> {
        let options = GethDebugTracingOptions::new_tracer(GethDebugBuiltInTracerType::PreStateTracer)
            .with_prestate_config(PreStateConfig {
                diff_mode: Some(diff_mode),
                ..Default::default()
            });

        match self.debug_trace(tx_hash, options).await? {
            GethTrace::PreStateTracer(frame) => Ok(frame),
            other => Err(FetchError::UnexpectedTraceFrame(format!(
                "expected prestate frame, got {}",
                frame_kind(&other)
            ))),
        }
    }

    /// Pre-transaction state of every touched account, storage included
    async fn touched_accounts(
        &self,
        tx_hash: B256,
    ) -> Result<BTreeMap<Address, AccountState>, FetchError> {
        match self.prestate(tx_hash, false).await? {
            PreStateFrame::Default(PreStateMode(accounts)) => Ok(accounts),
            PreStateFrame::Diff(_) => Err(FetchError::UnexpectedTraceFrame(
                "expected prestate accounts, got a diff".to_string(),
            )),
        }
    }

    async fn struct_logs(&self, tx_hash: B256) -> Result<DefaultFrame, FetchError> {
        let options = GethDebugTracingOptions {
            config: GethDefaultTracingOptions {
                disable_storage: Some(false),
                disable_stack: Some(false),
                enable_memory: Some(false),
                enable_return_data: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.debug_trace(tx_hash, options).await? {
            GethTrace::Default(frame) => Ok(frame),
            other => Err(FetchError::UnexpectedTraceFrame(format!(
                "expected struct logs, got {}",
                frame_kind(&other)
            ))),
        }
    }
}

impl<P: Provider> ChainDataSource for RpcSource<P> {
    async fn receipt_logs(&self, tx_hash: B256) -> Result<Vec<Log>, FetchError> {
        let receipt = self.receipt(tx_hash).await?;
        let logs: Vec<Log> = receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect();
        debug!(%tx_hash, count = logs.len(), "fetched receipt logs");
        Ok(logs)
    }

    async fn state_snapshots(&self, tx_hash: B256) -> Result<SnapshotPair, FetchError> {
        match self.prestate(tx_hash, true).await? {
            PreStateFrame::Diff(diff) => {
                let pair = snapshots_from_prestate_diff(diff);
                debug!(
                    %tx_hash,
                    before = pair.before.len(),
                    after = pair.after.len(),
                    "fetched state snapshots"
                );
                Ok(pair)
            }
            PreStateFrame::Default(_) => Err(FetchError::UnexpectedTraceFrame(
                "expected prestate diff, got full prestate".to_string(),
            )),
        }
    }

    async fn opcode_trace(&self, tx_hash: B256) -> Result<Vec<OpcodeTraceEntry>, FetchError> {
        let receipt = self.receipt(tx_hash).await?;
        let root = match (receipt.to, receipt.contract_address) {
            (Some(to), _) => TraceRoot::Call(to),
            (None, Some(created)) => TraceRoot::Create(created),
            (None, None) => {
                return Err(FetchError::Rpc(format!(
                    "receipt of {tx_hash} has neither a recipient nor a created contract"
                )))
            }
        };

        let prestate = self.touched_accounts(tx_hash).await?;
        let frame = self.struct_logs(tx_hash).await?;
        if frame.failed {
            warn!(%tx_hash, "traced transaction reverted");
        }

        let entries = entries_from_struct_logs(&frame.struct_logs, root, &prestate);
        debug!(%tx_hash, steps = entries.len(), "fetched opcode trace");
        Ok(entries)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, FetchError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.provider.call(request).await.map_err(rpc_error)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, FetchError> {
        self.provider.get_code_at(address).await.map_err(rpc_error)
    }
}

fn rpc_error(err: TransportError) -> FetchError {
    FetchError::Rpc(err.to_string())
}

/// Maps tracer failures, singling out nodes without debug tracing support
fn trace_error(err: TransportError) -> FetchError {
    match err.as_error_resp() {
        Some(payload) if is_unsupported(payload.code, &payload.message) => {
            FetchError::TraceUnsupported(payload.message.to_string())
        }
        _ => rpc_error(err),
    }
}

fn is_unsupported(code: i64, message: &str) -> bool {
    code == METHOD_NOT_FOUND || message.contains("not supported")
}

fn frame_kind(trace: &GethTrace) -> &'static str {
    match trace {
        GethTrace::Default(_) => "struct logs",
        GethTrace::CallTracer(_) => "call frame",
        GethTrace::PreStateTracer(_) => "prestate frame",
        GethTrace::FourByteTracer(_) => "4byte frame",
        _ => "another tracer's output",
    }
}
