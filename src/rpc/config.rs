//! Chain data source configuration

use std::time::Duration;

/// Default endpoint of a local development node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Default upper bound for a single `debug_traceTransaction` call
pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters of an [`RpcSource`](super::RpcSource)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// RPC endpoint URL (`http(s)://` or `ws(s)://`)
    pub rpc_url: String,
    /// Tracer timeout forwarded to the node, `None` for the node's default
    pub trace_timeout: Option<Duration>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            trace_timeout: Some(DEFAULT_TRACE_TIMEOUT),
        }
    }
}

impl SourceConfig {
    /// Configuration for the given endpoint with default tracing parameters
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    pub fn with_trace_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.trace_timeout = timeout;
        self
    }

    /// Returns true if the endpoint is a WebSocket URL
    pub fn is_ws(&self) -> bool {
        self.rpc_url.starts_with("ws://") || self.rpc_url.starts_with("wss://")
    }

    /// Returns true if the endpoint is an HTTP URL
    pub fn is_http(&self) -> bool {
        self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")
    }
}
