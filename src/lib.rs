//! # EVM State Diff Reconstruction
//!
//! A library for reconstructing what a mined transaction did to chain state,
//! built for local development chains.
//!
//! ## Core Features
//!
//! - **Token Transfer Detection**
//!   - ERC20 and ERC721 `Transfer` events, told apart by log shape
//!   - ERC1155 `TransferSingle` and `TransferBatch` events
//!   - Token type probing through read-only calls
//!
//! - **State Diff Reconstruction**
//!   - Balance, nonce and code changes per touched address
//!   - Deployments, destructions and anomalous in-place code changes
//!   - Storage reads and writes recovered from opcode traces
//!
//! - **Reporting**
//!   - Summary counts over diffs and transfers
//!   - Lossless JSON export with decimal-string big integers
//!
//! ## Features
//!
//! - `rustls-tls`: Uses rustls as the TLS implementation instead of native-tls (OpenSSL).
//!
//!   Usage example:
//!   ```toml
//!   [dependencies]
//!   evm-state-diff = { version = "0.3.0", default-features = false, features = ["rustls-tls"] }
//!   ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use evm_state_diff::{
//!     analyze_transaction, export_state_diff, AnalysisOptions, RpcSource, SourceConfig,
//! };
//! use alloy::primitives::b256;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Connect to a local development node
//! let source = RpcSource::connect(SourceConfig::default()).await?;
//!
//! let tx_hash = b256!("0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060");
//! let analysis = analyze_transaction(&source, tx_hash, &AnalysisOptions::default()).await?;
//!
//! for transfer in &analysis.token_transfers {
//!     println!(
//!         "{} transfer of {:?} from {} to {}",
//!         transfer.token_type, transfer.value, transfer.from, transfer.to
//!     );
//! }
//! for change in &analysis.state_diff.changes {
//!     if let Some(balance) = &change.balance {
//!         println!("{}: {}", change.address, balance.diff);
//!     }
//! }
//!
//! println!("{}", export_state_diff(&analysis.state_diff)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `transfers`: Token transfer detection and token type probing
//! - `diff`: Balance/nonce/code diffs and storage operation extraction
//! - `summary`: Aggregate counts and JSON export
//! - `analyze`: End-to-end analysis of one transaction
//! - `rpc`: JSON-RPC chain data source
//! - `types`: Core data structures and type definitions
//! - `traits`: Trait definitions for extensibility
//! - `errors`: Error types and handling
//! - `utils`: Helper functions and utilities

pub mod types;
pub mod errors;
pub mod traits;
pub mod utils;
pub mod transfers;
pub mod diff;
pub mod summary;
pub mod analyze;
pub mod rpc;

// Re-export only the essential types and functions
pub use analyze::{analyze_transaction, AnalysisOptions, TransactionAnalysis};
pub use diff::{
    build_balance_nonce_code_diff, build_state_diff, categorize_address,
    extract_storage_operations,
};
pub use errors::{DiffError, ExportError, FetchError, ReconstructError};
pub use rpc::{RpcSource, SourceConfig};
pub use summary::{export_state_diff, export_token_transfers, import_state_diff};
pub use traits::ChainDataSource;
pub use transfers::{detect_token_type, detect_transfers, TransferDetector};
pub use types::{Address, Bytes, Log, B256, I256, U256};
