//! Utility functions shared by the detectors and the reconstructor
//!
//! # Modules
//!
//! - [`token_utils`]: Token interface utilities
//!   - Transfer-family event signatures
//!   - Metadata and ERC165 call encoding/decoding
//!
//! - [`format_utils`]: Display formatting
//!   - 32-byte hex padding
//!   - Best-effort storage word interpretation
//!   - Wei amounts in ether units
//!
//! - [`serde_utils`]: Decimal-string serialization of big integers

/// Token interface utilities
pub mod token_utils;

/// Display formatting utilities
pub mod format_utils;

/// Serde helpers
pub mod serde_utils;
