//! Token interface utilities
//!
//! Provides the well-known event signatures of the Transfer family and the
//! call encoders/decoders used to probe a contract for token behavior.

use alloy::{
    primitives::{keccak256, Bytes, FixedBytes, B256, U256},
    sol,
    sol_types::SolCall,
};
use once_cell::sync::Lazy;

// Token metadata and interface detection calls
//
// Generates Rust bindings for:
// - name(): Returns token name
// - symbol(): Returns token symbol
// - decimals(): Returns token decimal places
// - totalSupply(): Returns total token supply
// - supportsInterface(bytes4): ERC165 interface detection
sol! {
    function name() public returns (string);
    function symbol() public returns (string);
    function decimals() public returns (uint8);
    function totalSupply() public returns (uint256);
    function supportsInterface(bytes4 interfaceId) public returns (bool);
}

/// ERC20 and ERC721 Transfer event signature
/// keccak256("Transfer(address,address,uint256)")
pub static TRANSFER_EVENT_SIGNATURE: Lazy<B256> =
    Lazy::new(|| keccak256(b"Transfer(address,address,uint256)"));

/// ERC1155 TransferSingle event signature
/// keccak256("TransferSingle(address,address,address,uint256,uint256)")
pub static TRANSFER_SINGLE_EVENT_SIGNATURE: Lazy<B256> =
    Lazy::new(|| keccak256(b"TransferSingle(address,address,address,uint256,uint256)"));

/// ERC1155 TransferBatch event signature
/// keccak256("TransferBatch(address,address,address,uint256[],uint256[])")
pub static TRANSFER_BATCH_EVENT_SIGNATURE: Lazy<B256> =
    Lazy::new(|| keccak256(b"TransferBatch(address,address,address,uint256[],uint256[])"));

/// ERC165 interface id of ERC721
pub const ERC721_INTERFACE_ID: FixedBytes<4> = FixedBytes::new([0x80, 0xac, 0x58, 0xcd]);

/// ERC165 interface id of ERC1155
pub const ERC1155_INTERFACE_ID: FixedBytes<4> = FixedBytes::new([0xd9, 0xb6, 0x7a, 0x26]);

pub fn name_calldata() -> Bytes {
    nameCall {}.abi_encode().into()
}

pub fn symbol_calldata() -> Bytes {
    symbolCall {}.abi_encode().into()
}

pub fn decimals_calldata() -> Bytes {
    decimalsCall {}.abi_encode().into()
}

pub fn total_supply_calldata() -> Bytes {
    totalSupplyCall {}.abi_encode().into()
}

pub fn supports_interface_calldata(interface_id: FixedBytes<4>) -> Bytes {
    supportsInterfaceCall {
        interfaceId: interface_id,
    }
    .abi_encode()
    .into()
}

/// Decodes a `string` return value, `None` on malformed output
pub fn decode_string(output: &[u8]) -> Option<String> {
    nameCall::abi_decode_returns(output).ok()
}

pub fn decode_decimals(output: &[u8]) -> Option<u8> {
    decimalsCall::abi_decode_returns(output).ok()
}

pub fn decode_total_supply(output: &[u8]) -> Option<U256> {
    totalSupplyCall::abi_decode_returns(output).ok()
}

pub fn decode_supports_interface(output: &[u8]) -> Option<bool> {
    supportsInterfaceCall::abi_decode_returns(output).ok()
}
