//! Token type probing
//!
//! Asking an arbitrary address whether it is a token is speculative: most
//! addresses are not, and many contracts revert on unknown selectors. Every
//! failure along the way therefore collapses into "not a token".

use crate::{
    errors::FetchError,
    traits::ChainDataSource,
    types::{Address, Bytes, TokenType, TokenTypeInfo},
    utils::token_utils::*,
};
use alloy::primitives::FixedBytes;
use tracing::{debug, warn};

/// Classifies a contract as ERC20, ERC721, ERC1155 or non-token
///
/// Probe order:
/// 1. No code at the address: not a token
/// 2. ERC165 `supportsInterface` for ERC1155, then ERC721
/// 3. Successful `decimals()` and `totalSupply()`: ERC20
///
/// `name`, `symbol`, `decimals` and `totalSupply` are filled in whenever
/// their calls succeed. Fetch failures are logged and answered with
/// [`TokenTypeInfo::not_token`], never propagated.
pub async fn detect_token_type<S>(source: &S, address: Address) -> TokenTypeInfo
where
    S: ChainDataSource + Sync,
{
    match probe_token(source, address).await {
        Ok(info) => info,
        Err(err) => {
            warn!(%address, error = %err, "token probe failed, treating address as non-token");
            TokenTypeInfo::not_token()
        }
    }
}

async fn probe_token<S>(source: &S, address: Address) -> Result<TokenTypeInfo, FetchError>
where
    S: ChainDataSource + Sync,
{
    let code = source.code_at(address).await?;
    if code.is_empty() {
        return Ok(TokenTypeInfo::not_token());
    }

    let interface = if supports_interface(source, address, ERC1155_INTERFACE_ID).await {
        Some(TokenType::Erc1155)
    } else if supports_interface(source, address, ERC721_INTERFACE_ID).await {
        Some(TokenType::Erc721)
    } else {
        None
    };

    let name = query(source, address, name_calldata(), decode_string).await;
    let symbol = query(source, address, symbol_calldata(), decode_string).await;
    let decimals = query(source, address, decimals_calldata(), decode_decimals).await;
    let total_supply = query(source, address, total_supply_calldata(), decode_total_supply).await;

    let token_type = match interface {
        Some(token_type) => token_type,
        None if decimals.is_some() && total_supply.is_some() => TokenType::Erc20,
        None => return Ok(TokenTypeInfo::not_token()),
    };
    debug!(%address, %token_type, "detected token contract");

    Ok(TokenTypeInfo {
        is_token: true,
        token_type: Some(token_type),
        name,
        symbol,
        decimals,
        total_supply,
    })
}

async fn supports_interface<S>(source: &S, address: Address, interface_id: FixedBytes<4>) -> bool
where
    S: ChainDataSource + Sync,
{
    query(
        source,
        address,
        supports_interface_calldata(interface_id),
        decode_supports_interface,
    )
    .await
    .unwrap_or(false)
}

/// Runs one read-only call, `None` on revert, empty output or bad encoding
async fn query<S, T>(
    source: &S,
    address: Address,
    calldata: Bytes,
    decode: fn(&[u8]) -> Option<T>,
) -> Option<T>
where
    S: ChainDataSource + Sync,
{
    match source.call(address, calldata).await {
        Ok(output) if !output.is_empty() => decode(&output),
        Ok(_) => None,
        Err(err) => {
            debug!(%address, error = %err, "token probe call failed");
            None
        }
    }
}
