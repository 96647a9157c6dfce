//! State diff reconstruction
//!
//! Turns before/after account snapshots and an optional opcode trace into a
//! [`StateDiff`]:
//! - Balance, nonce and code changes per touched address
//! - Deployment / destruction / in-place modification classification
//! - Storage reads and writes in trace order
//!
//! All functions here are pure. Fetching the snapshots and the trace is the
//! job of a [`ChainDataSource`](crate::traits::ChainDataSource).

mod storage;

pub use storage::extract_storage_operations;

use crate::{
    errors::ReconstructError,
    types::*,
};
use alloy::primitives::Sign;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Diffs two snapshot sets into per-address changes
///
/// Addresses are visited in first-seen order, scanning `before` and then
/// `after`, so identical inputs always yield identical output. A missing
/// snapshot on either side is treated as an empty account: an address only
/// present in `after` appears as created, one only present in `before` as
/// drained or destroyed.
///
/// Addresses whose balance, nonce and code are all unchanged are left out.
///
/// # Errors
/// Returns [`ReconstructError::BalanceDiffOverflow`] if a balance difference
/// does not fit in an `I256`.
pub fn build_balance_nonce_code_diff(
    before: &SnapshotMap,
    after: &SnapshotMap,
) -> Result<Vec<AddressChange>, ReconstructError> {
    let mut seen = HashSet::new();
    let mut changes = Vec::new();

    for address in before.addresses().chain(after.addresses()) {
        if !seen.insert(*address) {
            continue;
        }
        let empty = AccountSnapshot::empty(*address);
        let old = before.get(address).unwrap_or(&empty);
        let new = after.get(address).unwrap_or(&empty);
        if let Some(change) = diff_account(old, new)? {
            changes.push(change);
        }
    }

    debug!(
        addresses = seen.len(),
        changed = changes.len(),
        "built balance/nonce/code diff"
    );
    Ok(changes)
}

fn diff_account(
    old: &AccountSnapshot,
    new: &AccountSnapshot,
) -> Result<Option<AddressChange>, ReconstructError> {
    let address = new.address;
    let mut anomalies = Vec::new();

    let balance = if old.balance != new.balance {
        Some(BalanceChange {
            before: old.balance,
            after: new.balance,
            diff: signed_diff(old.balance, new.balance)
                .ok_or(ReconstructError::BalanceDiffOverflow { address })?,
        })
    } else {
        None
    };

    let nonce = (old.nonce != new.nonce).then(|| NonceChange {
        before: old.nonce,
        after: new.nonce,
        diff: i128::from(new.nonce) - i128::from(old.nonce),
    });
    if let Some(change) = nonce.as_ref().filter(|change| !change.is_consistent()) {
        warn!(%address, before = change.before, after = change.after, "nonce decreased");
        anomalies.push(DiffAnomaly::InconsistentNonceChange {
            before: change.before,
            after: change.after,
        });
    }

    let code = (old.code != new.code).then(|| CodeChange::new(old.code.clone(), new.code.clone()));
    if code.as_ref().is_some_and(CodeChange::is_anomalous) {
        warn!(%address, "code modified in place");
        anomalies.push(DiffAnomaly::UnclassifiableCodeChange);
    }

    let change = AddressChange {
        address,
        balance,
        nonce,
        code,
        anomalies,
    };
    Ok(change.has_changes().then_some(change))
}

/// `after - before` as a signed integer, `None` if it does not fit
fn signed_diff(before: U256, after: U256) -> Option<I256> {
    if after >= before {
        I256::checked_from_sign_and_abs(Sign::Positive, after - before)
    } else {
        I256::checked_from_sign_and_abs(Sign::Negative, before - after)
    }
}

/// Classifies an address from its post-transaction code
///
/// A code change recorded for the address in the same diff takes
/// precedence: deployments are `NewlyDeployed`, destructions `Destroyed`.
/// Otherwise empty code is an EOA and anything else a contract.
pub fn categorize_address(code_after: &[u8], code_change: Option<&CodeChange>) -> AddressCategory {
    match code_change.map(|change| change.kind) {
        Some(CodeChangeKind::Deployment) => AddressCategory::NewlyDeployed,
        Some(CodeChangeKind::Destruction) => AddressCategory::Destroyed,
        _ if code_after.is_empty() => AddressCategory::Eoa,
        _ => AddressCategory::Contract,
    }
}

impl StateDiff {
    /// Classifies an address against this diff's own code changes
    pub fn categorize_address(&self, address: &Address, code_after: &[u8]) -> AddressCategory {
        let code_change = self
            .change_for(address)
            .and_then(|change| change.code.as_ref());
        categorize_address(code_after, code_change)
    }
}

/// Builds the full state diff of one transaction
///
/// # Arguments
/// * `transaction_hash` - Hash of the diffed transaction
/// * `before` - Snapshots captured immediately before execution
/// * `after` - Snapshots captured immediately after execution
/// * `trace` - Opcode trace, if one was captured
///
/// # Returns
/// A [`StateDiff`] whose `storage_operations` is `Some` exactly when a
/// trace was supplied.
pub fn build_state_diff(
    transaction_hash: B256,
    before: &SnapshotMap,
    after: &SnapshotMap,
    trace: Option<&[OpcodeTraceEntry]>,
) -> Result<StateDiff, ReconstructError> {
    let changes = build_balance_nonce_code_diff(before, after)?;
    let storage_operations = trace.map(extract_storage_operations).transpose()?;
    Ok(StateDiff {
        transaction_hash,
        changes,
        storage_operations,
    })
}
