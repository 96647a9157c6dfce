//! Storage operation extraction from opcode traces
//!
//! Keeps only SSTORE and SLOAD steps, in trace order. The order is the
//! contract's own order of storage accesses and is what makes reentrancy
//! and write-ordering bugs visible, so it is never changed.

use crate::{
    errors::ReconstructError,
    types::{OpcodeTraceEntry, StorageAccess, StorageOpcode, StorageOperation, B256},
};
use tracing::debug;

/// Extracts every SSTORE/SLOAD of a trace as a [`StorageOperation`]
///
/// Stack arguments follow the EVM convention: SSTORE pops the key, then the
/// new value; SLOAD pops the key. The overwritten value of an SSTORE and the
/// read value of an SLOAD come from the entry's `old_value` and `value`.
///
/// # Errors
/// Returns [`ReconstructError::MalformedTraceEntry`] for the first storage
/// step lacking its address, stack arguments or provider-supplied value. No
/// partial list is returned.
pub fn extract_storage_operations(
    trace: &[OpcodeTraceEntry],
) -> Result<Vec<StorageOperation>, ReconstructError> {
    let mut operations = Vec::new();
    for (index, entry) in trace.iter().enumerate() {
        let Some(op) = StorageOpcode::from_name(&entry.op) else {
            continue;
        };
        let missing = |field: &'static str| ReconstructError::MalformedTraceEntry {
            index,
            op: entry.op.clone(),
            field,
        };

        let address = entry.address.ok_or_else(|| missing("address"))?;
        let key = entry.stack_item(0).ok_or_else(|| missing("key"))?;
        let access = match op {
            StorageOpcode::Sstore => StorageAccess::Store {
                old_value: entry.old_value.ok_or_else(|| missing("old value"))?,
                new_value: entry
                    .stack_item(1)
                    .map(|value| B256::from(value.to_be_bytes::<32>()))
                    .ok_or_else(|| missing("new value"))?,
            },
            StorageOpcode::Sload => StorageAccess::Load {
                value: entry.value.ok_or_else(|| missing("value"))?,
            },
        };

        operations.push(StorageOperation {
            address,
            key: B256::from(key.to_be_bytes::<32>()),
            access,
            program_counter: entry.pc,
            call_depth: entry.depth,
            gas_remaining: entry.gas,
            gas_cost: entry.gas_cost,
        });
    }
    debug!(
        steps = trace.len(),
        operations = operations.len(),
        "extracted storage operations"
    );
    Ok(operations)
}
