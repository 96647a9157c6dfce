//! Conversion of raw `debug_traceTransaction` output into crate types
//!
//! Two tracer outputs are consumed here:
//! - the prestate tracer in diff mode, overlaid into full before/after snapshots
//! - struct logs of the default tracer, enriched with the storage context and
//!   slot values that storage extraction needs

use std::collections::{BTreeMap, HashMap, HashSet};

use alloy::rpc::types::trace::geth::{AccountState, DiffMode, StructLog};
use tracing::trace;

use crate::types::{AccountSnapshot, Address, OpcodeTraceEntry, SnapshotPair, B256, U256};

/// Builds full snapshots from a prestate diff.
///
/// `post` only carries fields that changed; missing fields keep their `pre`
/// value. Accounts present in `pre` but absent from `post` were deleted during
/// the transaction and get an empty after-snapshot.
pub fn snapshots_from_prestate_diff(diff: DiffMode) -> SnapshotPair {
    let DiffMode { pre, post } = diff;
    let mut pair = SnapshotPair::default();

    for (address, state) in &pre {
        pair.before.insert(overlay(*address, state, None));
    }
    for (address, state) in &post {
        pair.after.insert(overlay(*address, state, pre.get(address)));
    }
    for address in pre.keys().filter(|address| !post.contains_key(*address)) {
        trace!(%address, "account deleted by transaction");
        pair.after.insert(AccountSnapshot::empty(*address));
    }

    pair
}

fn overlay(address: Address, state: &AccountState, base: Option<&AccountState>) -> AccountSnapshot {
    let balance = state.balance.or_else(|| base.and_then(|b| b.balance));
    let nonce = state.nonce.or_else(|| base.and_then(|b| b.nonce));
    let code = state
        .code
        .clone()
        .or_else(|| base.and_then(|b| b.code.clone()));

    AccountSnapshot::new(
        address,
        balance.unwrap_or_default(),
        nonce.unwrap_or_default(),
        code.unwrap_or_default(),
    )
}

/// Storage owner of a call frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StorageContext {
    Account(Address),
    /// Contract under construction, address known only once the frame returns
    Creating(usize),
}

type SlotKey = (StorageContext, B256);

#[derive(Debug)]
struct Frame {
    context: StorageContext,
    /// Serial of the creation this frame performs, if opened by CREATE/CREATE2
    creation: Option<usize>,
    /// Slot values overwritten in this frame, restored if it reverts
    journal: Vec<(SlotKey, Option<B256>)>,
}

impl Frame {
    fn new(context: StorageContext) -> Self {
        Self {
            context,
            creation: None,
            journal: Vec::new(),
        }
    }
}

/// Storage owner of the outermost frame of a traced transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRoot {
    /// Message call into an existing account
    Call(Address),
    /// Contract creation transaction, with the address it deployed to
    Create(Address),
}

impl TraceRoot {
    pub fn address(self) -> Address {
        match self {
            Self::Call(address) | Self::Create(address) => address,
        }
    }
}

/// Converts struct logs into opcode trace entries.
///
/// `prestate` holds pre-transaction storage of touched accounts and supplies
/// the previous value of slots written before they were read. Contracts
/// deployed by the transaction, the root of a [`TraceRoot::Create`] included,
/// are absent from it and start with zeroed storage.
///
/// Steps executing inside a constructor whose creation failed keep `address`
/// unset.
pub fn entries_from_struct_logs(
    logs: &[StructLog],
    root: TraceRoot,
    prestate: &BTreeMap<Address, AccountState>,
) -> Vec<OpcodeTraceEntry> {
    StructLogConverter::new(root, prestate).convert(logs)
}

struct StructLogConverter<'a> {
    prestate: &'a BTreeMap<Address, AccountState>,
    frames: Vec<Frame>,
    slots: HashMap<SlotKey, B256>,
    /// Entry indices waiting for the address of a creation
    unresolved: HashMap<usize, Vec<usize>>,
    creations: usize,
    /// Accounts deployed during the transaction
    created: HashSet<Address>,
    entries: Vec<OpcodeTraceEntry>,
}

impl<'a> StructLogConverter<'a> {
    fn new(root: TraceRoot, prestate: &'a BTreeMap<Address, AccountState>) -> Self {
        let mut created = HashSet::new();
        if let TraceRoot::Create(address) = root {
            created.insert(address);
        }
        Self {
            prestate,
            frames: vec![Frame::new(StorageContext::Account(root.address()))],
            slots: HashMap::new(),
            unresolved: HashMap::new(),
            creations: 0,
            created,
            entries: Vec::new(),
        }
    }

    fn convert(mut self, logs: &[StructLog]) -> Vec<OpcodeTraceEntry> {
        for (index, log) in logs.iter().enumerate() {
            let depth = log.depth.max(1) as usize;
            while self.frames.len() > depth {
                // only the innermost returning frame leaves its result on this step's stack
                let result = if self.frames.len() == depth + 1 {
                    stack_top(log)
                } else {
                    None
                };
                self.pop_frame(result);
            }

            let context = self.current_context();
            let mut entry = OpcodeTraceEntry::new(
                log.op.to_string(),
                log.pc,
                log.depth,
                log.gas,
                log.gas_cost,
            );
            entry.stack = log.stack.clone();
            match context {
                StorageContext::Account(address) => entry.address = Some(address),
                StorageContext::Creating(serial) => self
                    .unresolved
                    .entry(serial)
                    .or_default()
                    .push(self.entries.len()),
            }

            match &*log.op {
                "SLOAD" => self.record_load(&mut entry, log, logs.get(index + 1)),
                "SSTORE" => self.record_store(&mut entry),
                _ => {}
            }

            let enters_frame = logs
                .get(index + 1)
                .is_some_and(|next| next.depth == log.depth + 1);
            if enters_frame {
                self.push_frame(&entry, context);
            }

            self.entries.push(entry);
        }

        self.entries
    }

    fn current_context(&self) -> StorageContext {
        // the root frame is never popped
        self.frames
            .last()
            .map(|frame| frame.context)
            .unwrap_or(StorageContext::Creating(usize::MAX))
    }

    fn record_load(
        &mut self,
        entry: &mut OpcodeTraceEntry,
        log: &StructLog,
        next: Option<&StructLog>,
    ) {
        let Some(key) = entry.stack_item(0).map(to_word) else {
            return;
        };
        let slot = (self.current_context(), key);

        let loaded = next
            .filter(|next| next.depth == log.depth)
            .and_then(stack_top)
            .map(to_word)
            .or_else(|| log.storage.as_ref()?.get(&key).copied())
            .or_else(|| self.slots.get(&slot).copied());

        if let Some(value) = loaded {
            self.slots.insert(slot, value);
            entry.value = Some(value);
        }
    }

    fn record_store(&mut self, entry: &mut OpcodeTraceEntry) {
        let (Some(key), Some(new_value)) = (entry.stack_item(0), entry.stack_item(1)) else {
            return;
        };
        let key = to_word(key);
        let new_value = to_word(new_value);
        let slot = (self.current_context(), key);

        let known = self.slots.get(&slot).copied();
        let old_value = known.or_else(|| self.initial_value(&slot));
        entry.old_value = old_value;
        entry.value = Some(new_value);

        if let Some(frame) = self.frames.last_mut() {
            frame.journal.push((slot, known));
        }
        self.slots.insert(slot, new_value);
    }

    /// Pre-transaction value of a slot that has not been touched yet
    fn initial_value(&self, slot: &SlotKey) -> Option<B256> {
        match slot.0 {
            StorageContext::Account(address) => self
                .prestate
                .get(&address)
                .and_then(|account| account.storage.get(&slot.1).copied())
                .or_else(|| self.created.contains(&address).then_some(B256::ZERO)),
            // storage of a contract under construction starts empty
            StorageContext::Creating(_) => Some(B256::ZERO),
        }
    }

    fn push_frame(&mut self, entry: &OpcodeTraceEntry, caller: StorageContext) {
        let frame = match entry.op.as_str() {
            "CALL" | "STATICCALL" => match entry.stack_item(1) {
                Some(target) => Frame::new(StorageContext::Account(Address::from_word(
                    to_word(target),
                ))),
                None => Frame::new(caller),
            },
            "CREATE" | "CREATE2" => {
                let serial = self.creations;
                self.creations += 1;
                Frame {
                    creation: Some(serial),
                    ..Frame::new(StorageContext::Creating(serial))
                }
            }
            // DELEGATECALL and CALLCODE run foreign code against the caller's storage
            _ => Frame::new(caller),
        };
        trace!(op = %entry.op, depth = entry.depth + 1, context = ?frame.context, "entering frame");
        self.frames.push(frame);
    }

    fn pop_frame(&mut self, result: Option<U256>) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        let succeeded = result.is_some_and(|value| !value.is_zero());

        if !succeeded {
            for (slot, previous) in frame.journal.drain(..).rev() {
                match previous {
                    Some(value) => self.slots.insert(slot, value),
                    None => self.slots.remove(&slot),
                };
            }
            trace!(context = ?frame.context, "frame reverted");
            return;
        }

        if let (Some(serial), Some(word)) = (frame.creation, result) {
            let created = Address::from_word(to_word(word));
            self.resolve_creation(serial, created, &mut frame.journal);
        }
        if let Some(parent) = self.frames.last_mut() {
            parent.journal.append(&mut frame.journal);
        }
    }

    fn resolve_creation(
        &mut self,
        serial: usize,
        created: Address,
        journal: &mut [(SlotKey, Option<B256>)],
    ) {
        let pending = StorageContext::Creating(serial);
        let resolved = StorageContext::Account(created);
        trace!(%created, serial, "resolved created contract");
        self.created.insert(created);

        for index in self.unresolved.remove(&serial).unwrap_or_default() {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.address = Some(created);
            }
        }

        let moved: Vec<_> = self
            .slots
            .keys()
            .filter(|(context, _)| *context == pending)
            .copied()
            .collect();
        for slot in moved {
            if let Some(value) = self.slots.remove(&slot) {
                self.slots.insert((resolved, slot.1), value);
            }
        }

        for ((context, _), _) in journal.iter_mut() {
            if *context == pending {
                *context = resolved;
            }
        }
    }
}

fn stack_top(log: &StructLog) -> Option<U256> {
    log.stack.as_ref()?.last().copied()
}

fn to_word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}
