//! Per-node coverage records and in-flight request aggregation.

use std::collections::HashMap;

use spanlock_crypto::EKeyPublic;
use spanlock_proto::{Data, Name, Timestamp};

/// Cached E-KEY for one hierarchy node: the validity interval and the key
/// bits received for it.
///
/// The sentinel value (`begin == end == epoch`, empty key) covers no
/// timestamp, which is what forces the first fetch for every node.
///
/// # Invariants
///
/// - Replaced only when a strictly newer covering E-KEY arrives *and* the
///   content key was wrapped under it successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Start of the validity interval (inclusive).
    pub begin: Timestamp,
    /// End of the validity interval (exclusive).
    pub end: Timestamp,
    /// SPKI DER bits of the cached E-KEY.
    pub key: EKeyPublic,
}

impl KeyInfo {
    /// The initial record that covers nothing.
    pub fn sentinel() -> Self {
        Self {
            begin: Timestamp::EPOCH,
            end: Timestamp::EPOCH,
            key: EKeyPublic::default(),
        }
    }

    /// True when `timeslot` falls inside the validity interval.
    pub fn covers(&self, timeslot: Timestamp) -> bool {
        self.begin <= timeslot && timeslot < self.end
    }
}

/// Bookkeeping for one in-flight `create_content_key` call.
///
/// Keyed by the unix milliseconds of the requested timestamp in the engine's
/// request table. Lives exactly as long as nodes are outstanding: created
/// when the coverage fan-out starts, removed the moment the count first
/// reaches zero.
#[derive(Debug)]
pub struct KeyRequest {
    outstanding: usize,
    repeat_attempts: HashMap<Name, u32>,
    encrypted_keys: Vec<Data>,
}

impl KeyRequest {
    /// Request waiting on `outstanding` hierarchy nodes.
    pub fn new(outstanding: usize) -> Self {
        Self {
            outstanding,
            repeat_attempts: HashMap::new(),
            encrypted_keys: Vec::new(),
        }
    }

    /// Nodes not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Zero the retry counter for a node about to be fetched.
    pub fn reset_attempts(&mut self, node: &Name) {
        self.repeat_attempts.insert(node.clone(), 0);
    }

    /// Record how many timeout retries a node's fetch consumed.
    pub fn record_attempts(&mut self, node: &Name, attempts: u32) {
        self.repeat_attempts.insert(node.clone(), attempts);
    }

    /// Retry counter for a node, if it fetched.
    pub fn attempts(&self, node: &Name) -> Option<u32> {
        self.repeat_attempts.get(node).copied()
    }

    /// Append one signed C-KEY data object. Does not change the outstanding
    /// count; completion is recorded separately so failed nodes drain the
    /// request the same way.
    pub fn push_encrypted_key(&mut self, data: Data) {
        self.encrypted_keys.push(data);
    }

    /// Mark one node resolved, returning how many remain.
    ///
    /// Saturates at zero; the engine removes the request at the first zero so
    /// a second resolution for the same request cannot occur.
    pub fn complete_one(&mut self) -> usize {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.outstanding
    }

    /// Consume the request, yielding the (possibly partial) key list.
    pub fn into_encrypted_keys(self) -> Vec<Data> {
        self.encrypted_keys
    }
}
