//! Authoritative side of the replication bridge.
//!
//! Mutations flow through each owner's engine; this bridge stamps every
//! committed transition with a per-owner strictly-increasing sequence number
//! and turns it into the wire payload. No transition, no update — a no-op
//! switch publishes nothing because the engine commits nothing.

use std::collections::HashMap;

use lock_core::{OwnerId, Transition};

use super::wire::LockUpdate;

/// Stamps committed transitions for broadcast.
#[derive(Debug, Default)]
pub struct AuthorityBridge {
    next_seq: HashMap<OwnerId, u64>,
}

impl AuthorityBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a committed transition into its sequenced wire update.
    pub fn publish(&mut self, transition: &Transition) -> LockUpdate {
        let seq = self.next_seq.entry(transition.owner).or_insert(0);
        *seq += 1;
        LockUpdate {
            owner: transition.owner,
            seq: *seq,
            tag: transition.tag,
            handle: transition.handle,
        }
    }

    /// Last sequence number handed out for an owner.
    pub fn last_seq(&self, owner: OwnerId) -> u64 {
        self.next_seq.get(&owner).copied().unwrap_or(0)
    }
}
