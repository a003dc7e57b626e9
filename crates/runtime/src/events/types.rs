//! Typed event payloads routed through the bus.

use serde::{Deserialize, Serialize};

use lock_core::{OwnerId, Transition};

use crate::replication::LockUpdate;

/// A committed lock transition, published for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockEvent {
    pub transition: Transition,
}

/// Replication traffic leaving the authoritative host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplicationEvent {
    /// A sequenced update together with its encoded wire payload.
    Update {
        update: LockUpdate,
        payload: Vec<u8>,
    },
}

/// Recoverable conditions surfaced for observability, never for gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    /// An owner's capture was skipped because its aim frame was malformed.
    FrameFault { owner: OwnerId },
}
