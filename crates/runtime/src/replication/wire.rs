//! Wire format of the replication update.
//!
//! [`LockUpdate`] is the only payload this subsystem puts on the network.
//! Field order — owner, sequence, state tag, handle — and the per-owner
//! strictly-increasing sequence number are the compatibility-sensitive
//! contract; bincode serializes struct fields in declaration order, so
//! reordering fields here is a wire break.

use lock_core::{LockStateTag, OwnerId, TargetHandle};
use serde::{Deserialize, Serialize};

/// Compact authoritative snapshot broadcast after every committed transition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockUpdate {
    pub owner: OwnerId,
    /// Strictly increasing per owner, starting at 1.
    pub seq: u64,
    pub tag: LockStateTag,
    pub handle: Option<TargetHandle>,
}

/// Encoding or decoding failure at the wire boundary.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode lock update")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode lock update")]
    Decode(#[source] bincode::Error),
}

impl LockUpdate {
    /// Serializes the update for transport.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        bincode::serialize(self).map_err(WireError::Encode)
    }

    /// Deserializes an update received from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        bincode::deserialize(bytes).map_err(WireError::Decode)
    }
}
