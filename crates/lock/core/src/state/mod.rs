//! Lock state representation.
//!
//! This module owns the per-actor lock bookkeeping. Runtime layers clone or
//! query this state but mutate it exclusively through the engine (on the
//! authoritative side) or through the observer bridge applying sequenced
//! snapshots (everywhere else).
mod common;

pub use common::{OwnerId, SocketId, TargetId, Tick};

/// Reference to a lockable target: a live marker plus one of its sockets.
///
/// A handle is valid only while the registry still resolves the id and the
/// marker still declares the socket. Holders detect invalidity by lookup
/// failure, never by dereferencing freed state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetHandle {
    pub target: TargetId,
    pub socket: SocketId,
}

impl TargetHandle {
    pub const fn new(target: TargetId, socket: SocketId) -> Self {
        Self { target, socket }
    }
}

impl std::fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target, self.socket)
    }
}

/// Lifecycle tag of a lock session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LockStateTag {
    #[default]
    Idle,
    Acquiring,
    Locked,
    Switching,
    Released,
}

impl LockStateTag {
    /// True for states that may carry a target handle.
    pub const fn allows_handle(self) -> bool {
        matches!(self, Self::Acquiring | Self::Locked | Self::Switching)
    }

    /// True for states that resolve without waiting for further input.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Acquiring | Self::Switching | Self::Released)
    }
}

/// Authoritative lock record for one controlled actor.
///
/// Exactly one `LockState` exists per owner. The handle is non-none only
/// while the tag allows it; [`LockState::invariant_holds`] checks this and is
/// asserted by the engine after every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockState {
    pub tag: LockStateTag,
    pub handle: Option<TargetHandle>,
    /// Tick of the last successful acquisition, cleared on release.
    pub acquired_at: Option<Tick>,
    pub owner: OwnerId,
}

impl LockState {
    /// Fresh idle state for the given owner.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            tag: LockStateTag::Idle,
            handle: None,
            acquired_at: None,
            owner,
        }
    }

    /// Core invariant: a handle exists only in handle-bearing states, and a
    /// held lock always records when it was acquired.
    pub fn invariant_holds(&self) -> bool {
        match self.handle {
            Some(_) => self.tag.allows_handle(),
            None => self.tag != LockStateTag::Locked,
        }
    }
}
