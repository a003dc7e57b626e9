//! Authority/replication bridge.
//!
//! The authoritative host stamps committed transitions with per-owner
//! sequence numbers and broadcasts them; observers apply validated,
//! sequenced updates read-only. The split is explicit — one role originates
//! and publishes, the other only applies — which keeps the consistency
//! protocol testable outside any particular networking stack.

mod authority;
mod observer;
mod wire;

pub use authority::AuthorityBridge;
pub use observer::{ApplyOutcome, ObservedLock, ObserverBridge, ObserverConfig};
pub use wire::{LockUpdate, WireError};
