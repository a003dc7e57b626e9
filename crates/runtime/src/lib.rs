//! Runtime orchestration for the deterministic lock simulation.
//!
//! This crate wires together the input provider abstraction, oracle access,
//! the replication bridge, and the simulation worker into a cohesive runtime
//! API. Consumers embed [`Runtime`] to drive ticks, subscribe to events, and
//! mutate the targetable world through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides a topic-based event bus for flexible event routing
//! - [`replication`] implements the authority/observer consistency protocol
//! - [`oracle`] provides world-query adapters reused by other crates
//! - [`presets`] loads named acquisition-rule configurations
pub mod api;
pub mod events;
pub mod oracle;
pub mod presets;
pub mod replication;
pub mod runtime;

mod workers;

pub use api::{
    InputProvider, NullInputProvider, QueueInputProvider, Result, RuntimeError, RuntimeHandle,
};
pub use events::{DiagnosticEvent, Event, EventBus, LockEvent, ReplicationEvent, Topic};
pub use oracle::{Blocker, OracleManager, StaticVisibilityOracle};
pub use presets::{PresetError, load_presets};
pub use replication::{
    ApplyOutcome, AuthorityBridge, LockUpdate, ObservedLock, ObserverBridge, ObserverConfig,
    WireError,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
