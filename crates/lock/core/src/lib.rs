//! Deterministic target lock-on logic shared across hosts and observers.
//!
//! `lock-core` defines the canonical rules of target acquisition: marker
//! discovery, candidate filtering and scoring, directed switching, and the
//! per-owner lock lifecycle. All state mutation flows through
//! [`engine::LockEngine`], and supporting crates depend on the types
//! re-exported here. The crate performs no I/O and drives no clocks, so the
//! same code runs on the authoritative host, in observers, and in offline
//! replay tools.
pub mod capture;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod marker;
pub mod rules;
pub mod score;
pub mod state;
pub mod switch;
pub mod unlock;

pub use capture::{AimFrame, Candidate, FrameError, capture};
pub use config::LockConfig;
pub use engine::{
    EngineDiagnostics, EngineError, InputEvent, LockEngine, LockSnapshot, TickOutcome, Transition,
};
pub use env::{Env, LockEnv, OracleError, VisibilityOracle};
pub use error::{ErrorSeverity, LockError};
pub use marker::{
    HandleFault, MarkerEvent, MarkerRegistry, ResolvedTarget, Socket, SocketName, TargetMarker,
};
pub use rules::{AcquisitionRules, RulesError, ScoreWeights, SearchShape, TieBreak};
pub use score::{ScoreContext, filter_and_score};
pub use state::{LockState, LockStateTag, OwnerId, SocketId, TargetHandle, TargetId, Tick};
pub use switch::{SwitchDirection, resolve_switch};
pub use unlock::{UnlockReason, UnlockReasonMask};
