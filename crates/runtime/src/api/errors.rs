//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, configuration, and input
//! providers so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use lock_core::{OwnerId, RulesError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("owner {owner} is not registered with the runtime")]
    OwnerUnknown { owner: OwnerId },

    #[error("owner {owner} is already registered with the runtime")]
    OwnerAlreadyRegistered { owner: OwnerId },

    #[error("no input provider set for owner {owner}")]
    ProviderNotSet { owner: OwnerId },

    #[error("input provider failed for owner {owner}: {detail}")]
    ProviderFailed { owner: OwnerId, detail: String },

    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Wire(#[from] crate::replication::WireError),
}
