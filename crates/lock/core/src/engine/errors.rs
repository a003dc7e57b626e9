//! Engine-level errors.

use crate::error::{ErrorSeverity, LockError};
use crate::rules::RulesError;

/// Errors surfaced by [`LockEngine`](super::LockEngine) configuration.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Rules may only change while no session is running.
    #[error("cannot reconfigure rules while a lock session is active")]
    SessionActive,

    /// The supplied rules failed validation.
    #[error(transparent)]
    Rules(#[from] RulesError),
}

impl LockError for EngineError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SessionActive => "ENGINE_SESSION_ACTIVE",
            Self::Rules(rules) => rules.error_code(),
        }
    }
}
