//! Traits describing read-only world access.
//!
//! The engine never owns spatial data. Line-of-sight queries flow through
//! [`VisibilityOracle`], and the [`Env`] aggregate bundles the available
//! oracles so the engine can access everything it needs without hard coupling
//! to a concrete world representation. A missing oracle degrades the engine
//! to "no candidates" behavior rather than failing.

use glam::Vec3;

use crate::error::{ErrorSeverity, LockError};

/// Synchronous spatial visibility query against the world's collision
/// representation.
///
/// Implementations must complete within the tick budget; the capture query
/// only invokes this on the broad-phase-capped candidate set.
pub trait VisibilityOracle {
    /// Returns true when an unobstructed line exists between the two points.
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;
}

/// Aggregates read-only oracles required by the capture query and the
/// engine's per-tick validation.
#[derive(Clone, Copy, Debug)]
pub struct Env<'a, V>
where
    V: VisibilityOracle + ?Sized,
{
    visibility: Option<&'a V>,
}

pub type LockEnv<'a> = Env<'a, dyn VisibilityOracle + 'a>;

impl<'a, V> Env<'a, V>
where
    V: VisibilityOracle + ?Sized,
{
    pub fn new(visibility: Option<&'a V>) -> Self {
        Self { visibility }
    }

    pub fn with_visibility(visibility: &'a V) -> Self {
        Self::new(Some(visibility))
    }

    /// Environment with no collaborators; capture degrades to "no candidates"
    /// when occlusion is required and "unoccluded" otherwise.
    pub fn empty() -> Self {
        Self { visibility: None }
    }

    /// Returns the VisibilityOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::VisibilityNotAvailable` if no visibility oracle
    /// was provided.
    pub fn visibility(&self) -> Result<&'a V, OracleError> {
        self.visibility.ok_or(OracleError::VisibilityNotAvailable)
    }
}

impl<'a, V> Default for Env<'a, V>
where
    V: VisibilityOracle + ?Sized,
{
    fn default() -> Self {
        Self::empty()
    }
}

/// Raised when a required collaborator is absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("visibility oracle not available")]
    VisibilityNotAvailable,
}

impl LockError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        // Absent collaborators degrade gracefully; nothing here is fatal.
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::VisibilityNotAvailable => "ORACLE_VISIBILITY_NOT_AVAILABLE",
        }
    }
}
