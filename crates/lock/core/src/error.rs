//! Common error infrastructure for lock-core.
//!
//! Domain-specific errors (e.g., `RulesError`, `HandleFault`) are defined in
//! their respective modules alongside the logic they validate. This module
//! provides the shared severity classification used to route them.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// Nothing in this subsystem is allowed to be fatal to the host process; the
/// `Fatal` level exists to flag states that indicate corruption outside the
/// engine and should be investigated, while the engine itself still resolves
/// to Idle/Released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - transient condition, may succeed on a later tick.
    ///
    /// Examples: target occluded, candidate out of range
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: non-positive search radius, malformed aim frame
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: a committed transition that violates the handle invariant.
    /// These indicate bugs and should be investigated.
    Internal,

    /// Fatal error - state corrupted beyond this subsystem's control.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all lock-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait LockError: std::fmt::Display + std::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for error categorization, metrics, and testing.
    fn error_code(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
