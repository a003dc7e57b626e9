//! Oracle implementations and the manager that lends them to engines.
mod visibility;

pub use visibility::{Blocker, StaticVisibilityOracle};

use std::sync::Arc;

use lock_core::{Env, LockEnv, VisibilityOracle};

/// Owns the world-query collaborators and lends them to engines per tick.
///
/// Every oracle is optional; a manager with none configured produces an
/// empty environment and the engines degrade to "no candidates" behavior.
#[derive(Clone, Default)]
pub struct OracleManager {
    visibility: Option<Arc<dyn VisibilityOracle + Send + Sync>>,
}

impl OracleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility(visibility: Arc<dyn VisibilityOracle + Send + Sync>) -> Self {
        Self {
            visibility: Some(visibility),
        }
    }

    pub fn set_visibility(&mut self, visibility: Arc<dyn VisibilityOracle + Send + Sync>) {
        self.visibility = Some(visibility);
    }

    /// Borrowing view used for one tick of engine work.
    pub fn env(&self) -> LockEnv<'_> {
        Env::new(
            self.visibility
                .as_deref()
                .map(|oracle| oracle as &dyn VisibilityOracle),
        )
    }
}
