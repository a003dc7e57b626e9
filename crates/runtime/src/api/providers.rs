//! Asynchronous abstraction for sourcing lock input.
//!
//! Runtime users plug in [`InputProvider`] implementations so the simulation
//! can run with human input, scripted fixtures, or AI policies.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use lock_core::{InputEvent, OwnerId};

use super::errors::Result;

/// Trait for providing lock input events each tick.
///
/// Different implementations can handle:
/// - Player input (from UI/bindings)
/// - AI lock policies
/// - Scripted/replayed input
/// - Testing fixtures
#[async_trait]
pub trait InputProvider: Send + Sync {
    /// Drains the input events queued for `owner` since the last tick.
    ///
    /// Returning an empty vec is the common case and means "no request".
    async fn poll_inputs(&self, owner: OwnerId) -> Result<Vec<InputEvent>>;
}

/// A provider that never requests anything. Useful as a fallback for
/// AI-less actors.
pub struct NullInputProvider;

#[async_trait]
impl InputProvider for NullInputProvider {
    async fn poll_inputs(&self, _owner: OwnerId) -> Result<Vec<InputEvent>> {
        Ok(Vec::new())
    }
}

/// Queue-backed provider for embedding and tests: push events from anywhere,
/// the runtime drains them on the next step.
#[derive(Default)]
pub struct QueueInputProvider {
    queue: Mutex<VecDeque<InputEvent>>,
}

impl QueueInputProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, input: InputEvent) {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(input);
    }
}

#[async_trait]
impl InputProvider for QueueInputProvider {
    async fn poll_inputs(&self, _owner: OwnerId) -> Result<Vec<InputEvent>> {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(queue.drain(..).collect())
    }
}
