//! High-level runtime orchestrator.
//!
//! The runtime owns the simulation worker, wires up command/event channels,
//! and exposes a builder-based API for hosts to drive the lock simulation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use lock_core::{AcquisitionRules, AimFrame, OwnerId, Tick, VisibilityOracle};

use crate::api::{InputProvider, Result, RuntimeError, RuntimeHandle};
use crate::events::{Event, EventBus, Topic};
use crate::oracle::OracleManager;
use crate::workers::{Command, SimulationWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

/// Main runtime that orchestrates the lock simulation.
///
/// Design: Runtime owns the worker and coordinates input providers.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    providers: HashMap<OwnerId, Box<dyn InputProvider>>,
    sim_worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Subscribe to a topic on the event bus
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Set the input provider for an owner
    pub fn set_provider(&mut self, owner: OwnerId, provider: impl InputProvider + 'static) {
        self.providers.insert(owner, Box::new(provider));
    }

    /// Execute a single simulation step.
    ///
    /// Polls each owner's input provider, queues the drained events, and
    /// advances every engine by one tick. Owners without a provider tick
    /// with no input.
    pub async fn step(&mut self) -> Result<Tick> {
        for (owner, provider) in &self.providers {
            let inputs = provider.poll_inputs(*owner).await?;
            for input in inputs {
                self.handle.inject_input(*owner, input).await?;
            }
        }
        self.handle.step().await
    }

    /// Run the simulation loop continuously
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Shutdown the runtime gracefully
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        drop(self.providers);

        self.sim_worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    oracles: OracleManager,
    owners: Vec<(OwnerId, AcquisitionRules, AimFrame)>,
    providers: HashMap<OwnerId, Box<dyn InputProvider>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            oracles: OracleManager::new(),
            owners: Vec::new(),
            providers: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_visibility(mut self, oracle: Arc<dyn VisibilityOracle + Send + Sync>) -> Self {
        self.oracles.set_visibility(oracle);
        self
    }

    /// Registers an owner at startup. More can join later through
    /// [`RuntimeHandle::register_owner`].
    pub fn with_owner(mut self, owner: OwnerId, rules: AcquisitionRules, frame: AimFrame) -> Self {
        self.owners.push((owner, rules, frame));
        self
    }

    pub fn with_provider(
        mut self,
        owner: OwnerId,
        provider: impl InputProvider + 'static,
    ) -> Self {
        self.providers.insert(owner, Box::new(provider));
        self
    }

    /// Spawns the simulation worker and registers the configured owners.
    ///
    /// # Errors
    ///
    /// Malformed acquisition rules are rejected here, before the runtime
    /// starts; the first offending owner aborts the build.
    pub async fn build(self) -> Result<Runtime> {
        // Validate rules up front for an early, actionable error.
        for (_, rules, _) in &self.owners {
            rules.validate()?;
        }

        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);

        let worker = SimulationWorker::new(self.oracles, command_rx, event_bus.clone());
        let sim_worker_handle = tokio::spawn(worker.run());

        let handle = RuntimeHandle::new(command_tx, event_bus);
        for (owner, rules, frame) in self.owners {
            handle.register_owner(owner, rules, frame).await?;
        }

        Ok(Runtime {
            handle,
            providers: self.providers,
            sim_worker_handle,
        })
    }
}
