//! Simulation worker that owns the authoritative lock engines.
//!
//! Receives commands from [`RuntimeHandle`](crate::api::RuntimeHandle),
//! advances every registered engine once per step, and publishes committed
//! transitions and their sequenced wire updates to the EventBus.

use std::collections::BTreeMap;

use glam::Vec3;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use lock_core::{
    AcquisitionRules, AimFrame, InputEvent, LockEngine, LockSnapshot, MarkerRegistry, OwnerId,
    TargetId, TargetMarker, Tick, Transition,
};

use crate::api::{Result, RuntimeError};
use crate::events::{DiagnosticEvent, Event, EventBus, LockEvent, ReplicationEvent};
use crate::oracle::OracleManager;
use crate::replication::AuthorityBridge;

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Advance the simulation by one tick. Returns the new clock value.
    Step { reply: oneshot::Sender<Result<Tick>> },
    /// Queue an input event for an owner's next tick.
    InjectInput {
        owner: OwnerId,
        input: InputEvent,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Update an owner's aim basis.
    SetFrame {
        owner: OwnerId,
        frame: AimFrame,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Create a lock engine for a new owner.
    RegisterOwner {
        owner: OwnerId,
        rules: AcquisitionRules,
        frame: AimFrame,
        reply: oneshot::Sender<Result<()>>,
    },
    /// World mutation: add a targetable marker.
    SpawnMarker {
        marker: TargetMarker,
        reply: oneshot::Sender<TargetId>,
    },
    /// World mutation: remove a marker.
    DespawnMarker {
        id: TargetId,
        reply: oneshot::Sender<bool>,
    },
    /// World mutation: flip a marker's capability flag.
    SetTargetable {
        id: TargetId,
        can_be_targeted: bool,
        reply: oneshot::Sender<bool>,
    },
    /// World mutation: move a marker.
    SetMarkerPosition {
        id: TargetId,
        position: Vec3,
        reply: oneshot::Sender<bool>,
    },
    /// Query an owner's presentation snapshot (read-only).
    Snapshot {
        owner: OwnerId,
        reply: oneshot::Sender<Result<LockSnapshot>>,
    },
}

struct ActorSlot {
    engine: LockEngine,
    frame: AimFrame,
    inbox: Vec<InputEvent>,
    frame_faults_seen: u64,
}

/// Background task that processes lock commands.
///
/// Each step runs every owner's pipeline in owner order — lifecycle
/// notifications, then capture/score/transition, then publication — so one
/// actor's engine never observes another's mid-transition state.
pub struct SimulationWorker {
    clock: Tick,
    registry: MarkerRegistry,
    actors: BTreeMap<OwnerId, ActorSlot>,
    oracles: OracleManager,
    authority: AuthorityBridge,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl SimulationWorker {
    pub fn new(
        oracles: OracleManager,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            clock: Tick::ZERO,
            registry: MarkerRegistry::new(),
            actors: BTreeMap::new(),
            oracles,
            authority: AuthorityBridge::new(),
            command_rx,
            event_bus,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd);
                }
                else => break,
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Step { reply } => {
                let result = self.step();
                if reply.send(result).is_err() {
                    debug!("Step reply channel closed (caller dropped)");
                }
            }
            Command::InjectInput {
                owner,
                input,
                reply,
            } => {
                let result = match self.actors.get_mut(&owner) {
                    Some(slot) => {
                        slot.inbox.push(input);
                        Ok(())
                    }
                    None => Err(RuntimeError::OwnerUnknown { owner }),
                };
                let _ = reply.send(result);
            }
            Command::SetFrame {
                owner,
                frame,
                reply,
            } => {
                let result = match self.actors.get_mut(&owner) {
                    Some(slot) => {
                        slot.frame = frame;
                        Ok(())
                    }
                    None => Err(RuntimeError::OwnerUnknown { owner }),
                };
                let _ = reply.send(result);
            }
            Command::RegisterOwner {
                owner,
                rules,
                frame,
                reply,
            } => {
                let _ = reply.send(self.register_owner(owner, rules, frame));
            }
            Command::SpawnMarker { marker, reply } => {
                let _ = reply.send(self.registry.spawn(marker));
            }
            Command::DespawnMarker { id, reply } => {
                let _ = reply.send(self.registry.despawn(id));
            }
            Command::SetTargetable {
                id,
                can_be_targeted,
                reply,
            } => {
                let _ = reply.send(self.registry.set_targetable(id, can_be_targeted));
            }
            Command::SetMarkerPosition {
                id,
                position,
                reply,
            } => {
                let _ = reply.send(self.registry.set_position(id, position));
            }
            Command::Snapshot { owner, reply } => {
                let result = match self.actors.get(&owner) {
                    Some(slot) => Ok(slot.engine.snapshot()),
                    None => Err(RuntimeError::OwnerUnknown { owner }),
                };
                let _ = reply.send(result);
            }
        }
    }

    fn register_owner(
        &mut self,
        owner: OwnerId,
        rules: AcquisitionRules,
        frame: AimFrame,
    ) -> Result<()> {
        if self.actors.contains_key(&owner) {
            return Err(RuntimeError::OwnerAlreadyRegistered { owner });
        }
        let engine = LockEngine::new(owner, rules)?;
        self.actors.insert(
            owner,
            ActorSlot {
                engine,
                frame,
                inbox: Vec::new(),
                frame_faults_seen: 0,
            },
        );
        Ok(())
    }

    /// Advances every engine by one tick in deterministic owner order.
    fn step(&mut self) -> Result<Tick> {
        self.clock = self.clock + 1;
        let now = self.clock;

        // Lifecycle notifications invalidate handles before the engines run.
        let lifecycle = self.registry.drain_events();
        for slot in self.actors.values_mut() {
            for event in &lifecycle {
                if let Some(transition) = slot.engine.notify_marker_event(now, event) {
                    Self::publish_transition(&self.event_bus, &mut self.authority, &transition);
                }
            }
        }

        let env = self.oracles.env();
        for slot in self.actors.values_mut() {
            let inputs = std::mem::take(&mut slot.inbox);
            let outcome = slot
                .engine
                .tick(now, &slot.frame, &env, &self.registry, &inputs);
            for transition in &outcome.transitions {
                Self::publish_transition(&self.event_bus, &mut self.authority, transition);
            }

            let faults = slot.engine.diagnostics().frame_faults;
            if faults > slot.frame_faults_seen {
                slot.frame_faults_seen = faults;
                self.event_bus.publish(Event::Diagnostic(DiagnosticEvent::FrameFault {
                    owner: slot.engine.owner(),
                }));
            }
        }

        Ok(now)
    }

    fn publish_transition(
        event_bus: &EventBus,
        authority: &mut AuthorityBridge,
        transition: &Transition,
    ) {
        event_bus.publish(Event::Lock(LockEvent {
            transition: *transition,
        }));

        let update = authority.publish(transition);
        match update.encode() {
            Ok(payload) => {
                event_bus.publish(Event::Replication(ReplicationEvent::Update {
                    update,
                    payload,
                }));
            }
            Err(err) => {
                error!(owner = %transition.owner, %err, "failed to encode lock update");
            }
        }
    }
}
