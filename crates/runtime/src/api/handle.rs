//! Cloneable façade over the simulation worker.

use glam::Vec3;
use tokio::sync::{broadcast, mpsc, oneshot};

use lock_core::{
    AcquisitionRules, AimFrame, InputEvent, LockSnapshot, OwnerId, TargetId, TargetMarker, Tick,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Handle for interacting with a running simulation worker.
///
/// Cheap to clone; every clone talks to the same worker through the command
/// channel. Dropping all handles shuts the worker down.
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Advances the simulation by one tick.
    pub async fn step(&self) -> Result<Tick> {
        self.request(|reply| Command::Step { reply }).await?
    }

    /// Queues an input event for `owner`'s next tick.
    pub async fn inject_input(&self, owner: OwnerId, input: InputEvent) -> Result<()> {
        self.request(|reply| Command::InjectInput {
            owner,
            input,
            reply,
        })
        .await?
    }

    /// Updates `owner`'s aim basis for subsequent ticks.
    pub async fn set_frame(&self, owner: OwnerId, frame: AimFrame) -> Result<()> {
        self.request(|reply| Command::SetFrame {
            owner,
            frame,
            reply,
        })
        .await?
    }

    /// Registers a lock engine for a new owner.
    ///
    /// # Errors
    ///
    /// Malformed rules are rejected here, before any engine exists, and the
    /// owner stays unregistered.
    pub async fn register_owner(
        &self,
        owner: OwnerId,
        rules: AcquisitionRules,
        frame: AimFrame,
    ) -> Result<()> {
        self.request(|reply| Command::RegisterOwner {
            owner,
            rules,
            frame,
            reply,
        })
        .await?
    }

    /// Adds a targetable marker to the authoritative world.
    pub async fn spawn_marker(&self, marker: TargetMarker) -> Result<TargetId> {
        self.request(|reply| Command::SpawnMarker { marker, reply })
            .await
    }

    /// Removes a marker. Returns false when the id was already stale.
    pub async fn despawn_marker(&self, id: TargetId) -> Result<bool> {
        self.request(|reply| Command::DespawnMarker { id, reply })
            .await
    }

    /// Flips a marker's capability flag.
    pub async fn set_targetable(&self, id: TargetId, can_be_targeted: bool) -> Result<bool> {
        self.request(|reply| Command::SetTargetable {
            id,
            can_be_targeted,
            reply,
        })
        .await
    }

    /// Moves a marker.
    pub async fn set_marker_position(&self, id: TargetId, position: Vec3) -> Result<bool> {
        self.request(|reply| Command::SetMarkerPosition {
            id,
            position,
            reply,
        })
        .await
    }

    /// Presentation snapshot of an owner's lock and last candidate list.
    pub async fn snapshot(&self, owner: OwnerId) -> Result<LockSnapshot> {
        self.request(|reply| Command::Snapshot { owner, reply })
            .await?
    }

    /// Subscribe to a topic on the event bus.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;
        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}
