//! Targetable markers and their registry.
//!
//! Any entity that may be locked onto registers a [`TargetMarker`]: its
//! world position, the named sockets a lock can bind to, and a capability
//! flag for whether it currently accepts being targeted. The
//! [`MarkerRegistry`] hands out generational [`TargetId`]s, so a handle held
//! across a despawn fails resolution instead of pointing at a reused slot.

use arrayvec::{ArrayString, ArrayVec};
use glam::Vec3;

use crate::config::LockConfig;
use crate::error::{ErrorSeverity, LockError};
use crate::state::{SocketId, TargetHandle, TargetId};

pub type SocketName = ArrayString<{ LockConfig::MAX_SOCKET_NAME }>;

/// Named attachment point on a target, offset from the marker's position.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Socket {
    pub name: SocketName,
    pub offset: Vec3,
}

impl Socket {
    /// Socket with the given name and local offset. Names longer than the
    /// capacity are truncated at a character boundary.
    pub fn new(name: &str, offset: Vec3) -> Self {
        let mut stored = SocketName::new();
        for ch in name.chars() {
            if stored.try_push(ch).is_err() {
                break;
            }
        }
        Self {
            name: stored,
            offset,
        }
    }

    /// Default attachment point at the marker position.
    pub fn root() -> Self {
        Self::new("root", Vec3::ZERO)
    }
}

/// Registry entry for one targetable entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetMarker {
    pub position: Vec3,
    pub sockets: ArrayVec<Socket, { LockConfig::MAX_SOCKETS }>,
    /// Whether the entity currently accepts being targeted. Queried at
    /// filter time and on every validation tick.
    pub can_be_targeted: bool,
    /// Scales the session's search radius for this marker, letting large
    /// targets be captured from further away.
    pub capture_radius_scale: f32,
    /// Targets closer than this are skipped during capture.
    pub min_distance: f32,
}

impl TargetMarker {
    /// Marker at `position` with a single root socket.
    pub fn new(position: Vec3) -> Self {
        let mut sockets = ArrayVec::new();
        sockets.push(Socket::root());
        Self {
            position,
            sockets,
            can_be_targeted: true,
            capture_radius_scale: 1.0,
            min_distance: 0.0,
        }
    }

    /// Replaces the socket table. An empty iterator leaves the root socket.
    pub fn with_sockets<I>(mut self, sockets: I) -> Self
    where
        I: IntoIterator<Item = Socket>,
    {
        let replacement: ArrayVec<Socket, { LockConfig::MAX_SOCKETS }> =
            sockets.into_iter().take(LockConfig::MAX_SOCKETS).collect();
        if !replacement.is_empty() {
            self.sockets = replacement;
        }
        self
    }

    pub fn with_capture_radius_scale(mut self, scale: f32) -> Self {
        self.capture_radius_scale = scale;
        self
    }

    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance;
        self
    }

    /// World position of a declared socket.
    pub fn socket_world(&self, socket: SocketId) -> Option<Vec3> {
        self.sockets
            .get(socket.0 as usize)
            .map(|s| self.position + s.offset)
    }
}

/// Marker lifecycle notification, drained by the runtime and forwarded to
/// engines and observer bridges for prompt handle invalidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerEvent {
    Spawned(TargetId),
    CapabilityRevoked(TargetId),
    Despawned(TargetId),
}

impl MarkerEvent {
    pub fn target(&self) -> TargetId {
        match self {
            Self::Spawned(id) | Self::CapabilityRevoked(id) | Self::Despawned(id) => *id,
        }
    }
}

/// Why a handle failed to resolve.
///
/// `Gone` covers dead slots, stale generations, and missing sockets;
/// `Declined` means the marker is alive but currently refuses targeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandleFault {
    #[error("target no longer exists")]
    Gone,
    #[error("target currently declines being targeted")]
    Declined,
}

impl LockError for HandleFault {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Gone => "HANDLE_GONE",
            Self::Declined => "HANDLE_DECLINED",
        }
    }
}

/// Successful handle resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedTarget<'a> {
    pub marker: &'a TargetMarker,
    /// World position of the bound socket.
    pub socket_position: Vec3,
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    marker: Option<TargetMarker>,
}

/// Generational storage for every targetable entity in the world.
///
/// Slots are reused only after bumping their generation, which is what makes
/// [`TargetHandle`]s weak references. Iteration order is slot order, so
/// repeated scans over an unchanged registry are deterministic.
#[derive(Clone, Debug, Default)]
pub struct MarkerRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    events: Vec<MarkerEvent>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a marker and returns its id.
    pub fn spawn(&mut self, marker: TargetMarker) -> TargetId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.marker = Some(marker);
        let id = TargetId::new(index, slot.generation);
        self.events.push(MarkerEvent::Spawned(id));
        id
    }

    /// Removes a marker. Returns false when the id was already stale.
    pub fn despawn(&mut self, id: TargetId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.marker = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.events.push(MarkerEvent::Despawned(id));
        true
    }

    /// Flips the capability flag. Revocations are surfaced as events so
    /// holders invalidate promptly instead of waiting for validation.
    pub fn set_targetable(&mut self, id: TargetId, can_be_targeted: bool) -> bool {
        let Some(marker) = self.slot_mut(id).and_then(|s| s.marker.as_mut()) else {
            return false;
        };
        let revoked = marker.can_be_targeted && !can_be_targeted;
        marker.can_be_targeted = can_be_targeted;
        if revoked {
            self.events.push(MarkerEvent::CapabilityRevoked(id));
        }
        true
    }

    /// Moves a marker. Position updates are routine and emit no event.
    pub fn set_position(&mut self, id: TargetId, position: Vec3) -> bool {
        match self.slot_mut(id).and_then(|s| s.marker.as_mut()) {
            Some(marker) => {
                marker.position = position;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: TargetId) -> Option<&TargetMarker> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.marker.as_ref())
    }

    /// Resolves a handle against the live set.
    ///
    /// # Errors
    ///
    /// [`HandleFault::Gone`] for dead ids, stale generations, and vanished
    /// sockets; [`HandleFault::Declined`] when the marker refuses targeting.
    pub fn resolve(&self, handle: TargetHandle) -> Result<ResolvedTarget<'_>, HandleFault> {
        let marker = self.get(handle.target).ok_or(HandleFault::Gone)?;
        let socket_position = marker.socket_world(handle.socket).ok_or(HandleFault::Gone)?;
        if !marker.can_be_targeted {
            return Err(HandleFault::Declined);
        }
        Ok(ResolvedTarget {
            marker,
            socket_position,
        })
    }

    /// Iterates live markers in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &TargetMarker)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.marker
                .as_ref()
                .map(|marker| (TargetId::new(index as u32, slot.generation), marker))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.marker.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the buffered lifecycle events.
    pub fn drain_events(&mut self) -> Vec<MarkerEvent> {
        std::mem::take(&mut self.events)
    }

    fn slot_mut(&mut self, id: TargetId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_id_fails_after_slot_reuse() {
        let mut registry = MarkerRegistry::new();
        let first = registry.spawn(TargetMarker::new(Vec3::ZERO));
        assert!(registry.despawn(first));

        let second = registry.spawn(TargetMarker::new(Vec3::ONE));
        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);

        assert!(registry.get(first).is_none());
        assert!(registry.get(second).is_some());
        assert_eq!(
            registry.resolve(TargetHandle::new(first, SocketId::ROOT)),
            Err(HandleFault::Gone)
        );
    }

    #[test]
    fn revoked_capability_resolves_as_declined() {
        let mut registry = MarkerRegistry::new();
        let id = registry.spawn(TargetMarker::new(Vec3::ZERO));
        registry.set_targetable(id, false);

        assert_eq!(
            registry.resolve(TargetHandle::new(id, SocketId::ROOT)),
            Err(HandleFault::Declined)
        );
    }

    #[test]
    fn missing_socket_resolves_as_gone() {
        let mut registry = MarkerRegistry::new();
        let id = registry.spawn(TargetMarker::new(Vec3::ZERO));

        assert_eq!(
            registry.resolve(TargetHandle::new(id, SocketId(5))),
            Err(HandleFault::Gone)
        );
    }

    #[test]
    fn lifecycle_events_are_buffered_in_order() {
        let mut registry = MarkerRegistry::new();
        let id = registry.spawn(TargetMarker::new(Vec3::ZERO));
        registry.set_targetable(id, false);
        registry.despawn(id);

        assert_eq!(
            registry.drain_events(),
            vec![
                MarkerEvent::Spawned(id),
                MarkerEvent::CapabilityRevoked(id),
                MarkerEvent::Despawned(id),
            ]
        );
        assert!(registry.drain_events().is_empty());
    }

    #[test]
    fn socket_world_offsets_from_position() {
        let marker = TargetMarker::new(Vec3::new(10.0, 0.0, 0.0)).with_sockets([
            Socket::new("head", Vec3::new(0.0, 1.8, 0.0)),
            Socket::new("torso", Vec3::new(0.0, 1.0, 0.0)),
        ]);

        assert_eq!(
            marker.socket_world(SocketId(0)),
            Some(Vec3::new(10.0, 1.8, 0.0))
        );
        assert_eq!(marker.socket_world(SocketId(2)), None);
    }
}
