//! Non-authoritative side of the replication bridge.
//!
//! Observers apply sequenced updates read-only and never originate lock
//! transitions. Stale or out-of-order updates are discarded by the sequence
//! check. An update whose target has not yet spawned in the local replica is
//! parked and resolved opportunistically when the marker arrives; past the
//! bounded wait it degrades to a local Released without touching
//! authoritative state.

use std::collections::HashMap;

use tracing::{debug, warn};

use lock_core::{LockStateTag, MarkerEvent, MarkerRegistry, OwnerId, TargetHandle, Tick};

use super::wire::LockUpdate;

/// Observer-side view of one owner's lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservedLock {
    pub tag: LockStateTag,
    pub handle: Option<TargetHandle>,
}

/// What happened to an inbound update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The update advanced the observed state.
    Applied,
    /// Discarded: an equal or newer sequence was already seen.
    Stale,
    /// Parked until its target spawns locally (or the wait expires).
    Parked,
}

/// Tuning for the observer bridge.
#[derive(Clone, Copy, Debug)]
pub struct ObserverConfig {
    /// Ticks a parked update may wait for its target before degrading to a
    /// local Released.
    pub pending_ttl_ticks: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            pending_ttl_ticks: 120,
        }
    }
}

#[derive(Clone, Debug)]
struct PendingUpdate {
    update: LockUpdate,
    parked_at: Tick,
}

/// Applies authoritative updates to the local replica.
#[derive(Debug, Default)]
pub struct ObserverBridge {
    config: ObserverConfig,
    applied: HashMap<OwnerId, (u64, ObservedLock)>,
    pending: HashMap<OwnerId, PendingUpdate>,
    stale_discarded: u64,
    pending_expired: u64,
}

impl ObserverBridge {
    pub fn new(config: ObserverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Feeds one inbound update through the sequence check.
    ///
    /// `registry` is the local world replica used to resolve the referenced
    /// target; `now` timestamps parked updates for expiry.
    pub fn apply(
        &mut self,
        update: LockUpdate,
        registry: &MarkerRegistry,
        now: Tick,
    ) -> ApplyOutcome {
        if update.seq <= self.last_seq(update.owner) {
            self.stale_discarded += 1;
            debug!(
                owner = %update.owner,
                seq = update.seq,
                "discarding stale replication update"
            );
            return ApplyOutcome::Stale;
        }

        match update.handle {
            Some(handle) if !Self::resolvable(registry, handle) => {
                // Latest-wins: a newer parked update supersedes an older one.
                self.pending.insert(
                    update.owner,
                    PendingUpdate {
                        update,
                        parked_at: now,
                    },
                );
                ApplyOutcome::Parked
            }
            _ => {
                self.commit(update);
                ApplyOutcome::Applied
            }
        }
    }

    /// Marker lifecycle hook: a spawn may make a parked update resolvable.
    /// Returns the owners whose parked updates were applied.
    pub fn on_marker_event(
        &mut self,
        event: &MarkerEvent,
        registry: &MarkerRegistry,
    ) -> Vec<OwnerId> {
        if !matches!(event, MarkerEvent::Spawned(_)) {
            return Vec::new();
        }
        let ready: Vec<OwnerId> = self
            .pending
            .iter()
            .filter(|(_, pending)| {
                pending
                    .update
                    .handle
                    .is_some_and(|handle| Self::resolvable(registry, handle))
            })
            .map(|(owner, _)| *owner)
            .collect();
        for owner in &ready {
            if let Some(pending) = self.pending.remove(owner) {
                self.commit(pending.update);
            }
        }
        ready
    }

    /// Expires parked updates past the bounded wait, degrading each to a
    /// local Released. Returns the expired updates for diagnostics.
    pub fn tick(&mut self, now: Tick) -> Vec<LockUpdate> {
        let ttl = self.config.pending_ttl_ticks;
        let expired_owners: Vec<OwnerId> = self
            .pending
            .iter()
            .filter(|(_, pending)| now.0.saturating_sub(pending.parked_at.0) >= ttl)
            .map(|(owner, _)| *owner)
            .collect();

        let mut expired = Vec::new();
        for owner in expired_owners {
            if let Some(pending) = self.pending.remove(&owner) {
                self.pending_expired += 1;
                warn!(
                    owner = %owner,
                    seq = pending.update.seq,
                    "replicated target never resolved locally; degrading to Released"
                );
                // Keep the sequence so newer authoritative updates still
                // apply cleanly on top.
                self.commit(LockUpdate {
                    owner,
                    seq: pending.update.seq,
                    tag: LockStateTag::Released,
                    handle: None,
                });
                expired.push(pending.update);
            }
        }
        expired
    }

    /// Observed state for an owner, if any update has applied.
    pub fn state(&self, owner: OwnerId) -> Option<ObservedLock> {
        self.applied.get(&owner).map(|(_, state)| *state)
    }

    /// Highest sequence accepted for an owner (applied or parked).
    pub fn last_seq(&self, owner: OwnerId) -> u64 {
        let applied = self.applied.get(&owner).map(|(seq, _)| *seq).unwrap_or(0);
        let parked = self
            .pending
            .get(&owner)
            .map(|pending| pending.update.seq)
            .unwrap_or(0);
        applied.max(parked)
    }

    /// Count of updates dropped by the sequence check.
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }

    /// Count of parked updates that expired unresolved.
    pub fn pending_expired(&self) -> u64 {
        self.pending_expired
    }

    fn commit(&mut self, update: LockUpdate) {
        // Never regress: an expiring parked update may carry an older
        // sequence than what has applied since.
        let applied_seq = self.applied.get(&update.owner).map(|(seq, _)| *seq);
        if applied_seq.is_some_and(|seq| update.seq <= seq) {
            return;
        }
        self.applied.insert(
            update.owner,
            (
                update.seq,
                ObservedLock {
                    tag: update.tag,
                    handle: update.handle,
                },
            ),
        );
        // A parked update at or below this sequence is obsolete.
        if self
            .pending
            .get(&update.owner)
            .is_some_and(|pending| pending.update.seq <= update.seq)
        {
            self.pending.remove(&update.owner);
        }
    }

    fn resolvable(registry: &MarkerRegistry, handle: TargetHandle) -> bool {
        // Presence is what matters for replication; the authority already
        // decided eligibility, so a locally-declined marker still resolves.
        registry
            .get(handle.target)
            .is_some_and(|marker| marker.socket_world(handle.socket).is_some())
    }
}
