//! Lock lifecycle state machine.
//!
//! [`LockEngine`] is the authoritative reducer for one owner's [`LockState`].
//! Each tick it consumes input events, runs the capture/score pipeline when
//! needed, validates a held lock against loosened retain bounds, and commits
//! transitions. Committed transitions are returned to the caller for
//! publication; the engine itself never talks to the network.
//!
//! Transient states resolve within the tick that entered them: an acquire
//! passes through Acquiring and surfaces only its resolution, a switch passes
//! through Switching the same way. Released is the one transient state that
//! crosses a tick boundary — it emits its notification, then settles to Idle
//! on the next evaluation, which is also what arms the re-acquisition
//! cooldown against the just-released target.

mod errors;

pub use errors::EngineError;

use crate::capture::{AimFrame, Candidate, capture};
use crate::config::LockConfig;
use crate::env::LockEnv;
use crate::marker::{HandleFault, MarkerEvent, MarkerRegistry};
use crate::rules::{AcquisitionRules, RulesError};
use crate::score::{ScoreContext, filter_and_score};
use crate::state::{LockState, LockStateTag, OwnerId, TargetHandle, TargetId, Tick};
use crate::switch::{SwitchDirection, resolve_switch};
use crate::unlock::UnlockReason;

/// Discrete input consumed as a transition trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    /// Begin an acquisition session.
    Acquire,
    /// Drop the current lock.
    Release,
    /// Move the lock toward another candidate.
    Switch(SwitchDirection),
    /// Acquire the best candidate without a directional preference.
    AutoSelect,
}

/// A committed, observable state change.
///
/// One is produced per mutation that outlives the tick; the replication
/// bridge turns each into exactly one published update.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub owner: OwnerId,
    pub tag: LockStateTag,
    pub handle: Option<TargetHandle>,
    /// Populated on Released transitions.
    pub reason: Option<UnlockReason>,
}

/// Everything a tick produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    pub transitions: Vec<Transition>,
}

impl TickOutcome {
    pub fn is_quiet(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Read-only view served to the presentation layer each tick.
#[derive(Clone, Debug, PartialEq)]
pub struct LockSnapshot {
    pub owner: OwnerId,
    pub tag: LockStateTag,
    pub handle: Option<TargetHandle>,
    pub acquired_at: Option<Tick>,
    /// Eligible candidates from the most recent capture/score pass.
    pub candidates: Vec<Candidate>,
}

/// Counters for conditions that degrade gracefully instead of failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineDiagnostics {
    /// Capture attempts dropped because the aim frame was malformed.
    pub frame_faults: u64,
}

/// Per-owner lock state machine.
///
/// Owns the single [`LockState`] for its owner and is the only code allowed
/// to mutate it on the authoritative side. Not `Clone`: one engine per owner.
#[derive(Debug)]
pub struct LockEngine {
    state: LockState,
    rules: AcquisitionRules,
    config: LockConfig,
    /// Target barred from re-acquisition, and the tick the bar lifts.
    cooldown: Option<(TargetId, Tick)>,
    /// First tick the held target was seen occluded; cleared on regained LOS.
    los_lost_since: Option<Tick>,
    /// Set when an automatic release's reason is in the auto-reacquire mask.
    auto_acquire_armed: bool,
    last_capture_tick: Option<Tick>,
    last_candidates: Vec<Candidate>,
    diagnostics: EngineDiagnostics,
}

impl LockEngine {
    /// Creates an idle engine for `owner`.
    ///
    /// # Errors
    ///
    /// Returns the [`RulesError`] when the rules are malformed; no engine is
    /// created and no session can start with them.
    pub fn new(owner: OwnerId, rules: AcquisitionRules) -> Result<Self, RulesError> {
        Self::with_config(owner, rules, LockConfig::default())
    }

    pub fn with_config(
        owner: OwnerId,
        rules: AcquisitionRules,
        config: LockConfig,
    ) -> Result<Self, RulesError> {
        rules.validate()?;
        Ok(Self {
            state: LockState::new(owner),
            rules,
            config,
            cooldown: None,
            los_lost_since: None,
            auto_acquire_armed: false,
            last_capture_tick: None,
            last_candidates: Vec::new(),
            diagnostics: EngineDiagnostics::default(),
        })
    }

    pub fn owner(&self) -> OwnerId {
        self.state.owner
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn rules(&self) -> &AcquisitionRules {
        &self.rules
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        self.diagnostics
    }

    /// Replaces the session rules.
    ///
    /// # Errors
    ///
    /// Rejected with [`EngineError::SessionActive`] unless the engine is
    /// idle, and with the underlying [`RulesError`] for malformed rules; the
    /// previous rules stay in effect either way.
    pub fn configure(&mut self, rules: AcquisitionRules) -> Result<(), EngineError> {
        if self.state.tag != LockStateTag::Idle {
            return Err(EngineError::SessionActive);
        }
        rules.validate()?;
        self.rules = rules;
        Ok(())
    }

    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            owner: self.state.owner,
            tag: self.state.tag,
            handle: self.state.handle,
            acquired_at: self.state.acquired_at,
            candidates: self.last_candidates.clone(),
        }
    }

    /// Prompt invalidation path for marker lifecycle notifications.
    ///
    /// Lets a destroyed or revoked target drop the lock the moment the event
    /// arrives instead of waiting for the next validation tick. Returns the
    /// committed transition, if any.
    pub fn notify_marker_event(&mut self, now: Tick, event: &MarkerEvent) -> Option<Transition> {
        let handle = self.state.handle?;
        if handle.target != event.target() {
            return None;
        }
        match event {
            MarkerEvent::Despawned(_) => Some(self.release(now, UnlockReason::TargetInvalidated)),
            MarkerEvent::CapabilityRevoked(_) => {
                Some(self.release(now, UnlockReason::CapabilityRevoked))
            }
            MarkerEvent::Spawned(_) => None,
        }
    }

    /// Advances the state machine by one simulation tick.
    ///
    /// Order within the tick: settle Released, consume inputs, validate a
    /// held lock, then attempt any armed automatic re-acquisition. The
    /// returned transitions are in commit order.
    pub fn tick(
        &mut self,
        now: Tick,
        frame: &AimFrame,
        env: &LockEnv<'_>,
        registry: &MarkerRegistry,
        inputs: &[InputEvent],
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        // Released settles to Idle on the evaluation after it was committed.
        if self.state.tag == LockStateTag::Released {
            self.state.tag = LockStateTag::Idle;
            outcome.transitions.push(self.observable_transition(None));
        }

        for input in inputs {
            match input {
                InputEvent::Release => {
                    // Idempotent: releasing without a session is a no-op and
                    // publishes nothing.
                    if self.state.handle.is_some() {
                        let transition = self.release(now, UnlockReason::Explicit);
                        outcome.transitions.push(transition);
                    }
                }
                InputEvent::Acquire | InputEvent::AutoSelect => {
                    if self.state.tag == LockStateTag::Idle {
                        self.try_acquire(now, frame, env, registry, &mut outcome);
                    }
                }
                InputEvent::Switch(direction) => {
                    if self.state.tag == LockStateTag::Locked {
                        self.try_switch(now, *direction, frame, env, registry, &mut outcome);
                    }
                }
            }
        }

        if self.state.tag == LockStateTag::Locked {
            self.validate_lock(now, frame, env, registry, &mut outcome);
        }

        if self.auto_acquire_armed && self.state.tag == LockStateTag::Idle {
            self.auto_acquire_armed = false;
            self.try_acquire(now, frame, env, registry, &mut outcome);
        }

        // Periodic background refresh keeps the diagnostic candidate list
        // warm without rescanning the world every frame.
        if self.capture_due(now) && self.state.tag == LockStateTag::Idle {
            if let Ok(raw) = capture(frame, &self.rules, &self.config, env, registry) {
                let mut eligible =
                    filter_and_score(raw, &self.rules, registry, ScoreContext::Finding, None);
                self.prune_cooldown(now, &mut eligible);
                self.last_candidates = eligible;
                self.last_capture_tick = Some(now);
            }
        }

        debug_assert!(self.state.invariant_holds(), "lock invariant violated");
        outcome
    }

    // ------------------------------------------------------------------
    // transition helpers
    // ------------------------------------------------------------------

    fn try_acquire(
        &mut self,
        now: Tick,
        frame: &AimFrame,
        env: &LockEnv<'_>,
        registry: &MarkerRegistry,
        outcome: &mut TickOutcome,
    ) {
        let raw = match capture(frame, &self.rules, &self.config, env, registry) {
            Ok(raw) => raw,
            Err(_) => {
                self.diagnostics.frame_faults += 1;
                return;
            }
        };
        let mut eligible =
            filter_and_score(raw, &self.rules, registry, ScoreContext::Finding, None);
        self.prune_cooldown(now, &mut eligible);
        self.last_candidates = eligible.clone();
        self.last_capture_tick = Some(now);

        let Some(top) = eligible.first().copied() else {
            // Nothing eligible (or everything barred by cooldown): stay Idle.
            return;
        };

        self.state.tag = LockStateTag::Acquiring;
        // The eligible list may race against world mutation between scoring
        // and the decision; re-resolve before committing the lock.
        match registry.resolve(top.handle) {
            Ok(_) => {
                self.state.tag = LockStateTag::Locked;
                self.state.handle = Some(top.handle);
                self.state.acquired_at = Some(now);
                self.los_lost_since = None;
                outcome.transitions.push(self.observable_transition(None));
            }
            Err(_) => {
                // The acquire dissolved before becoming observable.
                self.state.tag = LockStateTag::Idle;
            }
        }
    }

    fn try_switch(
        &mut self,
        now: Tick,
        direction: SwitchDirection,
        frame: &AimFrame,
        env: &LockEnv<'_>,
        registry: &MarkerRegistry,
        outcome: &mut TickOutcome,
    ) {
        let Some(current) = self.state.handle else {
            return;
        };
        let Ok(resolved) = registry.resolve(current) else {
            // Validation later this tick will release the invalid handle.
            return;
        };
        let current_position = resolved.socket_position;

        self.state.tag = LockStateTag::Switching;
        let raw = match capture(frame, &self.rules, &self.config, env, registry) {
            Ok(raw) => raw,
            Err(_) => {
                self.diagnostics.frame_faults += 1;
                self.state.tag = LockStateTag::Locked;
                return;
            }
        };
        let mut eligible = filter_and_score(
            raw,
            &self.rules,
            registry,
            ScoreContext::Switching,
            Some(current),
        );
        self.prune_cooldown(now, &mut eligible);
        self.last_candidates = eligible.clone();
        self.last_capture_tick = Some(now);

        match resolve_switch(
            &eligible,
            current,
            current_position,
            direction,
            frame,
            &self.rules,
        ) {
            Some(next) => {
                self.state.tag = LockStateTag::Locked;
                self.state.handle = Some(next);
                self.state.acquired_at = Some(now);
                self.los_lost_since = None;
                outcome.transitions.push(self.observable_transition(None));
            }
            None => {
                // No-op switch: the lock is retained and nothing publishes.
                self.state.tag = LockStateTag::Locked;
            }
        }
    }

    fn validate_lock(
        &mut self,
        now: Tick,
        frame: &AimFrame,
        env: &LockEnv<'_>,
        registry: &MarkerRegistry,
        outcome: &mut TickOutcome,
    ) {
        let Some(handle) = self.state.handle else {
            return;
        };
        let resolved = match registry.resolve(handle) {
            Ok(resolved) => resolved,
            Err(HandleFault::Gone) => {
                let transition = self.release(now, UnlockReason::TargetInvalidated);
                outcome.transitions.push(transition);
                return;
            }
            Err(HandleFault::Declined) => {
                let transition = self.release(now, UnlockReason::CapabilityRevoked);
                outcome.transitions.push(transition);
                return;
            }
        };

        if frame.validate().is_err() {
            // Cannot judge geometry this tick; keep the lock and let a
            // well-formed frame decide.
            self.diagnostics.frame_faults += 1;
            return;
        }

        let delta = resolved.socket_position - frame.origin;
        let distance = delta.length();
        let retain_distance =
            self.rules.radius * resolved.marker.capture_radius_scale * self.rules.retain_radius_scale;
        if distance > retain_distance {
            let transition = self.release(now, UnlockReason::OutOfRange);
            outcome.transitions.push(transition);
            return;
        }

        if distance > f32::EPSILON {
            let cos = (delta / distance).dot(frame.forward).clamp(-1.0, 1.0);
            let angle = cos.acos();
            let retain_angle = (self.rules.max_angle_rad() * self.rules.retain_angle_scale)
                .min(std::f32::consts::PI);
            if angle > retain_angle {
                let transition = self.release(now, UnlockReason::OutOfRange);
                outcome.transitions.push(transition);
                return;
            }
        }

        if self.rules.require_los {
            if let Ok(visibility) = env.visibility() {
                if visibility.line_of_sight(frame.origin, resolved.socket_position) {
                    self.los_lost_since = None;
                } else {
                    let since = *self.los_lost_since.get_or_insert(now);
                    if now.0 - since.0 >= self.rules.los_grace_ticks {
                        let transition = self.release(now, UnlockReason::LineOfSightFail);
                        outcome.transitions.push(transition);
                    }
                }
            }
            // A vanished oracle cannot prove occlusion; the lock survives.
        }
    }

    fn release(&mut self, now: Tick, reason: UnlockReason) -> Transition {
        if let Some(handle) = self.state.handle {
            if self.rules.cooldown_ticks > 0 {
                self.cooldown = Some((handle.target, now + self.rules.cooldown_ticks));
            }
        }
        self.state.tag = LockStateTag::Released;
        self.state.handle = None;
        self.state.acquired_at = None;
        self.los_lost_since = None;

        if let Some(bit) = reason.mask_bit() {
            if self.rules.auto_reacquire.contains(bit) {
                self.auto_acquire_armed = true;
            }
        }

        self.observable_transition(Some(reason))
    }

    fn observable_transition(&self, reason: Option<UnlockReason>) -> Transition {
        Transition {
            owner: self.state.owner,
            tag: self.state.tag,
            handle: self.state.handle,
            reason,
        }
    }

    /// Drops candidates still barred by the re-acquisition cooldown and
    /// retires the bar once it expires.
    fn prune_cooldown(&mut self, now: Tick, eligible: &mut Vec<Candidate>) {
        if let Some((barred, until)) = self.cooldown {
            if now >= until {
                self.cooldown = None;
            } else {
                eligible.retain(|c| c.handle.target != barred);
            }
        }
    }

    fn capture_due(&self, now: Tick) -> bool {
        match self.last_capture_tick {
            None => true,
            Some(last) => now.0.saturating_sub(last.0) >= self.rules.capture_interval_ticks,
        }
    }
}
