//! Capture query: spatial discovery of lock candidates.
//!
//! `capture` sweeps the registry with a cheap broad phase (shape and range
//! tests, capped at the configured candidate budget) and only then runs the
//! expensive narrow phase — one line-of-sight query per surviving candidate —
//! so occlusion checks never scale with the whole world. It mutates nothing
//! and returns an empty set, not an error, when nothing qualifies.

use glam::Vec3;

use crate::config::LockConfig;
use crate::env::LockEnv;
use crate::error::{ErrorSeverity, LockError};
use crate::marker::MarkerRegistry;
use crate::rules::{AcquisitionRules, SearchShape};
use crate::state::{SocketId, TargetHandle};

/// Aim basis of the capturing owner for one tick.
///
/// `forward` and `up` must be unit length and non-parallel; `right` is
/// derived, giving the screen basis the switch resolver projects onto.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AimFrame {
    pub origin: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl AimFrame {
    const UNIT_EPSILON: f32 = 1e-3;

    pub fn new(origin: Vec3, forward: Vec3, up: Vec3) -> Self {
        Self {
            origin,
            forward,
            up,
        }
    }

    /// Frame looking down +X with +Y up, useful for tests and defaults.
    pub fn looking_down_x(origin: Vec3) -> Self {
        Self::new(origin, Vec3::X, Vec3::Y)
    }

    /// Checks finiteness and normalization.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] describing the malformed component; the
    /// engine treats it as a setup failure and stays in its current state.
    pub fn validate(&self) -> Result<(), FrameError> {
        if !self.origin.is_finite() || !self.forward.is_finite() || !self.up.is_finite() {
            return Err(FrameError::NonFinite);
        }
        if (self.forward.length() - 1.0).abs() > Self::UNIT_EPSILON
            || (self.up.length() - 1.0).abs() > Self::UNIT_EPSILON
        {
            return Err(FrameError::NotNormalized);
        }
        if self.forward.cross(self.up).length_squared() < Self::UNIT_EPSILON {
            return Err(FrameError::DegenerateBasis);
        }
        Ok(())
    }

    /// Screen-right axis.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize()
    }

    /// Screen-up axis, orthogonal to both `forward` and `right`.
    pub fn screen_up(&self) -> Vec3 {
        self.right().cross(self.forward)
    }
}

/// Malformed aim frame rejected before any spatial work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("aim frame contains non-finite components")]
    NonFinite,

    #[error("aim directions must be unit length")]
    NotNormalized,

    #[error("forward and up axes are parallel")]
    DegenerateBasis,
}

impl LockError for FrameError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NonFinite => "FRAME_NON_FINITE",
            Self::NotNormalized => "FRAME_NOT_NORMALIZED",
            Self::DegenerateBasis => "FRAME_DEGENERATE_BASIS",
        }
    }
}

/// Transient per-cycle record for one (target, socket) pair.
///
/// Candidates live for exactly one capture/score pass and are never
/// persisted; the engine keeps only the handle of the one it locks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub handle: TargetHandle,
    /// World position of the socket this cycle.
    pub position: Vec3,
    pub distance: f32,
    /// Angular offset from the aim axis, in radians.
    pub angle: f32,
    pub occluded: bool,
    /// Filled by the scorer; lower is better.
    pub score: f32,
}

/// Discovers every marker socket inside the search volume.
///
/// Broad phase first: shape, range, and per-marker minimum-distance tests
/// over the registry, keeping at most `config.max_candidates` nearest
/// entries. Narrow phase second: a line-of-sight query per survivor. With no
/// visibility oracle the result degrades per the session rules — empty when
/// occlusion is required, unoccluded otherwise.
///
/// # Errors
///
/// Only a malformed `frame` fails; an empty world or fully-occluded volume
/// yields `Ok(vec![])`.
pub fn capture(
    frame: &AimFrame,
    rules: &AcquisitionRules,
    config: &LockConfig,
    env: &LockEnv<'_>,
    registry: &MarkerRegistry,
) -> Result<Vec<Candidate>, FrameError> {
    frame.validate()?;

    let mut candidates = Vec::new();
    for (id, marker) in registry.iter() {
        if !marker.can_be_targeted {
            continue;
        }
        let scaled_radius = rules.radius * marker.capture_radius_scale;
        for socket_index in 0..marker.sockets.len() {
            let socket = SocketId(socket_index as u8);
            let Some(position) = marker.socket_world(socket) else {
                continue;
            };
            let Some((distance, angle)) = measure(frame, position) else {
                continue;
            };
            if distance < marker.min_distance || distance > scaled_radius {
                continue;
            }
            if !inside_shape(rules, frame, position, angle) {
                continue;
            }
            candidates.push(Candidate {
                handle: TargetHandle::new(id, socket),
                position,
                distance,
                angle,
                occluded: false,
                score: 0.0,
            });
        }
    }

    // Broad-phase cap: keep the nearest before paying for occlusion traces.
    if candidates.len() > config.max_candidates {
        candidates.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| cmp_ids(a.handle, b.handle))
        });
        candidates.truncate(config.max_candidates);
    }

    match env.visibility() {
        Ok(visibility) => {
            for candidate in &mut candidates {
                candidate.occluded = !visibility.line_of_sight(frame.origin, candidate.position);
            }
        }
        Err(_) if rules.require_los => {
            // No way to prove visibility; behave as "no candidates".
            candidates.clear();
        }
        Err(_) => {}
    }

    Ok(candidates)
}

/// Distance and aim-axis angle to a point. `None` for a point sitting on the
/// origin, which can never be a meaningful candidate.
fn measure(frame: &AimFrame, position: Vec3) -> Option<(f32, f32)> {
    let delta = position - frame.origin;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return None;
    }
    let cos = (delta / distance).dot(frame.forward).clamp(-1.0, 1.0);
    Some((distance, cos.acos()))
}

fn inside_shape(rules: &AcquisitionRules, frame: &AimFrame, position: Vec3, angle: f32) -> bool {
    match rules.shape {
        SearchShape::Sphere => true,
        SearchShape::Cone => angle <= rules.max_angle_rad(),
        SearchShape::Cylinder => {
            let delta = position - frame.origin;
            let axial = delta.dot(frame.forward);
            if axial < 0.0 {
                return false;
            }
            let lateral_sq = (delta - frame.forward * axial).length_squared();
            lateral_sq <= rules.radius * rules.radius
        }
    }
}

/// Stable identifier order used as the final tie-break everywhere candidates
/// are sorted.
pub(crate) fn cmp_ids(a: TargetHandle, b: TargetHandle) -> std::cmp::Ordering {
    (a.target.index, a.target.generation, a.socket.0).cmp(&(
        b.target.index,
        b.target.generation,
        b.socket.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Env, VisibilityOracle};
    use crate::marker::TargetMarker;

    struct WallAtX(f32);

    impl VisibilityOracle for WallAtX {
        fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
            // Blocks any segment crossing the plane x = self.0.
            (from.x - self.0).signum() == (to.x - self.0).signum()
        }
    }

    fn world(positions: &[Vec3]) -> MarkerRegistry {
        let mut registry = MarkerRegistry::new();
        for &position in positions {
            registry.spawn(TargetMarker::new(position));
        }
        registry
    }

    #[test]
    fn rejects_malformed_frames() {
        let registry = world(&[]);
        let rules = AcquisitionRules::default();
        let config = LockConfig::default();
        let env = Env::empty();

        let bad = AimFrame::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::Y);
        assert_eq!(
            capture(&bad, &rules, &config, &env, &registry),
            Err(FrameError::NotNormalized)
        );

        let parallel = AimFrame::new(Vec3::ZERO, Vec3::Y, Vec3::Y);
        assert_eq!(
            capture(&parallel, &rules, &config, &env, &registry),
            Err(FrameError::DegenerateBasis)
        );
    }

    #[test]
    fn empty_world_yields_empty_set() {
        let registry = world(&[]);
        let rules = AcquisitionRules {
            require_los: false,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn cone_excludes_wide_angles() {
        let registry = world(&[
            Vec3::new(100.0, 0.0, 0.0),  // dead ahead
            Vec3::new(0.0, 100.0, 0.0),  // 90 degrees off axis
            Vec3::new(-100.0, 0.0, 0.0), // behind
        ]);
        let rules = AcquisitionRules {
            require_los: false,
            max_angle_deg: 45.0,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].angle < 1e-3);
    }

    #[test]
    fn sphere_captures_behind() {
        let registry = world(&[Vec3::new(-100.0, 0.0, 0.0)]);
        let rules = AcquisitionRules {
            require_los: false,
            shape: SearchShape::Sphere,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn cylinder_bounds_lateral_offset() {
        let registry = world(&[
            Vec3::new(500.0, 100.0, 0.0),
            Vec3::new(500.0, 2500.0, 0.0),
        ]);
        let rules = AcquisitionRules {
            require_los: false,
            shape: SearchShape::Cylinder,
            radius: 2000.0,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].position, Vec3::new(500.0, 100.0, 0.0));
    }

    #[test]
    fn occlusion_is_annotated_not_filtered() {
        let registry = world(&[Vec3::new(200.0, 0.0, 0.0)]);
        let rules = AcquisitionRules {
            require_los: false,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let wall = WallAtX(100.0);
        let env: LockEnv<'_> = Env::with_visibility(&wall);
        let found = capture(&frame, &rules, &LockConfig::default(), &env, &registry).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].occluded);
    }

    #[test]
    fn missing_oracle_with_required_occlusion_degrades_to_empty() {
        let registry = world(&[Vec3::new(200.0, 0.0, 0.0)]);
        let rules = AcquisitionRules {
            require_los: true,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn broad_phase_cap_keeps_nearest() {
        let positions: Vec<Vec3> = (1..=10)
            .map(|i| Vec3::new(i as f32 * 100.0, 0.0, 0.0))
            .collect();
        let registry = world(&positions);
        let rules = AcquisitionRules {
            require_los: false,
            ..Default::default()
        };
        let config = LockConfig::with_max_candidates(3);
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &config, &Env::empty(), &registry).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|c| c.distance <= 300.0));
    }

    #[test]
    fn respects_marker_min_distance() {
        let mut registry = MarkerRegistry::new();
        registry.spawn(TargetMarker::new(Vec3::new(50.0, 0.0, 0.0)).with_min_distance(100.0));
        let rules = AcquisitionRules {
            require_los: false,
            ..Default::default()
        };
        let frame = AimFrame::looking_down_x(Vec3::ZERO);
        let found = capture(&frame, &rules, &LockConfig::default(), &Env::empty(), &registry)
            .unwrap();
        assert!(found.is_empty());
    }
}
