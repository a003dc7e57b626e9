//! Static blocker geometry served through [`lock_core::VisibilityOracle`].

use glam::Vec3;

use lock_core::VisibilityOracle;

/// Axis-aligned box that blocks line of sight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blocker {
    pub min: Vec3,
    pub max: Vec3,
}

impl Blocker {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Slab test for a segment against the box, on parametric t in [0, 1].
    fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let direction = to - from;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for axis in 0..3 {
            let origin = from[axis];
            let dir = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }

            let t1 = (lo - origin) / dir;
            let t2 = (hi - origin) / dir;
            let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return false;
            }
        }

        true
    }
}

/// VisibilityOracle implementation with static occluder data.
///
/// Holds immutable blocker volumes that don't change during gameplay. The
/// engine treats the world's spatial index as read-only, so a shared
/// reference is all it ever needs.
#[derive(Clone, Debug, Default)]
pub struct StaticVisibilityOracle {
    blockers: Vec<Blocker>,
}

impl StaticVisibilityOracle {
    pub fn new(blockers: Vec<Blocker>) -> Self {
        Self { blockers }
    }

    /// Empty scene where every segment has line of sight.
    pub fn open() -> Self {
        Self::default()
    }

    /// A single wall spanning the YZ plane at `x`, useful for tests.
    pub fn wall_at_x(x: f32, half_extent: f32) -> Self {
        Self::new(vec![Blocker::new(
            Vec3::new(x - 1.0, -half_extent, -half_extent),
            Vec3::new(x + 1.0, half_extent, half_extent),
        )])
    }
}

impl VisibilityOracle for StaticVisibilityOracle {
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        !self
            .blockers
            .iter()
            .any(|blocker| blocker.intersects_segment(from, to))
    }
}
