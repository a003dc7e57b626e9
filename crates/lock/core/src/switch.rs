//! Switch resolution between eligible candidates.
//!
//! Given the held target and a directional request, picks the next handle
//! from the already-filtered candidate list. Pure: the resolver informs the
//! state machine's transition decision and never mutates lock state itself.

use glam::{Vec2, Vec3};

use crate::capture::{AimFrame, Candidate, cmp_ids};
use crate::rules::{AcquisitionRules, TieBreak};
use crate::state::TargetHandle;

/// Player-directed switch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchDirection {
    Left,
    Right,
    Up,
    Down,
    /// Take the best-scored eligible candidate regardless of direction.
    Nearest,
}

impl SwitchDirection {
    /// Trigonometric angle of the requested screen direction, measured from
    /// the screen-right axis.
    fn desired_angle(self) -> Option<f32> {
        use std::f32::consts::FRAC_PI_2;
        match self {
            Self::Right => Some(0.0),
            Self::Up => Some(FRAC_PI_2),
            Self::Left => Some(std::f32::consts::PI),
            Self::Down => Some(-FRAC_PI_2),
            Self::Nearest => None,
        }
    }
}

/// Picks the next target for a switch request, or `None` to retain the
/// current lock.
///
/// Directional requests project each candidate's offset from the current
/// target onto the screen basis. A candidate qualifies when its projection
/// onto the requested axis is non-zero in the requested sign and its
/// trigonometric angle lies inside the acceptance arc around the requested
/// direction. Among qualifiers the smallest angular deviation wins; exact
/// ties fall back to the session tie-break, then to identifier order.
pub fn resolve_switch(
    eligible: &[Candidate],
    current: TargetHandle,
    current_position: Vec3,
    direction: SwitchDirection,
    frame: &AimFrame,
    rules: &AcquisitionRules,
) -> Option<TargetHandle> {
    let Some(desired) = direction.desired_angle() else {
        // Auto request: the list is already ordered best-first.
        return eligible
            .iter()
            .find(|c| c.handle != current)
            .map(|c| c.handle);
    };

    let right = frame.right();
    let screen_up = frame.screen_up();
    let arc = rules.switch_arc_rad();

    let mut best: Option<(f32, &Candidate)> = None;
    for candidate in eligible {
        if candidate.handle == current {
            continue;
        }
        let offset = candidate.position - current_position;
        let projected = Vec2::new(offset.dot(right), offset.dot(screen_up));
        if projected.length_squared() <= f32::EPSILON {
            continue;
        }

        // The requested axis must be strictly crossed in the right sign.
        // Nearest returned earlier, so it never selects an axis here.
        let along_axis = match direction {
            SwitchDirection::Right => projected.x,
            SwitchDirection::Left => -projected.x,
            SwitchDirection::Up => projected.y,
            SwitchDirection::Down | SwitchDirection::Nearest => -projected.y,
        };
        if along_axis <= 0.0 {
            continue;
        }

        let theta = projected.y.atan2(projected.x);
        let deviation = wrap_angle(theta - desired).abs();
        if deviation > arc {
            continue;
        }

        let better = match &best {
            None => true,
            Some((best_dev, best_candidate)) => {
                deviation
                    .total_cmp(best_dev)
                    .then_with(|| match rules.tie_break {
                        TieBreak::Angular => candidate.angle.total_cmp(&best_candidate.angle),
                        TieBreak::Distance => {
                            candidate.distance.total_cmp(&best_candidate.distance)
                        }
                    })
                    .then_with(|| cmp_ids(candidate.handle, best_candidate.handle))
                    .is_lt()
            }
        };
        if better {
            best = Some((deviation, candidate));
        }
    }

    best.map(|(_, candidate)| candidate.handle)
}

/// Wraps an angle to [-pi, pi].
fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SocketId, TargetId};

    fn candidate(index: u32, position: Vec3) -> Candidate {
        Candidate {
            handle: TargetHandle::new(TargetId::new(index, 0), SocketId::ROOT),
            position,
            distance: position.length(),
            angle: 0.1,
            occluded: false,
            score: 0.0,
        }
    }

    fn frame() -> AimFrame {
        // Looking down +X with +Y up: screen-right is +Z, screen-up is +Y.
        AimFrame::looking_down_x(Vec3::ZERO)
    }

    fn rules() -> AcquisitionRules {
        AcquisitionRules {
            require_los: false,
            ..Default::default()
        }
    }

    #[test]
    fn picks_candidate_in_requested_direction() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        let right_of = candidate(1, Vec3::new(500.0, 0.0, 200.0));
        let left_of = candidate(2, Vec3::new(500.0, 0.0, -200.0));
        let eligible = vec![right_of, left_of];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Right,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, Some(right_of.handle));

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Left,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, Some(left_of.handle));
    }

    #[test]
    fn returns_none_when_no_candidate_lies_in_direction() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        let left_of = candidate(1, Vec3::new(500.0, 0.0, -200.0));
        let eligible = vec![left_of];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Right,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, None);
    }

    #[test]
    fn acceptance_arc_rejects_perpendicular_candidates() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        // Mostly "up", barely to the right: outside a 60 degree arc around
        // the right direction.
        let diagonal = candidate(1, Vec3::new(500.0, 300.0, 20.0));
        let eligible = vec![diagonal];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Right,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, None);

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Up,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, Some(diagonal.handle));
    }

    #[test]
    fn smallest_angular_deviation_wins() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        let straight_right = candidate(1, Vec3::new(500.0, 10.0, 300.0));
        let diagonal_right = candidate(2, Vec3::new(500.0, 150.0, 300.0));
        let eligible = vec![diagonal_right, straight_right];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Right,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, Some(straight_right.handle));
    }

    #[test]
    fn nearest_takes_head_of_ordered_list_skipping_current() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        let other = candidate(1, Vec3::new(700.0, 0.0, 0.0));
        let eligible = vec![current, other];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Nearest,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, Some(other.handle));
    }

    #[test]
    fn resolver_ignores_candidate_at_identical_position() {
        let current = candidate(0, Vec3::new(500.0, 0.0, 0.0));
        let overlapping = candidate(1, Vec3::new(500.0, 0.0, 0.0));
        let eligible = vec![overlapping];

        let picked = resolve_switch(
            &eligible,
            current.handle,
            current.position,
            SwitchDirection::Right,
            &frame(),
            &rules(),
        );
        assert_eq!(picked, None);
    }
}
