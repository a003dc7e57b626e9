//! Candidate filtering and scoring.
//!
//! Pure reduction of a raw capture set to the eligible candidates, ordered
//! best-first. The score blends normalized distance and normalized angular
//! offset; lower is better, and the blend weight differs between finding a
//! fresh target and switching away from a held one. Ordering is fully
//! deterministic: equal scores fall back to the session tie-break, then to
//! stable identifier order, so identical input always produces identical
//! output.

use crate::capture::{Candidate, cmp_ids};
use crate::marker::MarkerRegistry;
use crate::rules::{AcquisitionRules, TieBreak};
use crate::state::TargetHandle;

/// Which weight the scorer blends with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreContext {
    /// Initial acquisition; alignment with the aim axis dominates.
    Finding,
    /// Directed switch away from a held target; distance matters more.
    Switching,
}

/// Filters ineligible candidates and orders the rest best-first.
///
/// Drops candidates that exceed the session's angular limit, fall outside
/// the (per-marker scaled) search radius, are occluded while the session
/// requires line of sight, or whose marker has stopped accepting targeting
/// since capture. The capability check deliberately re-queries the registry:
/// eligibility is decided at filter time, not at capture time.
///
/// `current` excludes the held handle from the output; a switch never
/// "finds" the target it is leaving.
pub fn filter_and_score(
    candidates: Vec<Candidate>,
    rules: &AcquisitionRules,
    registry: &MarkerRegistry,
    context: ScoreContext,
    current: Option<TargetHandle>,
) -> Vec<Candidate> {
    let max_angle = rules.max_angle_rad();
    let angle_weight = match context {
        ScoreContext::Finding => rules.weights.angle_weight_finding,
        ScoreContext::Switching => rules.weights.angle_weight_switching,
    };

    let mut eligible: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| {
            if Some(candidate.handle) == current {
                return false;
            }
            if candidate.angle > max_angle {
                return false;
            }
            if candidate.occluded && rules.require_los {
                return false;
            }
            let Some(marker) = registry.get(candidate.handle.target) else {
                return false;
            };
            if !marker.can_be_targeted {
                return false;
            }
            candidate.distance <= rules.radius * marker.capture_radius_scale
        })
        .collect();

    for candidate in &mut eligible {
        let norm_angle = (candidate.angle / max_angle).clamp(0.0, 1.0);
        let norm_dist = (candidate.distance / rules.radius).clamp(0.0, 1.0);
        candidate.score = angle_weight * norm_angle + (1.0 - angle_weight) * norm_dist;
    }

    eligible.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| match rules.tie_break {
                TieBreak::Angular => a.angle.total_cmp(&b.angle),
                TieBreak::Distance => a.distance.total_cmp(&b.distance),
            })
            .then_with(|| cmp_ids(a.handle, b.handle))
    });

    eligible
}
