//! Acquisition session configuration.
//!
//! [`AcquisitionRules`] is supplied by the caller when a session starts and
//! stays immutable for the session's lifetime. Malformed rules are rejected
//! at setup — the engine keeps its current state and never sees them.

use crate::error::{ErrorSeverity, LockError};
use crate::unlock::UnlockReasonMask;

/// Geometry of the search volume swept in front of the owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SearchShape {
    /// Angle-limited cone around the aim axis.
    #[default]
    Cone,
    /// Full sphere around the origin.
    Sphere,
    /// Tube around the aim axis.
    Cylinder,
}

/// Secondary ordering applied when two candidates score identically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TieBreak {
    /// Prefer the candidate closer to the aim axis.
    #[default]
    Angular,
    /// Prefer the nearer candidate.
    Distance,
}

/// Blend between angular alignment and distance in the candidate score.
///
/// A weight of 1.0 scores purely by angle, 0.0 purely by distance. Finding
/// and switching use separate weights: the initial acquisition favors what
/// the player is aiming at, while a switch cares more about proximity to the
/// current target.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreWeights {
    pub angle_weight_finding: f32,
    pub angle_weight_switching: f32,
}

impl ScoreWeights {
    pub const DEFAULT_FINDING: f32 = 0.85;
    pub const DEFAULT_SWITCHING: f32 = 0.5;
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            angle_weight_finding: Self::DEFAULT_FINDING,
            angle_weight_switching: Self::DEFAULT_SWITCHING,
        }
    }
}

/// Complete configuration of one acquisition session.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AcquisitionRules {
    pub shape: SearchShape,
    /// Search radius in world units.
    pub radius: f32,
    /// Maximum angular offset from the aim axis, in degrees.
    pub max_angle_deg: f32,
    /// Require an unobstructed line of sight for eligibility.
    pub require_los: bool,
    /// Ticks after a release during which the released target cannot be
    /// re-acquired by this owner.
    pub cooldown_ticks: u64,
    pub tie_break: TieBreak,
    pub weights: ScoreWeights,
    /// Acceptance arc around the requested switch direction, in degrees.
    pub switch_arc_deg: f32,
    /// Ticks a locked target may stay occluded before release. Zero releases
    /// on the first occluded validation tick.
    pub los_grace_ticks: u64,
    /// Retention bounds are the acquisition bounds loosened by these scales,
    /// so a target sitting on the boundary does not flicker in and out.
    pub retain_radius_scale: f32,
    pub retain_angle_scale: f32,
    /// Full capture/score passes run every this many ticks; held-lock
    /// validation still runs every tick.
    pub capture_interval_ticks: u64,
    /// Automatic releases whose reason is in this mask immediately attempt a
    /// fresh acquisition.
    pub auto_reacquire: UnlockReasonMask,
}

impl AcquisitionRules {
    pub const DEFAULT_RADIUS: f32 = 2000.0;
    pub const DEFAULT_MAX_ANGLE_DEG: f32 = 45.0;
    pub const DEFAULT_SWITCH_ARC_DEG: f32 = 60.0;
    pub const DEFAULT_RETAIN_RADIUS_SCALE: f32 = 1.15;
    pub const DEFAULT_RETAIN_ANGLE_SCALE: f32 = 1.25;

    /// Checks every recognized option, returning the first violation.
    ///
    /// # Errors
    ///
    /// Returns a [`RulesError`] describing the malformed field. Callers must
    /// reject the session and keep the engine idle.
    pub fn validate(&self) -> Result<(), RulesError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(RulesError::NonPositiveRadius {
                radius: self.radius,
            });
        }
        if !self.max_angle_deg.is_finite()
            || self.max_angle_deg <= 0.0
            || self.max_angle_deg > 180.0
        {
            return Err(RulesError::AngleOutOfRange {
                angle_deg: self.max_angle_deg,
            });
        }
        if !self.switch_arc_deg.is_finite()
            || self.switch_arc_deg <= 0.0
            || self.switch_arc_deg > 180.0
        {
            return Err(RulesError::SwitchArcOutOfRange {
                arc_deg: self.switch_arc_deg,
            });
        }
        for weight in [
            self.weights.angle_weight_finding,
            self.weights.angle_weight_switching,
        ] {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(RulesError::WeightOutOfRange { weight });
            }
        }
        for scale in [self.retain_radius_scale, self.retain_angle_scale] {
            if !scale.is_finite() || scale < 1.0 {
                return Err(RulesError::RetainScaleBelowOne { scale });
            }
        }
        if self.capture_interval_ticks == 0 {
            return Err(RulesError::ZeroCaptureInterval);
        }
        Ok(())
    }

    /// Angular limit in radians.
    pub fn max_angle_rad(&self) -> f32 {
        self.max_angle_deg.to_radians()
    }

    /// Switch acceptance arc in radians.
    pub fn switch_arc_rad(&self) -> f32 {
        self.switch_arc_deg.to_radians()
    }
}

impl Default for AcquisitionRules {
    fn default() -> Self {
        Self {
            shape: SearchShape::default(),
            radius: Self::DEFAULT_RADIUS,
            max_angle_deg: Self::DEFAULT_MAX_ANGLE_DEG,
            require_los: true,
            cooldown_ticks: 30,
            tie_break: TieBreak::default(),
            weights: ScoreWeights::default(),
            switch_arc_deg: Self::DEFAULT_SWITCH_ARC_DEG,
            los_grace_ticks: 0,
            retain_radius_scale: Self::DEFAULT_RETAIN_RADIUS_SCALE,
            retain_angle_scale: Self::DEFAULT_RETAIN_ANGLE_SCALE,
            capture_interval_ticks: 1,
            auto_reacquire: UnlockReasonMask::empty(),
        }
    }
}

/// Configuration rejected at acquisition-session setup.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum RulesError {
    #[error("search radius must be finite and positive, got {radius}")]
    NonPositiveRadius { radius: f32 },

    #[error("max angle must be in (0, 180] degrees, got {angle_deg}")]
    AngleOutOfRange { angle_deg: f32 },

    #[error("switch arc must be in (0, 180] degrees, got {arc_deg}")]
    SwitchArcOutOfRange { arc_deg: f32 },

    #[error("score weight must be in [0, 1], got {weight}")]
    WeightOutOfRange { weight: f32 },

    #[error("retain scale must be >= 1, got {scale}")]
    RetainScaleBelowOne { scale: f32 },

    #[error("capture interval must be at least one tick")]
    ZeroCaptureInterval,
}

impl LockError for RulesError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveRadius { .. } => "RULES_NON_POSITIVE_RADIUS",
            Self::AngleOutOfRange { .. } => "RULES_ANGLE_OUT_OF_RANGE",
            Self::SwitchArcOutOfRange { .. } => "RULES_SWITCH_ARC_OUT_OF_RANGE",
            Self::WeightOutOfRange { .. } => "RULES_WEIGHT_OUT_OF_RANGE",
            Self::RetainScaleBelowOne { .. } => "RULES_RETAIN_SCALE_BELOW_ONE",
            Self::ZeroCaptureInterval => "RULES_ZERO_CAPTURE_INTERVAL",
        }
    }
}
