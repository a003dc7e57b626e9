//! Release reasons and the automatic re-acquisition mask.

use bitflags::bitflags;

/// Why a lock was released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnlockReason {
    /// Explicit unlock request from the input layer.
    Explicit,
    /// Target marker despawned or its socket vanished.
    TargetInvalidated,
    /// Target drifted outside the loosened retain bounds.
    OutOfRange,
    /// Line of sight stayed broken past the grace window.
    LineOfSightFail,
    /// Marker stopped accepting being targeted.
    CapabilityRevoked,
}

bitflags! {
    /// Selects which automatic release reasons trigger an immediate attempt
    /// to acquire a fresh target. Explicit releases never re-acquire.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct UnlockReasonMask: u8 {
        const TARGET_INVALIDATED = 1 << 0;
        const OUT_OF_RANGE = 1 << 1;
        const LINE_OF_SIGHT_FAIL = 1 << 2;
        const CAPABILITY_REVOKED = 1 << 3;
    }
}

// Serialized as the raw bit pattern; unknown bits are dropped on the way in
// so older readers tolerate newer masks.
#[cfg(feature = "serde")]
impl serde::Serialize for UnlockReasonMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for UnlockReasonMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = <u8 as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

impl UnlockReason {
    /// Mask bit for this reason; `None` for explicit requests, which are
    /// never auto-reacquired.
    pub const fn mask_bit(self) -> Option<UnlockReasonMask> {
        match self {
            Self::Explicit => None,
            Self::TargetInvalidated => Some(UnlockReasonMask::TARGET_INVALIDATED),
            Self::OutOfRange => Some(UnlockReasonMask::OUT_OF_RANGE),
            Self::LineOfSightFail => Some(UnlockReasonMask::LINE_OF_SIGHT_FAIL),
            Self::CapabilityRevoked => Some(UnlockReasonMask::CAPABILITY_REVOKED),
        }
    }
}
