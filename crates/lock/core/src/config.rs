/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockConfig {
    /// Broad-phase candidate cap. The capture query keeps at most this many
    /// candidates (nearest first) before running line-of-sight checks, so the
    /// expensive narrow phase never scales with world population.
    pub max_candidates: usize,
}

impl LockConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum sockets a marker may declare.
    pub const MAX_SOCKETS: usize = 8;
    /// Maximum length of a socket name.
    pub const MAX_SOCKET_NAME: usize = 24;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_CANDIDATES: usize = 32;

    pub fn new() -> Self {
        Self {
            max_candidates: Self::DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_max_candidates(max_candidates: usize) -> Self {
        Self { max_candidates }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new()
    }
}
