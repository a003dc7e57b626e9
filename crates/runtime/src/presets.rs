//! Named acquisition-rule presets loaded from JSON.
//!
//! Hosts typically ship a handful of tuned configurations (melee, ranged,
//! vehicle) and select one per actor. Every preset is validated on load so a
//! malformed file fails once, at startup, instead of rejecting acquisitions
//! at runtime.

use std::collections::HashMap;

use lock_core::{AcquisitionRules, RulesError};

/// Failure to load a preset file.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to parse rules presets")]
    Parse(#[from] serde_json::Error),

    #[error("preset '{name}' is invalid")]
    Invalid {
        name: String,
        #[source]
        source: RulesError,
    },
}

/// Parses a `{ "name": { ...rules... } }` JSON document.
///
/// Unspecified fields take their defaults, so presets only state what they
/// tune.
///
/// # Errors
///
/// Fails on malformed JSON or on the first preset whose rules do not
/// validate.
pub fn load_presets(json: &str) -> Result<HashMap<String, AcquisitionRules>, PresetError> {
    let presets: HashMap<String, AcquisitionRules> = serde_json::from_str(json)?;
    for (name, rules) in &presets {
        rules.validate().map_err(|source| PresetError::Invalid {
            name: name.clone(),
            source,
        })?;
    }
    Ok(presets)
}
