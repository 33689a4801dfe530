//! Mixer configuration.

use serde::{Deserialize, Serialize};

use posemix_api_core::KINDA_SMALL_NUMBER;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixerConfig {
    /// Absolute tolerance under which adding an entry's weight leaves the band total
    /// unchanged; such entries do not count as separate contributors.
    pub duplicate_weight_epsilon: f32,
    /// Reuse resolved programs across passes until an entry changes.
    pub cache_programs: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            duplicate_weight_epsilon: KINDA_SMALL_NUMBER,
            cache_programs: true,
        }
    }
}
