//! Per-entry blend weights used by the per-bone blend operator.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use posemix_api_core::AttributeId;

/// One weight per bone (index-aligned with the skeleton), plus sparse curve and
/// attribute weights. Anything without an entry blends with weight 0.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PerBoneBlendWeights {
    pub bone_weights: Vec<f32>,
    #[serde(default)]
    pub curve_weights: HashMap<String, f32>,
    #[serde(default, with = "posemix_api_core::serde_pairs")]
    pub attribute_weights: HashMap<AttributeId, f32>,
}

impl PerBoneBlendWeights {
    pub fn uniform(bone_count: usize, weight: f32) -> Self {
        Self {
            bone_weights: vec![weight; bone_count],
            ..Default::default()
        }
    }

    #[inline]
    pub fn bone_weight(&self, bone: usize) -> f32 {
        self.bone_weights.get(bone).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn curve_weight(&self, name: &str) -> f32 {
        self.curve_weights.get(name).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn attribute_weight(&self, id: &AttributeId) -> f32 {
        self.attribute_weights.get(id).copied().unwrap_or(0.0)
    }
}
