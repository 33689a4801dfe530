//! Reference skeleton: bone hierarchy, reference pose and LOD truncation.

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use posemix_api_core::{Transform, INDEX_NONE};

/// Bone hierarchy shared by every keyframe evaluated against it.
///
/// Bones are ordered so that a parent always precedes its children; an LOD keeps
/// a prefix of the bone list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSkeleton {
    pub name: String,
    pub bone_names: Vec<String>,
    /// Parent index per bone, `-1` for the root.
    pub parent_indices: Vec<i32>,
    pub reference_pose: Vec<Transform>,
    /// Bones kept at LOD 1, 2, ... (LOD 0 keeps all bones).
    #[serde(default)]
    pub lod_bone_counts: Vec<usize>,
}

impl ReferenceSkeleton {
    /// Build and validate a skeleton.
    pub fn new(
        name: impl Into<String>,
        bone_names: Vec<String>,
        parent_indices: Vec<i32>,
        reference_pose: Vec<Transform>,
    ) -> Result<Self, EvalError> {
        let skeleton = Self {
            name: name.into(),
            bone_names,
            parent_indices,
            reference_pose,
            lod_bone_counts: Vec::new(),
        };
        skeleton.validate()?;
        Ok(skeleton)
    }

    pub fn from_json(text: &str) -> Result<Self, EvalError> {
        let skeleton: Self = serde_json::from_str(text)?;
        skeleton.validate()?;
        Ok(skeleton)
    }

    pub fn with_lods(mut self, lod_bone_counts: Vec<usize>) -> Result<Self, EvalError> {
        self.lod_bone_counts = lod_bone_counts;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        let n = self.bone_names.len();
        if n == 0 {
            return Err(EvalError::EmptySkeleton {
                name: self.name.clone(),
            });
        }
        for (field, actual) in [
            ("parent_indices", self.parent_indices.len()),
            ("reference_pose", self.reference_pose.len()),
        ] {
            if actual != n {
                return Err(EvalError::SkeletonArrayMismatch {
                    name: self.name.clone(),
                    field,
                    expected: n,
                    actual,
                });
            }
        }
        for (bone, &parent) in self.parent_indices.iter().enumerate() {
            let valid = if bone == 0 {
                parent == INDEX_NONE
            } else {
                parent >= 0 && (parent as usize) < bone
            };
            if !valid {
                return Err(EvalError::InvalidParent {
                    name: self.name.clone(),
                    bone,
                    parent,
                });
            }
        }
        let mut previous = n;
        for (i, &count) in self.lod_bone_counts.iter().enumerate() {
            if count == 0 || count > previous {
                return Err(EvalError::InvalidLod {
                    name: self.name.clone(),
                    lod: i + 1,
                    count,
                    max: previous,
                });
            }
            previous = count;
        }
        Ok(())
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_names.len()
    }

    /// Number of bones evaluated at `lod`. LODs past the last authored one reuse it.
    pub fn bone_count_for_lod(&self, lod: usize) -> usize {
        if lod == 0 {
            return self.bone_count();
        }
        self.lod_bone_counts
            .get(lod - 1)
            .or_else(|| self.lod_bone_counts.last())
            .copied()
            .unwrap_or_else(|| self.bone_count())
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bone_names.iter().position(|b| b == name)
    }

    pub fn parent(&self, bone: usize) -> Option<usize> {
        self.parent_indices
            .get(bone)
            .and_then(|&p| if p < 0 { None } else { Some(p as usize) })
    }
}
