//! Keyframe: the pose + curves + attributes snapshot that flows through the VM.

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeSet;
use crate::curves::CurveSet;
use crate::weights::PerBoneBlendWeights;
use posemix_api_core::tolerance::{is_full_weight, is_relevant_weight};
use posemix_api_core::Transform;

/// Local-space bone transforms, index-aligned with the skeleton.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Pose {
    pub transforms: Vec<Transform>,
}

impl Pose {
    pub fn filled(bone_count: usize, value: Transform) -> Self {
        Self {
            transforms: vec![value; bone_count],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// One pose snapshot. Keyframes are moved between stack slots, never shared.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub pose: Pose,
    #[serde(default)]
    pub curves: CurveSet,
    #[serde(default)]
    pub attributes: AttributeSet,
    #[serde(default)]
    pub is_additive: bool,
}

/// Binary operators require identical bone topology.
#[inline]
fn assert_same_topology(a: &Keyframe, b: &Keyframe) {
    assert_eq!(
        a.pose.len(),
        b.pose.len(),
        "keyframes with different bone counts cannot be combined"
    );
}

impl Keyframe {
    pub fn new(pose: Pose, is_additive: bool) -> Self {
        Self {
            pose,
            curves: CurveSet::new(),
            attributes: AttributeSet::new(),
            is_additive,
        }
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.pose.len()
    }

    /// `lerp(a, b, alpha)` on every channel. Alpha at (or within the zero-weight
    /// threshold of) 0 or 1 returns the matching operand unchanged.
    pub fn blend_two(mut a: Keyframe, b: Keyframe, alpha: f32) -> Keyframe {
        assert_same_topology(&a, &b);
        if !is_relevant_weight(alpha) {
            return a;
        }
        if is_full_weight(alpha) {
            return b;
        }
        for (ta, tb) in a.pose.transforms.iter_mut().zip(b.pose.transforms.iter()) {
            *ta = Transform::blend(ta, tb, alpha);
        }
        a.curves = CurveSet::blend(&a.curves, &b.curves, alpha);
        a.attributes = AttributeSet::blend(&a.attributes, &b.attributes, alpha);
        a
    }

    /// Blend `a -> b` with a weight per bone, curve and attribute, each multiplied by `scale`.
    pub fn blend_per_bone(
        mut a: Keyframe,
        b: &Keyframe,
        weights: &PerBoneBlendWeights,
        scale: f32,
    ) -> Keyframe {
        assert_same_topology(&a, b);
        for (bone, (ta, tb)) in a
            .pose
            .transforms
            .iter_mut()
            .zip(b.pose.transforms.iter())
            .enumerate()
        {
            let w = (weights.bone_weight(bone) * scale).clamp(0.0, 1.0);
            if is_full_weight(w) {
                *ta = *tb;
            } else if is_relevant_weight(w) {
                *ta = Transform::blend(ta, tb, w);
            }
        }
        a.curves = CurveSet::blend_with(&a.curves, &b.curves, |name| {
            (weights.curve_weight(name) * scale).clamp(0.0, 1.0)
        });
        a.attributes = AttributeSet::blend_with(&a.attributes, &b.attributes, |id| {
            (weights.attribute_weight(id) * scale).clamp(0.0, 1.0)
        });
        a
    }

    /// Multiply every channel by `w`. Rotations are left unnormalized.
    pub fn scale_by(&mut self, w: f32) {
        for t in self.pose.transforms.iter_mut() {
            t.scale_by(w);
        }
        self.curves.scale_by(w);
        self.attributes.scale_by(w);
    }

    /// `self += other * w` on every channel.
    pub fn accumulate(&mut self, other: &Keyframe, w: f32) {
        assert_same_topology(self, other);
        for (acc, t) in self.pose.transforms.iter_mut().zip(other.pose.transforms.iter()) {
            acc.accumulate(t, w);
        }
        self.curves.accumulate(&other.curves, w);
        self.attributes.accumulate(&other.attributes, w);
    }

    /// Layer an additive keyframe on top of `self` with weight `alpha`.
    pub fn apply_additive(&mut self, additive: &Keyframe, alpha: f32) {
        assert_same_topology(self, additive);
        if !is_relevant_weight(alpha) {
            return;
        }
        for (base, delta) in self
            .pose
            .transforms
            .iter_mut()
            .zip(additive.pose.transforms.iter())
        {
            base.apply_additive(delta, alpha);
        }
        self.curves.accumulate(&additive.curves, alpha);
        self.attributes.apply_additive(&additive.attributes, alpha);
    }

    pub fn normalize_rotations(&mut self) {
        for t in self.pose.transforms.iter_mut() {
            t.normalize_rotation();
        }
        self.attributes.normalize();
    }
}
