use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::pop_pair;
use crate::alpha::ScaleBiasClamp;
use crate::attributes::AttributeSet;
use crate::keyframe::Keyframe;
use crate::vm::EvaluationVm;
use crate::weights::PerBoneBlendWeights;
use posemix_api_core::{AttributeId, AttributeValue, Transform};

/// Where a blend-two alpha comes from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BlendAlpha {
    Fixed {
        value: f32,
    },
    /// Read a curve from B, falling back to A, then map it.
    Curve {
        name: String,
        #[serde(default)]
        scale_bias_clamp: ScaleBiasClamp,
    },
}

impl fmt::Display for BlendAlpha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlendAlpha::Fixed { value } => write!(f, "{value:.4}"),
            BlendAlpha::Curve { name, .. } => write!(f, "curve:{name}"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlendTwoTask {
    pub alpha: BlendAlpha,
}

impl BlendTwoTask {
    pub fn fixed(alpha: f32) -> Self {
        Self {
            alpha: BlendAlpha::Fixed { value: alpha },
        }
    }

    pub fn from_curve(name: impl Into<String>, scale_bias_clamp: ScaleBiasClamp) -> Self {
        Self {
            alpha: BlendAlpha::Curve {
                name: name.into(),
                scale_bias_clamp,
            },
        }
    }

    fn resolve_alpha(&self, a: &Keyframe, b: &Keyframe) -> f32 {
        let raw = match &self.alpha {
            BlendAlpha::Fixed { value } => *value,
            BlendAlpha::Curve {
                name,
                scale_bias_clamp,
            } => match b.curves.get(name).or_else(|| a.curves.get(name)) {
                Some(value) => scale_bias_clamp.apply(value),
                None => {
                    log::warn!("BlendTwo: alpha curve '{name}' missing on both operands");
                    0.0
                }
            },
        };
        raw.clamp(0.0, 1.0)
    }

    pub(super) fn execute(&self, vm: &mut EvaluationVm, preserve_root_motion: bool) {
        let Some((a, b)) = pop_pair(vm, "BlendTwo") else {
            return;
        };
        let alpha = self.resolve_alpha(&a, &b);
        if !preserve_root_motion {
            vm.push_keyframe(Keyframe::blend_two(a, b, alpha));
            return;
        }
        let roots_a = RootAttributes::capture(&a.attributes);
        let roots_b = RootAttributes::capture(&b.attributes);
        let mut result = Keyframe::blend_two(a, b, alpha);
        RootAttributes::resolve(&roots_a, &roots_b, alpha, &mut result.attributes);
        vm.push_keyframe(result);
    }
}

/// Root motion attributes of one operand, captured before blending.
struct RootAttributes {
    transform: Option<Transform>,
    authoritative: bool,
    delta: Option<Transform>,
}

impl RootAttributes {
    fn capture(attributes: &AttributeSet) -> Self {
        Self {
            transform: attributes.get_transform(&AttributeId::root_transform()),
            authoritative: attributes
                .get_int(&AttributeId::root_transform_is_authoritative())
                .is_some_and(|v| v != 0),
            delta: attributes.get_transform(&AttributeId::root_motion_delta()),
        }
    }

    fn claims_authority(&self) -> bool {
        self.transform.is_some() && self.authoritative
    }

    fn resolve(a: &Self, b: &Self, alpha: f32, out: &mut AttributeSet) {
        let transform = match (a.transform, b.transform) {
            (Some(ta), _) if a.claims_authority() && !b.claims_authority() => Some(ta),
            (_, Some(tb)) if b.claims_authority() && !a.claims_authority() => Some(tb),
            (Some(ta), None) => Some(ta),
            (None, Some(tb)) => Some(tb),
            (Some(ta), Some(tb)) => Some(Transform::blend(&ta, &tb, alpha)),
            (None, None) => None,
        };
        if let Some(t) = transform {
            out.set(AttributeId::root_transform(), AttributeValue::Transform(t));
        }

        match (a.delta, b.delta) {
            (None, Some(d)) | (Some(d), None) => {
                out.set(AttributeId::root_motion_delta(), AttributeValue::Transform(d));
            }
            _ => {}
        }

        if a.authoritative || b.authoritative {
            out.set(
                AttributeId::root_transform_is_authoritative(),
                AttributeValue::Int(1),
            );
        } else {
            out.remove(&AttributeId::root_transform_is_authoritative());
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlendPerBoneTask {
    pub weights: Arc<PerBoneBlendWeights>,
    /// Overall multiplier on every per-entry weight.
    pub blend_weight: f32,
}

impl BlendPerBoneTask {
    pub(super) fn execute(&self, vm: &mut EvaluationVm) {
        let Some((a, b)) = pop_pair(vm, "BlendPerBone") else {
            return;
        };
        vm.push_keyframe(Keyframe::blend_per_bone(
            a,
            &b,
            &self.weights,
            self.blend_weight,
        ));
    }
}

pub(super) fn overwrite_with_scale(vm: &mut EvaluationVm, scale: f32) {
    let Some(mut top) = vm.pop_keyframe() else {
        log::warn!("OverwriteWithScale: no keyframe on the stack");
        return;
    };
    top.scale_by(scale);
    vm.push_keyframe(top);
}

pub(super) fn add_with_scale(vm: &mut EvaluationVm, scale: f32) {
    let Some((second, mut top)) = pop_pair(vm, "AddWithScale") else {
        return;
    };
    top.accumulate(&second, scale);
    vm.push_keyframe(top);
}

pub(super) fn accumulate_absolute_blend(vm: &mut EvaluationVm, scale: f32) {
    let Some((mut running, top)) = pop_pair(vm, "AccumulateAbsoluteBlend") else {
        return;
    };
    running.accumulate(&top, scale);
    vm.push_keyframe(running);
}

pub(super) fn apply_additive(vm: &mut EvaluationVm, alpha: f32) {
    let Some((mut base, additive)) = pop_pair(vm, "ApplyAdditive") else {
        return;
    };
    base.apply_additive(&additive, alpha);
    vm.push_keyframe(base);
}

pub(super) fn normalize_rotations(vm: &mut EvaluationVm) {
    let Some(mut top) = vm.pop_keyframe() else {
        log::warn!("NormalizeRotations: no keyframe on the stack");
        return;
    };
    top.normalize_rotations();
    vm.push_keyframe(top);
}
