//! Attribute identifiers and typed attribute values carried by keyframes.

use serde::{Deserialize, Serialize};

use crate::blend::lerp_f;
use crate::transform::Transform;

/// Namespace for attributes that are attached to a bone.
pub const BONE_NAMESPACE: &str = "bone";

/// Attribute holding the resolved root transform.
pub const ROOT_TRANSFORM: &str = "RootTransform";
/// Integer flag (0/1) marking the root transform as authoritative.
pub const ROOT_TRANSFORM_IS_AUTHORITATIVE: &str = "RootTransformIsAuthoritative";
/// Attribute holding this frame's root motion delta.
pub const ROOT_MOTION_DELTA: &str = "RootMotionDelta";

/// Sentinel used when an attribute is not tied to a bone.
pub const INDEX_NONE: i32 = -1;

/// Attribute key: (name, associated bone index) plus a textual namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId {
    pub name: String,
    pub bone_index: i32,
    pub namespace: String,
}

impl AttributeId {
    pub fn new(name: impl Into<String>, bone_index: i32, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bone_index,
            namespace: namespace.into(),
        }
    }

    /// Attribute attached to a bone in the `bone` namespace.
    pub fn bone(name: impl Into<String>, bone_index: i32) -> Self {
        Self::new(name, bone_index, BONE_NAMESPACE)
    }

    pub fn root_transform() -> Self {
        Self::bone(ROOT_TRANSFORM, 0)
    }

    pub fn root_transform_is_authoritative() -> Self {
        Self::bone(ROOT_TRANSFORM_IS_AUTHORITATIVE, 0)
    }

    pub fn root_motion_delta() -> Self {
        Self::bone(ROOT_MOTION_DELTA, 0)
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttributeKind {
    Transform,
    Float,
    Int,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum AttributeValue {
    Transform(Transform),
    Float(f32),
    /// Step-only integer value (no blending)
    Int(i32),
}

impl AttributeValue {
    #[inline]
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Transform(_) => AttributeKind::Transform,
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::Int(_) => AttributeKind::Int,
        }
    }

    /// Neutral value of a kind, used when only one side of a blend carries the attribute.
    pub fn identity(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::Transform => AttributeValue::Transform(Transform::IDENTITY),
            AttributeKind::Float => AttributeValue::Float(0.0),
            AttributeKind::Int => AttributeValue::Int(0),
        }
    }

    pub fn as_transform(&self) -> Option<&Transform> {
        match self {
            AttributeValue::Transform(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpolate two values. Mismatched kinds and integers step at `t >= 0.5`.
    pub fn blend(a: &AttributeValue, b: &AttributeValue, t: f32) -> AttributeValue {
        match (a, b) {
            (AttributeValue::Transform(ta), AttributeValue::Transform(tb)) => {
                AttributeValue::Transform(Transform::blend(ta, tb, t))
            }
            (AttributeValue::Float(fa), AttributeValue::Float(fb)) => {
                AttributeValue::Float(lerp_f(*fa, *fb, t))
            }
            _ => {
                if t < 0.5 {
                    a.clone()
                } else {
                    b.clone()
                }
            }
        }
    }

    /// Multiply by `w`; integers are left untouched.
    pub fn scale_by(&mut self, w: f32) {
        match self {
            AttributeValue::Transform(t) => t.scale_by(w),
            AttributeValue::Float(f) => *f *= w,
            AttributeValue::Int(_) => {}
        }
    }

    /// `self += other * w`; integers keep the existing value.
    pub fn accumulate(&mut self, other: &AttributeValue, w: f32) {
        match (self, other) {
            (AttributeValue::Transform(acc), AttributeValue::Transform(t)) => acc.accumulate(t, w),
            (AttributeValue::Float(acc), AttributeValue::Float(f)) => *acc += f * w,
            _ => {}
        }
    }

    pub fn normalize(&mut self) {
        if let AttributeValue::Transform(t) = self {
            t.normalize_rotation();
        }
    }
}
