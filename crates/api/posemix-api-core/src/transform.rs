//! Translation/rotation/scale transform used for bone poses and transform attributes.

use serde::{Deserialize, Serialize};

use crate::blend::{accumulate_array, accumulate_quat_shortest, lerp_array, normalize_quat, scale_array, slerp};
use crate::quat::{self, Quat, Vec3, IDENTITY};
use crate::tolerance::SMALL_NUMBER;

/// Transform split into TRS for blending/decomposition.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    /// Quaternion (x, y, z, w)
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: [0.0; 3],
        rotation: IDENTITY,
        scale: [1.0; 3],
    };

    /// Baseline for additive poses: scale is stored as a delta, so its neutral value is zero.
    pub const ADDITIVE_IDENTITY: Transform = Transform {
        translation: [0.0; 3],
        rotation: IDENTITY,
        scale: [0.0; 3],
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn identity_for(additive: bool) -> Self {
        if additive {
            Self::ADDITIVE_IDENTITY
        } else {
            Self::IDENTITY
        }
    }

    /// Interpolate `a -> b`: translation/scale linear, rotation spherical.
    pub fn blend(a: &Transform, b: &Transform, t: f32) -> Transform {
        Transform {
            translation: lerp_array(&a.translation, &b.translation, t),
            rotation: slerp(a.rotation, b.rotation, t),
            scale: lerp_array(&a.scale, &b.scale, t),
        }
    }

    /// Multiply every channel by `w`. Rotation is left unnormalized.
    pub fn scale_by(&mut self, w: f32) {
        self.translation = scale_array(&self.translation, w);
        self.rotation = scale_array(&self.rotation, w);
        self.scale = scale_array(&self.scale, w);
    }

    /// `self += other * w` per channel, rotation accumulated along the shortest arc.
    pub fn accumulate(&mut self, other: &Transform, w: f32) {
        accumulate_array(&mut self.translation, &other.translation, w);
        accumulate_quat_shortest(&mut self.rotation, other.rotation, w);
        accumulate_array(&mut self.scale, &other.scale, w);
    }

    pub fn normalize_rotation(&mut self) {
        self.rotation = normalize_quat(self.rotation);
    }

    pub fn is_rotation_normalized(&self) -> bool {
        (quat::dot(self.rotation, self.rotation) - 1.0).abs() <= 1.0e-4
    }

    /// Apply an additive (delta) transform on top of `self` with weight `w`.
    pub fn apply_additive(&mut self, additive: &Transform, w: f32) {
        let delta_rotation = slerp(IDENTITY, additive.rotation, w);
        self.rotation = normalize_quat(quat::mul(delta_rotation, self.rotation));
        accumulate_array(&mut self.translation, &additive.translation, w);
        for i in 0..3 {
            self.scale[i] *= 1.0 + additive.scale[i] * w;
        }
    }

    /// Compose: `self` expressed relative to `parent`, returned in `parent`'s space.
    pub fn mul(&self, parent: &Transform) -> Transform {
        let scaled = [
            self.translation[0] * parent.scale[0],
            self.translation[1] * parent.scale[1],
            self.translation[2] * parent.scale[2],
        ];
        let rotated = quat::rotate(parent.rotation, scaled);
        Transform {
            translation: [
                rotated[0] + parent.translation[0],
                rotated[1] + parent.translation[1],
                rotated[2] + parent.translation[2],
            ],
            rotation: normalize_quat(quat::mul(parent.rotation, self.rotation)),
            scale: [
                self.scale[0] * parent.scale[0],
                self.scale[1] * parent.scale[1],
                self.scale[2] * parent.scale[2],
            ],
        }
    }

    pub fn inverse(&self) -> Transform {
        let inv_scale = self.scale.map(|s| if s.abs() <= SMALL_NUMBER { 0.0 } else { 1.0 / s });
        let inv_rotation = quat::inverse(normalize_quat(self.rotation));
        let scaled = [
            -self.translation[0] * inv_scale[0],
            -self.translation[1] * inv_scale[1],
            -self.translation[2] * inv_scale[2],
        ];
        Transform {
            translation: quat::rotate(inv_rotation, scaled),
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// `self` expressed relative to `other`, so that `result.mul(other) == self`.
    pub fn relative_to(&self, other: &Transform) -> Transform {
        self.mul(&other.inverse())
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        Transform::from_translation(p).mul(self).translation
    }

    /// Rotation-aware closeness test (q and -q are equal rotations).
    pub fn nearly_equal(&self, other: &Transform, tolerance: f32) -> bool {
        let close3 = |a: &Vec3, b: &Vec3| (0..3).all(|i| (a[i] - b[i]).abs() <= tolerance);
        close3(&self.translation, &other.translation)
            && close3(&self.scale, &other.scale)
            && (quat::dot(self.rotation, other.rotation).abs() - 1.0).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        let a = Transform::from_translation([1.0, 0.0, 0.0]);
        let b = Transform::from_translation([3.0, 2.0, 0.0]);
        let mid = Transform::blend(&a, &b, 0.5);
        assert_eq!(mid.translation, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn mul_then_inverse_roundtrips() {
        let parent = Transform::new(
            [1.0, 2.0, 3.0],
            quat::from_axis_angle([0.0, 0.0, 1.0], 0.5),
            [1.0, 1.0, 1.0],
        );
        let child = Transform::from_translation([0.5, 0.0, 0.0]);
        let world = child.mul(&parent);
        let back = world.relative_to(&parent);
        assert!(back.nearly_equal(&child, 1e-5));
    }

    #[test]
    fn additive_identity_is_noop() {
        let mut base = Transform::new(
            [1.0, 0.0, 0.0],
            quat::from_axis_angle([1.0, 0.0, 0.0], 0.3),
            [2.0, 2.0, 2.0],
        );
        let before = base;
        base.apply_additive(&Transform::ADDITIVE_IDENTITY, 1.0);
        assert!(base.nearly_equal(&before, 1e-6));
    }

    #[test]
    fn scale_then_accumulate_weighted_average() {
        let a = Transform::from_translation([2.0, 0.0, 0.0]);
        let b = Transform::from_translation([4.0, 0.0, 0.0]);
        let mut acc = a;
        acc.scale_by(0.5);
        acc.accumulate(&b, 0.5);
        acc.normalize_rotation();
        assert_eq!(acc.translation, [3.0, 0.0, 0.0]);
        assert!(acc.is_rotation_normalized());
    }
}
