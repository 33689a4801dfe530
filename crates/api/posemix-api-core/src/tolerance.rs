//! Numeric tolerances used across blending and mixing.

/// Coarse tolerance for weight comparisons.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// Fine tolerance for magnitudes (quaternion length, divisors).
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Blend weights at or below this are treated as zero.
pub const ZERO_ANIM_WEIGHT_THRESH: f32 = 1.0e-5;

#[inline]
pub fn is_nearly_zero(v: f32) -> bool {
    v.abs() <= SMALL_NUMBER
}

#[inline]
pub fn is_nearly_equal(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}

/// True when a blend weight contributes to the blend.
#[inline]
pub fn is_relevant_weight(w: f32) -> bool {
    w > ZERO_ANIM_WEIGHT_THRESH
}

/// True when a blend weight is effectively 1.
#[inline]
pub fn is_full_weight(w: f32) -> bool {
    w >= 1.0 - ZERO_ANIM_WEIGHT_THRESH
}
