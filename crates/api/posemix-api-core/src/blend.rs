//! Blending utilities for the array-backed math types.
//! - f32 linear interpolation for scalars and vector components
//! - quaternion slerp (shortest-arc) and nlerp
//! - weighted accumulation helpers used by the scale/add keyframe operators

use crate::quat::{self, Quat, IDENTITY};
use crate::tolerance::is_nearly_zero;

/// Linear interpolation for f32
#[inline]
pub fn lerp_f(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Lerp for fixed-size arrays
#[inline]
pub fn lerp_array<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    let mut out = [0.0f32; N];
    for i in 0..N {
        out[i] = lerp_f(a[i], b[i], t);
    }
    out
}

/// Component-wise `a * s`.
#[inline]
pub fn scale_array<const N: usize>(a: &[f32; N], s: f32) -> [f32; N] {
    let mut out = *a;
    for v in out.iter_mut() {
        *v *= s;
    }
    out
}

/// Component-wise `acc += b * s`.
#[inline]
pub fn accumulate_array<const N: usize>(acc: &mut [f32; N], b: &[f32; N], s: f32) {
    for i in 0..N {
        acc[i] += b[i] * s;
    }
}

/// Normalize a quaternion represented as [x,y,z,w]. A zero quaternion becomes identity.
#[inline]
pub fn normalize_quat(q: Quat) -> Quat {
    let mag = quat::dot(q, q).sqrt();
    if is_nearly_zero(mag) {
        IDENTITY
    } else {
        [q[0] / mag, q[1] / mag, q[2] / mag, q[3] / mag]
    }
}

/// Slerp between two quaternions along the shortest arc.
pub fn slerp(q1: Quat, q2: Quat, t: f32) -> Quat {
    let qa = normalize_quat(q1);
    let mut qb = normalize_quat(q2);

    let mut dot = quat::dot(qa, qb);

    // Flip one side so slerp takes the short path.
    if dot < 0.0 {
        qb = quat::negate(qb);
        dot = -dot;
    }

    // Nearly parallel: fall back to normalized lerp.
    const DOT_THRESHOLD: f32 = 0.9995;
    if dot > DOT_THRESHOLD {
        return normalize_quat(lerp_array(&qa, &qb, t));
    }

    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * t;
    let sin_theta = theta.sin();
    let sin_theta_0 = theta_0.sin();

    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;

    [
        s0 * qa[0] + s1 * qb[0],
        s0 * qa[1] + s1 * qb[1],
        s0 * qa[2] + s1 * qb[2],
        s0 * qa[3] + s1 * qb[3],
    ]
}

/// Quaternion NLERP with shortest-arc correction. Returns a normalized quaternion.
#[inline]
pub fn nlerp(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if quat::dot(a, b) < 0.0 { quat::negate(b) } else { b };
    normalize_quat(lerp_array(&a, &b, t))
}

/// `acc += q * s`, flipping `q` first when it lies in the opposite hemisphere of `acc`.
/// The result is not normalized.
#[inline]
pub fn accumulate_quat_shortest(acc: &mut Quat, q: Quat, s: f32) {
    let s = if quat::dot(*acc, q) < 0.0 { -s } else { s };
    accumulate_array(acc, &q, s);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) {
        assert!((a - b).abs() <= 1e-5, "left={a} right={b}");
    }

    #[test]
    fn lerp_scalars_and_arrays() {
        approx(lerp_f(0.0, 2.0, 0.25), 0.5);
        assert_eq!(lerp_array(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0], 0.5), [0.5, 1.0, 1.5]);
    }

    #[test]
    fn slerp_halfway_about_z() {
        let a = IDENTITY;
        let half = std::f32::consts::FRAC_1_SQRT_2;
        // 90 degrees about Z
        let b = [0.0, 0.0, half, half];
        let r = slerp(a, b, 0.5);
        let expected = (std::f32::consts::PI / 8.0).sin();
        approx(r[2], expected);
        approx(quat::dot(r, r), 1.0);
    }

    #[test]
    fn slerp_takes_short_path() {
        let a = IDENTITY;
        let b = quat::negate(IDENTITY);
        let r = slerp(a, b, 0.5);
        approx(r[3].abs(), 1.0);
    }

    #[test]
    fn accumulate_shortest_flips_opposite_hemisphere() {
        let mut acc = [0.0, 0.0, 0.0, 0.5];
        accumulate_quat_shortest(&mut acc, [0.0, 0.0, 0.0, -1.0], 0.5);
        approx(acc[3], 1.0);
    }

    #[test]
    fn normalize_zero_is_identity() {
        assert_eq!(normalize_quat([0.0; 4]), IDENTITY);
    }
}
