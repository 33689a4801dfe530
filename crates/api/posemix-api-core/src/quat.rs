//! Quaternion and vector helpers on plain arrays.
//! Quaternions are stored as (x, y, z, w).

/// Quaternion (x, y, z, w)
pub type Quat = [f32; 4];
pub type Vec3 = [f32; 3];

pub const IDENTITY: Quat = [0.0, 0.0, 0.0, 1.0];

#[inline]
pub fn dot(a: Quat, b: Quat) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub fn negate(q: Quat) -> Quat {
    [-q[0], -q[1], -q[2], -q[3]]
}

#[inline]
pub fn conjugate(q: Quat) -> Quat {
    [-q[0], -q[1], -q[2], q[3]]
}

/// Hamilton product `a * b`; applying the result rotates by `b` first, then `a`.
#[inline]
pub fn mul(a: Quat, b: Quat) -> Quat {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

/// Inverse of a unit quaternion.
#[inline]
pub fn inverse(q: Quat) -> Quat {
    conjugate(q)
}

#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Rotate `v` by the unit quaternion `q`.
#[inline]
pub fn rotate(q: Quat, v: Vec3) -> Vec3 {
    let u = [q[0], q[1], q[2]];
    let w = q[3];
    let c = cross(u, v);
    let t = [2.0 * c[0], 2.0 * c[1], 2.0 * c[2]];
    let ut = cross(u, t);
    [
        v[0] + w * t[0] + ut[0],
        v[1] + w * t[1] + ut[1],
        v[2] + w * t[2] + ut[2],
    ]
}

/// Quaternion from a (normalized) axis and an angle in radians.
pub fn from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    let (s, c) = (angle * 0.5).sin_cos();
    [axis[0] * s, axis[1] * s, axis[2] * s, c]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx3(a: Vec3, b: Vec3) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() <= 1e-5, "left={a:?} right={b:?}");
        }
    }

    #[test]
    fn rotate_x_axis_about_z() {
        let q = from_axis_angle([0.0, 0.0, 1.0], std::f32::consts::FRAC_PI_2);
        approx3(rotate(q, [1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn mul_with_inverse_is_identity() {
        let q = from_axis_angle([0.0, 1.0, 0.0], 0.7);
        let r = mul(q, inverse(q));
        assert!((r[3] - 1.0).abs() <= 1e-6);
    }
}
