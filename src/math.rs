//! Math primitives.
//!
//! The scalar type is fixed to `f64` at compile time; vectors and matrices are
//! the double-precision `glam` types. `Matrix4` is column-major.

pub use glam::{DMat4 as Matrix4, DVec2 as Vector2, DVec3 as Vector3, DVec4 as Vector4};

/// Scalar type used by every geometric quantity in the crate.
pub type Real = f64;

/// Default tolerance for the "attribute is unset" test.
pub const EPSILON: Real = 1e-6;

/// Sentinel test: a vector whose components are all within `epsilon` of zero
/// is treated as "unset".
pub trait NearZero {
    fn is_near_zero(&self, epsilon: Real) -> bool;
}

impl NearZero for Vector3 {
    fn is_near_zero(&self, epsilon: Real) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon && self.z.abs() < epsilon
    }
}

impl NearZero for Vector2 {
    fn is_near_zero(&self, epsilon: Real) -> bool {
        self.x.abs() < epsilon && self.y.abs() < epsilon
    }
}

/// Whether two scalars differ by less than `epsilon`.
pub fn approximately_equal(a: Real, b: Real, epsilon: Real) -> bool {
    (a - b).abs() < epsilon
}

/// Apply the full transform to a point, including the perspective divide.
///
/// When `|w|` is not larger than machine epsilon the un-divided result is
/// returned instead.
pub fn transform_point(m: &Matrix4, point: Vector3) -> Vector3 {
    let p = *m * point.extend(1.0);
    if p.w.abs() > Real::EPSILON {
        p.truncate() / p.w
    } else {
        p.truncate()
    }
}

/// Apply only the linear (upper 3x3) part of the transform.
pub fn transform_vector(m: &Matrix4, vector: Vector3) -> Vector3 {
    m.transform_vector3(vector)
}

pub fn translation(offset: Vector3) -> Matrix4 {
    Matrix4::from_translation(offset)
}

pub fn scaling(scale: Vector3) -> Matrix4 {
    Matrix4::from_scale(scale)
}

pub fn uniform_scaling(scale: Real) -> Matrix4 {
    Matrix4::from_scale(Vector3::splat(scale))
}

pub fn rotation_x(angle_radians: Real) -> Matrix4 {
    Matrix4::from_rotation_x(angle_radians)
}

pub fn rotation_y(angle_radians: Real) -> Matrix4 {
    Matrix4::from_rotation_y(angle_radians)
}

pub fn rotation_z(angle_radians: Real) -> Matrix4 {
    Matrix4::from_rotation_z(angle_radians)
}

/// Rotation about an arbitrary axis. The axis is normalised first; a zero
/// axis degenerates to `cos(angle)` on the diagonal.
pub fn rotation_axis(axis: Vector3, angle_radians: Real) -> Matrix4 {
    let axis = axis.normalize_or_zero();
    let (sin_a, cos_a) = angle_radians.sin_cos();
    let t = 1.0 - cos_a;
    let Vector3 { x, y, z } = axis;

    Matrix4::from_cols(
        Vector4::new(cos_a + x * x * t, x * y * t + z * sin_a, x * z * t - y * sin_a, 0.0),
        Vector4::new(y * x * t - z * sin_a, cos_a + y * y * t, y * z * t + x * sin_a, 0.0),
        Vector4::new(z * x * t + y * sin_a, z * y * t - x * sin_a, cos_a + z * z * t, 0.0),
        Vector4::W,
    )
}

/// Right-handed view matrix looking from `eye` towards `target`.
///
/// Degenerate inputs (eye == target, up parallel to the view direction)
/// produce zero rows rather than NaNs.
pub fn look_at(eye: Vector3, target: Vector3, up: Vector3) -> Matrix4 {
    let forward = (target - eye).normalize_or_zero();
    let right = forward.cross(up).normalize_or_zero();
    let new_up = right.cross(forward);

    Matrix4::from_cols(
        Vector4::new(right.x, new_up.x, -forward.x, 0.0),
        Vector4::new(right.y, new_up.y, -forward.y, 0.0),
        Vector4::new(right.z, new_up.z, -forward.z, 0.0),
        Vector4::new(-right.dot(eye), -new_up.dot(eye), forward.dot(eye), 1.0),
    )
}

/// Perspective projection into OpenGL clip space (z in [-1, 1]).
pub fn perspective(fov_y_radians: Real, aspect_ratio: Real, near: Real, far: Real) -> Matrix4 {
    Matrix4::perspective_rh_gl(fov_y_radians, aspect_ratio, near, far)
}

/// Orthographic projection into OpenGL clip space (z in [-1, 1]).
pub fn orthographic(
    left: Real,
    right: Real,
    bottom: Real,
    top: Real,
    near: Real,
    far: Real,
) -> Matrix4 {
    Matrix4::orthographic_rh_gl(left, right, bottom, top, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_eq(a: Vector3, b: Vector3) {
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        assert_abs_diff_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn vector_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vector3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
        assert_abs_diff_eq!(a.dot(b), 32.0);
        assert_eq!(a.cross(b), Vector3::new(-3.0, 6.0, -3.0));
        assert_abs_diff_eq!(a.length(), 14.0_f64.sqrt());
    }

    #[test]
    fn normalize_zero_vector_is_zero() {
        assert_eq!(Vector3::ZERO.normalize_or_zero(), Vector3::ZERO);
        assert_eq!(Vector2::ZERO.normalize_or_zero(), Vector2::ZERO);
        let n = Vector2::new(3.0, 4.0).normalize_or_zero();
        assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn near_zero_sentinel() {
        assert!(Vector3::ZERO.is_near_zero(EPSILON));
        assert!(Vector3::new(1e-7, -1e-7, 0.0).is_near_zero(EPSILON));
        assert!(!Vector3::new(0.0, 0.0, 1e-3).is_near_zero(EPSILON));
        assert!(Vector2::new(0.0, 5e-7).is_near_zero(EPSILON));
        assert!(!Vector2::new(0.5, 0.0).is_near_zero(EPSILON));
    }

    #[test]
    fn translation_moves_points_not_vectors() {
        let m = translation(Vector3::new(1.0, 2.0, 3.0));
        assert_vec_eq(transform_point(&m, Vector3::ZERO), Vector3::new(1.0, 2.0, 3.0));
        assert_vec_eq(transform_vector(&m, Vector3::X), Vector3::X);
    }

    #[test]
    fn scaling_and_rotation() {
        let s = scaling(Vector3::new(2.0, 3.0, 4.0));
        assert_vec_eq(transform_point(&s, Vector3::ONE), Vector3::new(2.0, 3.0, 4.0));

        let r = rotation_z(FRAC_PI_2);
        assert_vec_eq(transform_vector(&r, Vector3::X), Vector3::Y);

        let r = rotation_x(FRAC_PI_2);
        assert_vec_eq(transform_vector(&r, Vector3::Y), Vector3::Z);

        let r = rotation_y(FRAC_PI_2);
        assert_vec_eq(transform_vector(&r, Vector3::Z), Vector3::X);
    }

    #[test]
    fn rotation_axis_matches_glam() {
        let axis = Vector3::new(1.0, 2.0, -0.5);
        let ours = rotation_axis(axis, 0.7);
        let theirs = Matrix4::from_axis_angle(axis.normalize(), 0.7);
        assert!(ours.abs_diff_eq(theirs, 1e-12));
    }

    #[test]
    fn rotation_axis_zero_axis_does_not_produce_nan() {
        let m = rotation_axis(Vector3::ZERO, 1.0);
        assert!(m.is_finite());
    }

    #[test]
    fn look_at_matches_right_handed_view() {
        let eye = Vector3::new(3.0, 4.0, 5.0);
        let target = Vector3::new(0.0, 1.0, 0.0);
        let ours = look_at(eye, target, Vector3::Y);
        let theirs = Matrix4::look_at_rh(eye, target, Vector3::Y);
        assert!(ours.abs_diff_eq(theirs, 1e-12));
        assert_vec_eq(transform_point(&ours, eye), Vector3::ZERO);
    }

    #[test]
    fn look_at_degenerate_is_finite() {
        let m = look_at(Vector3::ONE, Vector3::ONE, Vector3::Y);
        assert!(m.is_finite());
    }

    #[test]
    fn perspective_maps_near_plane_to_minus_one() {
        let m = perspective(FRAC_PI_2, 1.0, 0.1, 100.0);
        let p = transform_point(&m, Vector3::new(0.0, 0.0, -0.1));
        assert_abs_diff_eq!(p.z, -1.0, epsilon = 1e-9);
        let p = transform_point(&m, Vector3::new(0.0, 0.0, -100.0));
        assert_abs_diff_eq!(p.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn orthographic_maps_box_to_clip_cube() {
        let m = orthographic(-2.0, 2.0, -1.0, 1.0, 0.5, 10.0);
        assert_vec_eq(
            transform_point(&m, Vector3::new(2.0, 1.0, -10.0)),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert_vec_eq(
            transform_point(&m, Vector3::new(-2.0, -1.0, -0.5)),
            Vector3::new(-1.0, -1.0, -1.0),
        );
    }

    #[test]
    fn transform_point_skips_divide_when_w_vanishes() {
        let mut m = Matrix4::IDENTITY;
        m.w_axis.w = 0.0;
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_vec_eq(transform_point(&m, p), p);
    }

    #[test]
    fn matrix_arithmetic() {
        let a = translation(Vector3::X);
        let b = translation(Vector3::Y);
        let ab = a * b;
        assert_vec_eq(transform_point(&ab, Vector3::ZERO), Vector3::new(1.0, 1.0, 0.0));

        let doubled = Matrix4::IDENTITY * 2.0;
        assert_abs_diff_eq!(doubled.x_axis.x, 2.0);
        let sum = Matrix4::IDENTITY + Matrix4::IDENTITY;
        assert!(sum.abs_diff_eq(doubled, 1e-12));
        let diff = sum - Matrix4::IDENTITY;
        assert!(diff.abs_diff_eq(Matrix4::IDENTITY, 1e-12));
    }

    #[test]
    fn approximate_equality() {
        assert!(approximately_equal(1.0, 1.0 + 1e-9, EPSILON));
        assert!(!approximately_equal(1.0, 1.1, EPSILON));
    }
}
