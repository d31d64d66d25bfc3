use std::ops::Mul;

use super::Vec3;

/// Row-major 3x3 rotation matrix.
///
/// Multiplication is non-commutative; the composed camera matrix is
/// built as Z * Y * X so yaw is applied before pitch in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub m11: f32,
    pub m12: f32,
    pub m13: f32,
    pub m21: f32,
    pub m22: f32,
    pub m23: f32,
    pub m31: f32,
    pub m32: f32,
    pub m33: f32,
}

impl Rotation {
    pub fn from_euler(rotation: Vec3) -> Self {
        let sx = rotation.x.sin();
        let sy = rotation.y.sin();
        let sz = rotation.z.sin();
        let cx = rotation.x.cos();
        let cy = rotation.y.cos();
        let cz = rotation.z.cos();

        let r_x = Self {
            m11: 1.0, m12: 0.0, m13: 0.0,
            m21: 0.0, m22: cx, m23: -sx,
            m31: 0.0, m32: sx, m33: cx,
        };
        let r_y = Self {
            m11: cy, m12: 0.0, m13: sy,
            m21: 0.0, m22: 1.0, m23: 0.0,
            m31: -sy, m32: 0.0, m33: cy,
        };
        let r_z = Self {
            m11: cz, m12: -sz, m13: 0.0,
            m21: sz, m22: cz, m23: 0.0,
            m31: 0.0, m32: 0.0, m33: 1.0,
        };

        r_z * r_y * r_x
    }
}

impl Mul for Rotation {
    type Output = Self;

    fn mul(self, rm: Self) -> Self::Output {
        Self {
            m11: self.m11 * rm.m11 + self.m12 * rm.m21 + self.m13 * rm.m31,
            m12: self.m11 * rm.m12 + self.m12 * rm.m22 + self.m13 * rm.m32,
            m13: self.m11 * rm.m13 + self.m12 * rm.m23 + self.m13 * rm.m33,
            m21: self.m21 * rm.m11 + self.m22 * rm.m21 + self.m23 * rm.m31,
            m22: self.m21 * rm.m12 + self.m22 * rm.m22 + self.m23 * rm.m32,
            m23: self.m21 * rm.m13 + self.m22 * rm.m23 + self.m23 * rm.m33,
            m31: self.m31 * rm.m11 + self.m32 * rm.m21 + self.m33 * rm.m31,
            m32: self.m31 * rm.m12 + self.m32 * rm.m22 + self.m33 * rm.m32,
            m33: self.m31 * rm.m13 + self.m32 * rm.m23 + self.m33 * rm.m33,
        }
    }
}

impl Mul<Vec3> for Rotation {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Vec3 {
        Vec3 {
            x: self.m11 * v.x + self.m12 * v.y + self.m13 * v.z,
            y: self.m21 * v.x + self.m22 * v.y + self.m23 * v.z,
            z: self.m31 * v.x + self.m32 * v.y + self.m33 * v.z,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub fn from_axis_angle(angle: f32, xi: f32, yj: f32, zk: f32) -> Self {
        let sa = (angle / 2.0).sin();

        Self {
            w: (angle / 2.0).cos(),
            x: xi * sa,
            y: yj * sa,
            z: zk * sa,
        }
    }

    pub fn to_rotation_matrix(self) -> Rotation {
        let Self { w, x, y, z } = self;

        Rotation {
            m11: 1.0 - 2.0 * y * y - 2.0 * z * z,
            m12: 2.0 * x * y - 2.0 * z * w,
            m13: 2.0 * x * z + 2.0 * y * w,
            m21: 2.0 * x * y + 2.0 * z * w,
            m22: 1.0 - 2.0 * x * x - 2.0 * z * z,
            m23: 2.0 * y * z - 2.0 * x * w,
            m31: 2.0 * x * z - 2.0 * y * w,
            m32: 2.0 * y * z + 2.0 * x * w,
            m33: 1.0 - 2.0 * x * x - 2.0 * y * y,
        }
    }
}

impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, q2: Self) -> Self::Output {
        Self {
            w: self.w * q2.w - self.x * q2.x - self.y * q2.y - self.z * q2.z,
            x: self.w * q2.x + self.x * q2.w + self.y * q2.z - self.z * q2.y,
            y: self.w * q2.y - self.x * q2.z + self.y * q2.w + self.z * q2.x,
            z: self.w * q2.z + self.x * q2.y - self.y * q2.x + self.z * q2.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::PI;

    fn assert_vec_near(a: Vec3, b: Vec3) {
        assert!((a.x - b.x).abs() < 1e-4, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-4, "{a:?} != {b:?}");
        assert!((a.z - b.z).abs() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn quarter_turn_around_y() {
        let m = Rotation::from_euler(Vec3::new(0.0, PI / 2.0, 0.0));

        assert_vec_near(m * Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn euler_rotation_followed_by_inverse_restores_vector() {
        let v = Vec3::new(1.5, -2.0, 0.75);
        let forward = Rotation::from_euler(Vec3::new(0.3, -1.1, 0.6));
        // The inverse of a rotation matrix is its transpose.
        let inverse = Rotation {
            m11: forward.m11, m12: forward.m21, m13: forward.m31,
            m21: forward.m12, m22: forward.m22, m23: forward.m32,
            m31: forward.m13, m32: forward.m23, m33: forward.m33,
        };

        assert_vec_near(inverse * (forward * v), v);
    }

    #[test]
    fn axis_angle_matches_euler_for_single_axis() {
        let angle = 0.8;
        let from_quat = Quaternion::from_axis_angle(angle, 0.0, 1.0, 0.0).to_rotation_matrix();
        let from_euler = Rotation::from_euler(Vec3::new(0.0, angle, 0.0));
        let v = Vec3::new(0.2, 1.0, -3.0);

        assert_vec_near(from_quat * v, from_euler * v);
    }
}
