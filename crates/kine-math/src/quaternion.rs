//! Rotation quaternions in MuJoCo's `[w, x, y, z]` layout.

use crate::{Mat3, Vec3};
use nalgebra as na;

/// A rotation quaternion; `w` is the scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub v: Vec3,
}

impl Quat {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            w,
            v: Vec3::new(x, y, z),
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Read `[w, x, y, z]`, the layout of MJCF `quat` attributes and of `State::q`.
    pub fn from_wxyz(q: &[f64]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }

    pub fn to_wxyz(&self) -> [f64; 4] {
        [self.w, self.v.x, self.v.y, self.v.z]
    }

    /// Rotation by `angle` radians about the unit vector `axis`.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self { w: c, v: *axis * s }
    }

    /// Intrinsic X-Y-Z Euler angles (rotate about x, then the new y, then the new z).
    pub fn from_euler_xyz(angles: &Vec3) -> Self {
        [Vec3::x(), Vec3::y(), Vec3::z()]
            .iter()
            .zip(angles.iter())
            .fold(Self::identity(), |q, (axis, &a)| q.mul(&Self::from_axis_angle(axis, a)))
    }

    /// Shortest rotation taking direction `from` onto direction `to`.
    pub fn from_two_vectors(from: &Vec3, to: &Vec3) -> Self {
        let a = from.normalize();
        let b = to.normalize();
        let d = a.dot(&b);
        if d < -1.0 + 1e-12 {
            // Opposite directions: half turn about anything orthogonal to `a`.
            let mut axis = Vec3::x().cross(&a);
            if axis.norm_squared() < 1e-12 {
                axis = Vec3::y().cross(&a);
            }
            return Self::from_axis_angle(&axis.normalize(), std::f64::consts::PI);
        }
        Self {
            w: 1.0 + d,
            v: a.cross(&b),
        }
        .normalize()
    }

    /// Unit-length copy; a degenerate quaternion becomes the identity.
    pub fn normalize(&self) -> Self {
        let norm = (self.w * self.w + self.v.norm_squared()).sqrt();
        if norm < 1e-12 {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            v: self.v / norm,
        }
    }

    /// Hamilton product `self * other`: apply `other` first.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.v.dot(&other.v),
            v: self.v.cross(&other.v) + other.v * self.w + self.v * other.w,
        }
    }

    pub fn rotate(&self, p: &Vec3) -> Vec3 {
        let t = self.v.cross(p) * 2.0;
        p + t * self.w + self.v.cross(&t)
    }

    fn to_unit(self) -> na::UnitQuaternion<f64> {
        na::UnitQuaternion::new_normalize(na::Quaternion::new(self.w, self.v.x, self.v.y, self.v.z))
    }

    /// Rotation matrix whose columns are the rotated frame's axes.
    pub fn to_matrix(&self) -> Mat3 {
        self.to_unit().to_rotation_matrix().into_inner()
    }

    /// Quaternion of a proper rotation matrix.
    pub fn from_matrix(m: &Mat3) -> Quat {
        let q = na::UnitQuaternion::from_rotation_matrix(&na::Rotation3::from_matrix_unchecked(*m));
        Quat::new(q.w, q.i, q.j, q.k)
    }

    /// Exponential map of a rotation vector (axis times angle).
    pub fn exp(w: &Vec3) -> Quat {
        let theta = w.norm();
        if theta < 1e-12 {
            return Quat { w: 1.0, v: *w * 0.5 }.normalize();
        }
        Self::from_axis_angle(&(*w / theta), theta)
    }

    /// Orientation after spinning at body-frame rate `omega_local` for `dt`.
    pub fn integrate(&self, omega_local: &Vec3, dt: f64) -> Quat {
        self.mul(&Self::exp(&(*omega_local * dt))).normalize()
    }
}
