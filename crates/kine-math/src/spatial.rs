//! 6D spatial algebra after Featherstone, "Rigid Body Dynamics Algorithms".
//!
//! Spatial vectors are ordered `[angular; linear]`: a motion vector is
//! `[ω; v]`, a force vector is `[n; f]`.

use crate::{Mat3, Mat6, Vec3, Vec6, skew};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A motion or force vector; which one is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialVec {
    pub data: Vec6,
}

impl SpatialVec {
    #[inline]
    pub fn new(angular: Vec3, linear: Vec3) -> Self {
        let mut data = Vec6::zeros();
        data.fixed_rows_mut::<3>(0).copy_from(&angular);
        data.fixed_rows_mut::<3>(3).copy_from(&linear);
        Self { data }
    }

    #[inline]
    pub fn from_vec6(data: Vec6) -> Self {
        Self { data }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::from_vec6(Vec6::zeros())
    }

    #[inline]
    pub fn angular(&self) -> Vec3 {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    #[inline]
    pub fn linear(&self) -> Vec3 {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    /// `self ×ₘ m` for a motion vector `m`.
    pub fn cross_motion(&self, m: &SpatialVec) -> SpatialVec {
        let (w, v) = (self.angular(), self.linear());
        let (mw, mv) = (m.angular(), m.linear());
        SpatialVec::new(w.cross(&mw), w.cross(&mv) + v.cross(&mw))
    }

    /// `self ×f f` for a force vector `f`.
    pub fn cross_force(&self, f: &SpatialVec) -> SpatialVec {
        let (w, v) = (self.angular(), self.linear());
        let (n, fl) = (f.angular(), f.linear());
        SpatialVec::new(w.cross(&n) + v.cross(&fl), w.cross(&fl))
    }

    /// Pairing of a motion and a force vector (power).
    #[inline]
    pub fn dot(&self, other: &SpatialVec) -> f64 {
        self.data.dot(&other.data)
    }
}

macro_rules! spatial_vec_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for SpatialVec {
            type Output = SpatialVec;
            #[inline]
            fn $method(self, rhs: SpatialVec) -> SpatialVec {
                SpatialVec::from_vec6(self.data $op rhs.data)
            }
        }
    };
}

spatial_vec_binop!(Add, add, +);
spatial_vec_binop!(Sub, sub, -);

impl AddAssign for SpatialVec {
    #[inline]
    fn add_assign(&mut self, rhs: SpatialVec) {
        self.data += rhs.data;
    }
}

impl Mul<f64> for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn mul(self, s: f64) -> SpatialVec {
        SpatialVec::from_vec6(self.data * s)
    }
}

impl Neg for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn neg(self) -> SpatialVec {
        SpatialVec::from_vec6(-self.data)
    }
}

/// 6×6 operator on spatial vectors, used for articulated inertias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMat {
    pub data: Mat6,
}

impl SpatialMat {
    #[inline]
    pub fn from_mat6(data: Mat6) -> Self {
        Self { data }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::from_mat6(Mat6::zeros())
    }

    #[inline]
    pub fn mul_vec(&self, v: &SpatialVec) -> SpatialVec {
        SpatialVec::from_vec6(self.data * v.data)
    }
}

impl Add for SpatialMat {
    type Output = SpatialMat;
    #[inline]
    fn add(self, rhs: SpatialMat) -> SpatialMat {
        SpatialMat::from_mat6(self.data + rhs.data)
    }
}

/// Plücker transform from a parent frame A to a child frame B.
///
/// `rot` is the coordinate rotation taking A components to B components;
/// `pos` is B's origin in A coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTransform {
    pub rot: Mat3,
    pub pos: Vec3,
}

impl SpatialTransform {
    pub fn new(rot: Mat3, pos: Vec3) -> Self {
        Self { rot, pos }
    }

    pub fn identity() -> Self {
        Self::new(Mat3::identity(), Vec3::zeros())
    }

    pub fn translation(pos: Vec3) -> Self {
        Self::new(Mat3::identity(), pos)
    }

    /// Transform to a child frame at `pos` whose axes, in parent coordinates,
    /// are the columns of `orientation`.
    pub fn from_pose(pos: Vec3, orientation: Mat3) -> Self {
        Self::new(orientation.transpose(), pos)
    }

    /// Matrix form acting on motion vectors:
    ///
    /// ```text
    /// | E       0 |
    /// | -E[p]×  E |
    /// ```
    pub fn to_motion_matrix(&self) -> SpatialMat {
        let mut m = Mat6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rot);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-self.rot * skew(&self.pos)));
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&self.rot);
        SpatialMat::from_mat6(m)
    }

    /// Motion vector in A coordinates re-expressed in B.
    pub fn apply_motion(&self, m: &SpatialVec) -> SpatialVec {
        let w = m.angular();
        SpatialVec::new(self.rot * w, self.rot * (m.linear() - self.pos.cross(&w)))
    }

    /// Force vector in A coordinates re-expressed in B.
    pub fn apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let fl = f.linear();
        SpatialVec::new(self.rot * (f.angular() - self.pos.cross(&fl)), self.rot * fl)
    }

    /// Force vector in B coordinates re-expressed in A (`Xᵀ f`).
    pub fn inv_apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let back = self.rot.transpose();
        let fl = back * f.linear();
        SpatialVec::new(back * f.angular() + self.pos.cross(&fl), fl)
    }

    /// `other` first, then `self`: if `other` is A→B and `self` is B→C, the result is A→C.
    pub fn compose(&self, other: &SpatialTransform) -> SpatialTransform {
        SpatialTransform::new(self.rot * other.rot, other.point_to_parent(&self.pos))
    }

    /// The B→A transform.
    pub fn inverse(&self) -> SpatialTransform {
        SpatialTransform::new(self.rot.transpose(), -(self.rot * self.pos))
    }

    /// Point in B coordinates to A coordinates.
    pub fn point_to_parent(&self, p: &Vec3) -> Vec3 {
        self.pos + self.rot.transpose() * p
    }

    /// Point in A coordinates to B coordinates.
    pub fn point_to_child(&self, p: &Vec3) -> Vec3 {
        self.rot * (p - self.pos)
    }
}

/// Rigid body inertia: mass, centre of mass and rotational inertia about the
/// centre of mass, all in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInertia {
    pub mass: f64,
    pub com: Vec3,
    /// Symmetric 3×3 inertia about `com`.
    pub inertia: Mat3,
}

impl SpatialInertia {
    pub fn new(mass: f64, com: Vec3, inertia: Mat3) -> Self {
        Self { mass, com, inertia }
    }

    pub fn zero() -> Self {
        Self::new(0.0, Vec3::zeros(), Mat3::zeros())
    }

    pub fn point_mass(mass: f64, pos: Vec3) -> Self {
        Self::new(mass, pos, Mat3::zeros())
    }

    /// Solid uniform sphere centred on the origin.
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Vec3::zeros(), Mat3::from_diagonal_element(i))
    }

    /// The same body after rotating it by `orientation` about the frame origin.
    pub fn rotated(&self, orientation: &Mat3) -> Self {
        Self::new(
            self.mass,
            orientation * self.com,
            orientation * self.inertia * orientation.transpose(),
        )
    }

    /// Two bodies in the same frame lumped into one (parallel axis theorem).
    pub fn merge(&self, other: &SpatialInertia) -> SpatialInertia {
        let mass = self.mass + other.mass;
        if mass <= 0.0 {
            return SpatialInertia::zero();
        }
        let com = (self.com * self.mass + other.com * other.mass) / mass;
        let about_com = |part: &SpatialInertia| {
            let d = part.com - com;
            part.inertia + (Mat3::from_diagonal_element(d.norm_squared()) - d * d.transpose()) * part.mass
        };
        SpatialInertia::new(mass, com, about_com(self) + about_com(other))
    }

    /// 6×6 inertia about the frame origin:
    ///
    /// ```text
    /// | I + m[c]×[c]×ᵀ   m[c]× |
    /// | m[c]×ᵀ           m E   |
    /// ```
    pub fn to_matrix(&self) -> SpatialMat {
        let mcx = skew(&self.com) * self.mass;
        let mut mat = Mat6::zeros();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(self.inertia + mcx * skew(&self.com).transpose()));
        mat.fixed_view_mut::<3, 3>(0, 3).copy_from(&mcx);
        mat.fixed_view_mut::<3, 3>(3, 0).copy_from(&mcx.transpose());
        mat.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&Mat3::from_diagonal_element(self.mass));
        SpatialMat::from_mat6(mat)
    }
}
