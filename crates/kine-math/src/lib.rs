//! Math layer shared by every kine crate.
//!
//! Motion and force vectors are stored `[angular; linear]`. Transforms map
//! parent coordinates to child coordinates.

pub mod quaternion;
pub mod spatial;

pub use quaternion::Quat;
pub use spatial::{SpatialInertia, SpatialMat, SpatialTransform, SpatialVec};

use nalgebra as na;

pub type Vec3 = na::Vector3<f64>;
pub type Mat3 = na::Matrix3<f64>;

/// Raw storage behind [`SpatialVec`] and [`SpatialMat`].
pub type Vec6 = na::Vector6<f64>;
pub type Mat6 = na::Matrix6<f64>;

/// Joint motion subspace, one column per degree of freedom.
pub type Mat6X = na::Matrix6xX<f64>;

/// Generalized coordinates, velocities and forces (length `nq` or `nv`).
pub type DVec = na::DVector<f64>;
/// Joint-space matrices such as the `nv × nv` mass matrix.
pub type DMat = na::DMatrix<f64>;

/// Magnitude of the default MJCF gravity, which points along -z.
pub const GRAVITY: f64 = 9.81;

/// The matrix `[v]×` with `[v]× w == v × w`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    v.cross_matrix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_skew_is_cross_product() {
        let v = Vec3::new(0.5, -1.0, 2.0);
        let w = Vec3::new(3.0, 0.25, -0.75);
        assert_relative_eq!(skew(&v) * w, v.cross(&w), epsilon = 1e-12);
        assert_relative_eq!(skew(&v).transpose(), -skew(&v), epsilon = 1e-12);
    }
}
