//! Joint types and definitions.

use kine_math::{Mat3, Mat6X, Quat, SpatialTransform, SpatialVec, Vec3, skew};

/// Joint type enumeration, following MJCF joint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    /// Single rotational DOF about an axis through the anchor.
    Hinge,
    /// Single translational DOF along an axis.
    Slide,
    /// 3 DOF rotation about the anchor; position stored as a quaternion.
    Ball,
    /// 6 DOF floating base; position stored as `[x, y, z, qw, qx, qy, qz]`.
    Free,
}

impl JointType {
    /// Number of position coordinates.
    pub fn nq(self) -> usize {
        match self {
            JointType::Hinge | JointType::Slide => 1,
            JointType::Ball => 4,
            JointType::Free => 7,
        }
    }

    /// Number of velocity coordinates (degrees of freedom).
    pub fn nv(self) -> usize {
        match self {
            JointType::Hinge | JointType::Slide => 1,
            JointType::Ball => 3,
            JointType::Free => 6,
        }
    }
}

/// A joint attaching a body to its parent.
///
/// Axis and anchor are expressed in the frame of the body that owns the joint.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Joint name (empty when unnamed).
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Index of the body this joint moves.
    pub body: usize,
    /// Unit axis for hinge and slide joints.
    pub axis: Vec3,
    /// Point the joint rotates about, in body coordinates.
    pub anchor: Vec3,
    /// Viscous damping coefficient.
    pub damping: f64,
    /// Joint position limits [lower, upper] (None = unlimited).
    pub limits: Option<[f64; 2]>,
    /// Offset of this joint's coordinates in `State::q`.
    pub q_offset: usize,
    /// Offset of this joint's coordinates in `State::v`.
    pub v_offset: usize,
}

impl Joint {
    fn with_type(joint_type: JointType, axis: Vec3) -> Self {
        Self {
            name: String::new(),
            joint_type,
            body: 0,
            axis,
            anchor: Vec3::zeros(),
            damping: 0.0,
            limits: None,
            q_offset: 0,
            v_offset: 0,
        }
    }

    /// Hinge joint about `axis`.
    pub fn hinge(axis: Vec3) -> Self {
        Self::with_type(JointType::Hinge, axis.normalize())
    }

    /// Slide joint along `axis`.
    pub fn slide(axis: Vec3) -> Self {
        Self::with_type(JointType::Slide, axis.normalize())
    }

    /// Ball joint.
    pub fn ball() -> Self {
        Self::with_type(JointType::Ball, Vec3::zeros())
    }

    /// Free joint.
    pub fn free() -> Self {
        Self::with_type(JointType::Free, Vec3::zeros())
    }

    /// Set the name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the rotation anchor (body coordinates).
    pub fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set viscous damping.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set position limits.
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.limits = Some([lower, upper]);
        self
    }

    /// Number of position coordinates.
    pub fn nq(&self) -> usize {
        self.joint_type.nq()
    }

    /// Number of degrees of freedom.
    pub fn nv(&self) -> usize {
        self.joint_type.nv()
    }

    /// Whether the limits apply (only scalar joints are limited).
    pub fn is_limited(&self) -> bool {
        self.limits.is_some() && matches!(self.joint_type, JointType::Hinge | JointType::Slide)
    }

    /// Compute the joint transform for the given joint position slice.
    ///
    /// Returns the Plücker transform from the body's reference frame to its
    /// displaced frame. `q` must hold `nq()` entries.
    pub fn joint_transform(&self, q: &[f64]) -> SpatialTransform {
        match self.joint_type {
            JointType::Hinge => {
                let (s, c) = q[0].sin_cos();
                let ax = skew(&self.axis);
                let rot = Mat3::identity() + ax * s + ax * ax * (1.0 - c);
                self.rotation_about_anchor(rot)
            }
            JointType::Slide => SpatialTransform::translation(self.axis * q[0]),
            JointType::Ball => {
                let rot = Quat::from_wxyz(&q[0..4]).normalize().to_matrix();
                self.rotation_about_anchor(rot)
            }
            JointType::Free => {
                let pos = Vec3::new(q[0], q[1], q[2]);
                let rot = Quat::from_wxyz(&q[3..7]).normalize().to_matrix();
                SpatialTransform::from_pose(pos, rot)
            }
        }
    }

    /// Active rotation `rot` applied about the anchor point.
    fn rotation_about_anchor(&self, rot: Mat3) -> SpatialTransform {
        SpatialTransform::from_pose(self.anchor - rot * self.anchor, rot)
    }

    /// Motion subspace matrix S (6 × nv) in the displaced body frame.
    pub fn motion_subspace(&self) -> Mat6X {
        let a = self.anchor;
        match self.joint_type {
            JointType::Hinge => {
                let s = SpatialVec::new(self.axis, a.cross(&self.axis));
                Mat6X::from_column_slice(s.data.as_slice())
            }
            JointType::Slide => {
                let s = SpatialVec::new(Vec3::zeros(), self.axis);
                Mat6X::from_column_slice(s.data.as_slice())
            }
            JointType::Ball => {
                let mut s = Mat6X::zeros(3);
                s.fixed_view_mut::<3, 3>(0, 0).copy_from(&Mat3::identity());
                s.fixed_view_mut::<3, 3>(3, 0).copy_from(&skew(&a));
                s
            }
            JointType::Free => Mat6X::identity(6),
        }
    }

    /// Joint velocity contribution S * qd.
    pub fn velocity(&self, qd: &[f64]) -> SpatialVec {
        match self.joint_type {
            JointType::Hinge => {
                let w = self.axis * qd[0];
                SpatialVec::new(w, self.anchor.cross(&w))
            }
            JointType::Slide => SpatialVec::new(Vec3::zeros(), self.axis * qd[0]),
            JointType::Ball => {
                let w = Vec3::new(qd[0], qd[1], qd[2]);
                SpatialVec::new(w, self.anchor.cross(&w))
            }
            JointType::Free => SpatialVec::new(
                Vec3::new(qd[0], qd[1], qd[2]),
                Vec3::new(qd[3], qd[4], qd[5]),
            ),
        }
    }

    /// Write the reference configuration of this joint into `q`.
    ///
    /// Free joints start at the body's reference pose relative to its parent.
    pub fn reference_position(&self, q: &mut [f64], body_pos: &Vec3, body_quat: &Quat) {
        match self.joint_type {
            JointType::Hinge | JointType::Slide => q[0] = 0.0,
            JointType::Ball => q[..4].copy_from_slice(&Quat::identity().to_wxyz()),
            JointType::Free => {
                q[..3].copy_from_slice(body_pos.as_slice());
                q[3..7].copy_from_slice(&body_quat.to_wxyz());
            }
        }
    }

    /// Advance this joint's positions by velocity `qd` over `dt`.
    ///
    /// Quaternion blocks are integrated on the rotation group and stay unit length.
    pub fn integrate_position(&self, q: &mut [f64], qd: &[f64], dt: f64) {
        match self.joint_type {
            JointType::Hinge | JointType::Slide => q[0] += qd[0] * dt,
            JointType::Ball => {
                let w = Vec3::new(qd[0], qd[1], qd[2]);
                let next = Quat::from_wxyz(&q[0..4]).integrate(&w, dt);
                q[..4].copy_from_slice(&next.to_wxyz());
            }
            JointType::Free => {
                let quat = Quat::from_wxyz(&q[3..7]).normalize();
                let w = Vec3::new(qd[0], qd[1], qd[2]);
                let v_local = Vec3::new(qd[3], qd[4], qd[5]);
                let dp = quat.rotate(&v_local) * dt;
                q[0] += dp.x;
                q[1] += dp.y;
                q[2] += dp.z;
                let next = quat.integrate(&w, dt);
                q[3..7].copy_from_slice(&next.to_wxyz());
            }
        }
    }
}
