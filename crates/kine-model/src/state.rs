//! Simulation state: dynamic quantities that change each step.

use crate::Model;
use kine_math::{DVec, Mat3, SpatialTransform, Vec3};

/// Mutable simulation state.
#[derive(Debug, Clone)]
pub struct State {
    /// Generalized positions (nq).
    pub q: DVec,
    /// Generalized velocities (nv).
    pub v: DVec,
    /// Actuator controls (nu).
    pub ctrl: DVec,
    /// Simulation time.
    pub time: f64,

    // Cached quantities, recomputed from q by forward kinematics.
    /// World-to-link transforms, one per link.
    pub link_xform: Vec<SpatialTransform>,
    /// Body positions in world frame (index 0 = world).
    pub xpos: Vec<Vec3>,
    /// Body orientations in world frame (body axes as columns).
    pub xmat: Vec<Mat3>,
}

impl State {
    /// State at the model's reference configuration, at rest, at time zero.
    pub fn new(model: &Model) -> Self {
        let mut state = Self {
            q: model.qpos0.clone(),
            v: DVec::zeros(model.nv),
            ctrl: DVec::zeros(model.nu()),
            time: 0.0,
            link_xform: model.link_xform0.clone(),
            xpos: vec![Vec3::zeros(); model.nbody()],
            xmat: vec![Mat3::identity(); model.nbody()],
        };
        state.update_body_poses(model);
        state
    }

    /// Refresh `xpos` and `xmat` from `link_xform`.
    pub fn update_body_poses(&mut self, model: &Model) {
        for (b, body) in model.bodies.iter().enumerate() {
            if let Some(l) = body.link {
                let x = &self.link_xform[l];
                self.xpos[b] = x.pos;
                self.xmat[b] = x.rot.transpose();
            }
        }
    }

    /// Reset positions, velocities and controls to the reference configuration.
    pub fn reset(&mut self, model: &Model) {
        *self = Self::new(model);
    }

    /// Body position in world frame.
    pub fn body_pos(&self, body: usize) -> Vec3 {
        self.xpos[body]
    }

    /// Whether every position and velocity entry is finite.
    pub fn is_finite(&self) -> bool {
        self.q.iter().chain(self.v.iter()).all(|x| x.is_finite())
    }
}
