//! Position integration on the configuration manifold.

use kine_math::DVec;
use kine_model::Model;

/// Advance positions `q` by velocities `v` over `dt`, joint by joint.
///
/// Ball and free joints keep unit quaternions.
pub fn integrate_positions(model: &Model, q: &mut DVec, v: &DVec, dt: f64) {
    for joint in &model.joints {
        let qs = &mut q.as_mut_slice()[joint.q_offset..joint.q_offset + joint.nq()];
        let vs = &v.as_slice()[joint.v_offset..joint.v_offset + joint.nv()];
        joint.integrate_position(qs, vs, dt);
    }
}
