//! Recursive Newton-Euler Algorithm (RNEA): inverse dynamics.
//!
//! Given (q, v, qdd), compute the required generalized forces tau.

use crate::kinematics::{link_coords, link_dofs, link_subspace, tree_transforms};
use kine_math::{DVec, SpatialVec, Vec3};
use kine_model::{Model, State};

/// Run RNEA: compute inverse dynamics forces.
///
/// Given state (q, v) and desired accelerations `qdd`, returns the forces needed.
pub fn rnea(model: &Model, state: &State, qdd: &DVec) -> DVec {
    let nl = model.nlinks();
    let mut tau = DVec::zeros(model.nv);

    let x_tree = tree_transforms(model, &state.q);
    let mut vel = vec![SpatialVec::zero(); nl];
    let mut acc = vec![SpatialVec::zero(); nl];

    let a0 = SpatialVec::new(Vec3::zeros(), -model.opt.gravity);

    // ── Forward pass: velocities and accelerations ──
    for (i, link) in model.links.iter().enumerate() {
        let s_i = link_subspace(model, link);
        let vj = SpatialVec::from_vec6(&s_i * link_coords(model, link, &state.v));
        let aj = SpatialVec::from_vec6(&s_i * link_coords(model, link, qdd));

        match link.parent {
            None => {
                vel[i] = vj;
                acc[i] = x_tree[i].apply_motion(&a0) + aj;
            }
            Some(p) => {
                vel[i] = x_tree[i].apply_motion(&vel[p]) + vj;
                acc[i] = x_tree[i].apply_motion(&acc[p]) + vel[i].cross_motion(&vj) + aj;
            }
        }
    }

    // ── Backward pass: forces ──
    let mut forces: Vec<SpatialVec> = model
        .links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let ia = link.inertia.to_matrix();
            ia.mul_vec(&acc[i]) + vel[i].cross_force(&ia.mul_vec(&vel[i]))
        })
        .collect();

    for (i, link) in model.links.iter().enumerate().rev() {
        let (offset, n) = link_dofs(model, link);
        if n > 0 {
            let s_i = link_subspace(model, link);
            tau.rows_mut(offset, n)
                .copy_from(&(s_i.transpose() * forces[i].data));
        }
        if let Some(p) = link.parent {
            let f_parent = x_tree[i].inv_apply_force(&forces[i]);
            forces[p] += f_parent;
        }
    }

    tau
}
