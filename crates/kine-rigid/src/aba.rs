//! Articulated Body Algorithm (ABA): O(n) forward dynamics.
//!
//! Given (q, v, tau), compute qdd (joint accelerations).
//! Three passes over the link tree:
//! 1. Forward pass: compute velocities, bias terms
//! 2. Backward pass: compute articulated inertias, bias forces
//! 3. Forward pass: compute accelerations

use crate::kinematics::{link_coords, link_dofs, link_subspace, tree_transforms};
use kine_math::{DMat, DVec, Mat6, Mat6X, SpatialMat, SpatialVec, Vec3, Vec6};
use kine_model::{Model, State};

/// Run the Articulated Body Algorithm with generalized forces `tau`.
///
/// Returns generalized accelerations `qdd` of dimension `model.nv`.
pub fn aba(model: &Model, state: &State, tau: &DVec) -> DVec {
    aba_with_external_forces(model, state, tau, None)
}

/// ABA with optional external spatial forces, one per link, in link coordinates.
pub fn aba_with_external_forces(
    model: &Model,
    state: &State,
    tau: &DVec,
    external_forces: Option<&[SpatialVec]>,
) -> DVec {
    let nl = model.nlinks();
    let mut qdd = DVec::zeros(model.nv);

    let x_tree = tree_transforms(model, &state.q);
    let subspaces: Vec<Mat6X> = model.links.iter().map(|l| link_subspace(model, l)).collect();

    let mut vel = vec![SpatialVec::zero(); nl];
    let mut c_bias = vec![SpatialVec::zero(); nl];
    let mut p_a = vec![SpatialVec::zero(); nl];
    let mut i_a = vec![SpatialMat::zero(); nl];

    // Gravity enters as an upward acceleration of the world.
    let a0 = SpatialVec::new(Vec3::zeros(), -model.opt.gravity);

    // ── Pass 1: Forward - velocities and bias ──
    for (i, link) in model.links.iter().enumerate() {
        let qd = link_coords(model, link, &state.v);
        let vj = SpatialVec::from_vec6(&subspaces[i] * &qd);

        match link.parent {
            None => vel[i] = vj,
            Some(p) => {
                vel[i] = x_tree[i].apply_motion(&vel[p]) + vj;
                c_bias[i] = vel[i].cross_motion(&vj);
            }
        }

        i_a[i] = link.inertia.to_matrix();
        p_a[i] = vel[i].cross_force(&i_a[i].mul_vec(&vel[i]));
        if let Some(f_ext) = external_forces {
            p_a[i] = p_a[i] - f_ext[i];
        }
    }

    // ── Pass 2: Backward - articulated inertias and forces ──
    let mut u_mat: Vec<Mat6X> = vec![Mat6X::zeros(0); nl];
    let mut d_inv: Vec<DMat> = vec![DMat::zeros(0, 0); nl];
    let mut u_vec: Vec<DVec> = vec![DVec::zeros(0); nl];

    for (i, link) in model.links.iter().enumerate().rev() {
        let s = &subspaces[i];
        let ia = i_a[i].data;

        let mut ia_art = ia;
        let mut pa = p_a[i].data + ia * c_bias[i].data;

        if s.ncols() > 0 {
            let u = ia * s;
            let d = s.transpose() * &u;
            let tau_i = link_coords(model, link, tau);
            let u_i = tau_i - s.transpose() * p_a[i].data;

            // Singular joint inertia (massless subtree): joint stays put.
            if let Some(di) = d.try_inverse() {
                let u_dinv = &u * &di;
                let ia_reduced: Mat6 = ia - &u_dinv * u.transpose();
                pa = p_a[i].data + ia_reduced * c_bias[i].data + &u_dinv * &u_i;
                ia_art = ia_reduced;
                d_inv[i] = di;
            }
            u_mat[i] = u;
            u_vec[i] = u_i;
        }

        if let Some(p) = link.parent {
            // Transform articulated inertia to parent frame: I_parent = X^T I X
            let x_mot = x_tree[i].to_motion_matrix().data;
            let ia_parent = x_mot.transpose() * ia_art * x_mot;
            i_a[p] = i_a[p] + SpatialMat::from_mat6(ia_parent);
            p_a[p] = p_a[p] + x_tree[i].inv_apply_force(&SpatialVec::from_vec6(pa));
        }
    }

    // ── Pass 3: Forward - accelerations ──
    let mut acc = vec![SpatialVec::zero(); nl];

    for (i, link) in model.links.iter().enumerate() {
        let a_parent = match link.parent {
            None => x_tree[i].apply_motion(&a0),
            Some(p) => x_tree[i].apply_motion(&acc[p]),
        };
        let a_prime: Vec6 = (a_parent + c_bias[i]).data;

        let (offset, n) = link_dofs(model, link);
        if n == 0 || d_inv[i].nrows() != n {
            acc[i] = SpatialVec::from_vec6(a_prime);
            continue;
        }

        let qdd_i = &d_inv[i] * (&u_vec[i] - u_mat[i].transpose() * a_prime);
        qdd.rows_mut(offset, n).copy_from(&qdd_i);
        acc[i] = SpatialVec::from_vec6(a_prime + &subspaces[i] * &qdd_i);
    }

    qdd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kine_math::{GRAVITY, Mat3, Quat, SpatialInertia};
    use kine_model::{Joint, ModelBuilder};

    fn rod(mass: f64, length: f64) -> SpatialInertia {
        let i = mass * length * length / 12.0;
        SpatialInertia::new(
            mass,
            Vec3::new(0.0, 0.0, -length / 2.0),
            Mat3::from_diagonal(&Vec3::new(i, i, 0.0)),
        )
    }

    fn make_double_pendulum() -> Model {
        ModelBuilder::new()
            .timestep(0.001)
            .add_hinge_body("link1", 0, Vec3::zeros(), Vec3::y(), rod(1.0, 1.0))
            .add_hinge_body("link2", 1, Vec3::new(0.0, 0.0, -1.0), Vec3::y(), rod(1.0, 1.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_double_pendulum_equilibrium() {
        let model = make_double_pendulum();
        let state = model.default_state();
        let qdd = aba(&model, &state, &DVec::zeros(model.nv));
        assert!(qdd[0].abs() < 1e-10, "qdd[0] = {} at equilibrium", qdd[0]);
        assert!(qdd[1].abs() < 1e-10, "qdd[1] = {} at equilibrium", qdd[1]);
    }

    #[test]
    fn test_single_pendulum_aba() {
        // Rod hangs along -z; at q = π/2 about y it points along -x.
        let (mass, length) = (1.0, 1.0);
        let model = ModelBuilder::new()
            .add_hinge_body("rod", 0, Vec3::zeros(), Vec3::y(), rod(mass, length))
            .build()
            .unwrap();
        let mut state = model.default_state();
        state.q[0] = std::f64::consts::FRAC_PI_2;

        let qdd = aba(&model, &state, &DVec::zeros(1));

        let i_total = mass * length * length / 3.0;
        let expected = -(mass * GRAVITY * length / 2.0) / i_total;
        assert_relative_eq!(qdd[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_applied_torque_balances_gravity() {
        let model = ModelBuilder::new()
            .add_hinge_body("rod", 0, Vec3::zeros(), Vec3::y(), rod(2.0, 1.0))
            .build()
            .unwrap();
        let mut state = model.default_state();
        state.q[0] = std::f64::consts::FRAC_PI_2;
        // Gravity torque is -m g L/2 about y; cancel it.
        let tau = DVec::from_vec(vec![2.0 * GRAVITY * 0.5]);
        let qdd = aba(&model, &state, &tau);
        assert_relative_eq!(qdd[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_free_fall() {
        let model = ModelBuilder::new()
            .add_free_body("ball", 0, Vec3::new(0.0, 0.0, 1.0), SpatialInertia::sphere(1.0, 0.1))
            .build()
            .unwrap();
        let state = model.default_state();
        let qdd = aba(&model, &state, &DVec::zeros(6));
        assert_relative_eq!(qdd[5], -GRAVITY, epsilon = 1e-12);
        assert_relative_eq!(qdd.rows(0, 5).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_free_fall_in_rotated_frame() {
        // Body pitched 90° about y: world -z is body +x.
        let pitch = Quat::from_axis_angle(&Vec3::y(), std::f64::consts::FRAC_PI_2);
        let model = ModelBuilder::new()
            .add_body("box", 0, Vec3::zeros(), pitch, SpatialInertia::sphere(1.0, 0.1))
            .add_joint(1, Joint::free())
            .build()
            .unwrap();
        let state = model.default_state();
        let qdd = aba(&model, &state, &DVec::zeros(6));
        assert_relative_eq!(qdd[3], GRAVITY, epsilon = 1e-12);
        assert_relative_eq!(qdd[5], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_external_force_cancels_gravity() {
        let model = ModelBuilder::new()
            .add_free_body("ball", 0, Vec3::zeros(), SpatialInertia::sphere(3.0, 0.1))
            .build()
            .unwrap();
        let state = model.default_state();
        let lift = [SpatialVec::new(Vec3::zeros(), Vec3::new(0.0, 0.0, 3.0 * GRAVITY))];
        let qdd = aba_with_external_forces(&model, &state, &DVec::zeros(6), Some(&lift));
        assert_relative_eq!(qdd.norm(), 0.0, epsilon = 1e-12);
    }
}
