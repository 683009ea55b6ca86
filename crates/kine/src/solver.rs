//! Time integrators.

use crate::dynamics::accelerations;
use kine_contact::ContactMaterial;
use kine_math::DVec;
use kine_model::{Model, State};
use kine_rigid::{integrate_positions, update_kinematics};

/// Pluggable solver trait.
///
/// Implementations define how to advance the simulation by one timestep.
pub trait Solver {
    /// Advance state by the model timestep. Reads from `state` and writes the result back.
    fn step(&self, model: &Model, state: &mut State);
}

/// Semi-implicit Euler integrator using Featherstone ABA.
#[derive(Debug, Clone, Default)]
pub struct SemiImplicitEulerSolver {
    pub material: ContactMaterial,
}

impl Solver for SemiImplicitEulerSolver {
    fn step(&self, model: &Model, state: &mut State) {
        let dt = model.opt.timestep;
        let qdd = accelerations(model, state, &self.material);

        // Semi-implicit Euler: update velocity first, then position
        state.v += &qdd * dt;
        let v = state.v.clone();
        integrate_positions(model, &mut state.q, &v, dt);
        state.time += dt;

        update_kinematics(model, state);
    }
}

/// 4th-order Runge-Kutta integrator.
///
/// Much better energy conservation than semi-implicit Euler for systems
/// with configuration-dependent mass matrices (e.g., double pendulum).
#[derive(Debug, Clone, Default)]
pub struct Rk4Solver {
    pub material: ContactMaterial,
}

impl Rk4Solver {
    /// Evaluate derivatives: (q, v, ctrl) → (v, qdd).
    fn derivatives(&self, model: &Model, state: &State) -> (DVec, DVec) {
        (state.v.clone(), accelerations(model, state, &self.material))
    }

    /// `state` advanced along (dq, dv) for `h`, positions stepped on the joint manifold.
    fn stage(model: &Model, state: &State, dq: &DVec, dv: &DVec, h: f64) -> State {
        let mut s = state.clone();
        integrate_positions(model, &mut s.q, dq, h);
        s.v += dv * h;
        s
    }
}

impl Solver for Rk4Solver {
    fn step(&self, model: &Model, state: &mut State) {
        let dt = model.opt.timestep;

        let (dq1, dv1) = self.derivatives(model, state);
        let (dq2, dv2) = self.derivatives(model, &Self::stage(model, state, &dq1, &dv1, dt / 2.0));
        let (dq3, dv3) = self.derivatives(model, &Self::stage(model, state, &dq2, &dv2, dt / 2.0));
        let (dq4, dv4) = self.derivatives(model, &Self::stage(model, state, &dq3, &dv3, dt));

        // Combine
        let dq_sum = (&dq1 + &dq2 * 2.0 + &dq3 * 2.0 + &dq4) / 6.0;
        let dv_sum = (&dv1 + &dv2 * 2.0 + &dv3 * 2.0 + &dv4) / 6.0;
        integrate_positions(model, &mut state.q, &dq_sum, dt);
        state.v += dv_sum * dt;
        state.time += dt;

        update_kinematics(model, state);
    }
}
