//! Mechanical energy of the link tree.

use crate::kinematics::forward_kinematics;
use kine_model::{Model, State};

/// Sum over links of `½ vᵀ I v`, with each link's velocity in its own frame.
pub fn kinetic_energy(model: &Model, state: &State) -> f64 {
    let (_, velocities) = forward_kinematics(model, state);
    model
        .links
        .iter()
        .zip(&velocities)
        .map(|(link, v)| 0.5 * v.dot(&link.inertia.to_matrix().mul_vec(v)))
        .sum()
}

/// Gravitational potential `-Σ m gᵀ c`, zero at the world origin.
pub fn potential_energy(model: &Model, state: &State) -> f64 {
    let (x_world, _) = forward_kinematics(model, state);
    model
        .links
        .iter()
        .zip(&x_world)
        .map(|(link, xf)| {
            let com = xf.point_to_parent(&link.inertia.com);
            -link.inertia.mass * model.opt.gravity.dot(&com)
        })
        .sum()
}

pub fn total_energy(model: &Model, state: &State) -> f64 {
    kinetic_energy(model, state) + potential_energy(model, state)
}
