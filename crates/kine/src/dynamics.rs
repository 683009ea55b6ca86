//! Force assembly and forward dynamics for one evaluation of the equations of motion.

use kine_contact::{ContactMaterial, contact_forces, find_contacts};
use kine_math::{DMat, DVec, SpatialVec};
use kine_model::{Model, State};
use kine_rigid::{aba_with_external_forces, crba, forward_kinematics};

/// Joint damping: `-damping * v` on every degree of freedom of a damped joint.
pub fn passive_forces(model: &Model, state: &State) -> DVec {
    let mut tau = DVec::zeros(model.nv);
    for joint in model.joints.iter().filter(|j| j.damping != 0.0) {
        for k in joint.v_offset..joint.v_offset + joint.nv() {
            tau[k] -= joint.damping * state.v[k];
        }
    }
    tau
}

/// Penalty forces pushing limited hinge and slide joints back into range.
///
/// Each violated limit acts like a one-sided contact on the joint coordinate,
/// with the material gains scaled by the joint's diagonal mass-matrix entry.
pub fn limit_forces(model: &Model, state: &State, material: &ContactMaterial) -> DVec {
    let mut tau = DVec::zeros(model.nv);
    let (k, b) = material.gains(model.opt.timestep);
    let mut mass: Option<DMat> = None;

    for joint in model.joints.iter().filter(|j| j.is_limited()) {
        let Some([lower, upper]) = joint.limits else {
            continue;
        };
        let q = state.q[joint.q_offset];
        let v = state.v[joint.v_offset];
        // Positive depth pushes the coordinate up, negative pushes it down.
        let (depth, sign) = if q < lower {
            (lower - q, 1.0)
        } else if q > upper {
            (q - upper, -1.0)
        } else {
            continue;
        };

        let m = mass.get_or_insert_with(|| crba(model, state));
        let m_eff = m[(joint.v_offset, joint.v_offset)];
        let push = (m_eff * (k * depth - b * sign * v)).max(0.0);
        tau[joint.v_offset] += sign * push;
    }
    tau
}

/// Actuator forces `gear * ctrl`, with `ctrl` clamped to the actuator's range.
pub fn actuator_forces(model: &Model, state: &State) -> DVec {
    let mut tau = DVec::zeros(model.nv);
    for (i, act) in model.actuators.iter().enumerate() {
        let mut ctrl = state.ctrl.get(i).copied().unwrap_or(0.0);
        if let Some([lo, hi]) = act.ctrl_range {
            ctrl = ctrl.clamp(lo, hi);
        }
        tau[model.joints[act.joint].v_offset] += act.gear * ctrl;
    }
    tau
}

/// Generalized forces from damping, joint limits and actuators.
pub fn applied_forces(model: &Model, state: &State, material: &ContactMaterial) -> DVec {
    passive_forces(model, state) + limit_forces(model, state, material) + actuator_forces(model, state)
}

/// Contact forces per link, or `None` when nothing touches.
pub fn contact_loads(
    model: &Model,
    state: &State,
    material: &ContactMaterial,
) -> Option<Vec<SpatialVec>> {
    let (x_world, velocities) = forward_kinematics(model, state);
    let contacts = find_contacts(model, &x_world);
    if contacts.is_empty() {
        return None;
    }
    Some(contact_forces(
        model,
        &contacts,
        &x_world,
        Some(&velocities),
        material,
    ))
}

/// Generalized accelerations at `state` under all applied and contact forces.
pub fn accelerations(model: &Model, state: &State, material: &ContactMaterial) -> DVec {
    let tau = applied_forces(model, state, material);
    let external = contact_loads(model, state, material);
    aba_with_external_forces(model, state, &tau, external.as_deref())
}
