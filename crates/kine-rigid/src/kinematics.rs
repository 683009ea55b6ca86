//! Forward kinematics: link transforms, body poses and link velocities.

use kine_math::{DVec, Mat6X, SpatialTransform, SpatialVec};
use kine_model::{Link, Model, State};

/// Motion subspace of a link (6 × 0 for welded links).
pub fn link_subspace(model: &Model, link: &Link) -> Mat6X {
    match link.joint {
        Some(j) => model.joints[j].motion_subspace(),
        None => Mat6X::zeros(0),
    }
}

/// Velocity offset and DOF count of a link.
pub fn link_dofs(model: &Model, link: &Link) -> (usize, usize) {
    match link.joint {
        Some(j) => (model.joints[j].v_offset, model.joints[j].nv()),
        None => (0, 0),
    }
}

/// Slice of a generalized vector belonging to a link (empty for welded links).
pub fn link_coords(model: &Model, link: &Link, x: &DVec) -> DVec {
    let (offset, n) = link_dofs(model, link);
    x.rows(offset, n).into_owned()
}

/// Parent-to-link transforms for configuration `q`, one per link.
pub fn tree_transforms(model: &Model, q: &DVec) -> Vec<SpatialTransform> {
    model
        .links
        .iter()
        .map(|link| {
            model
                .link_joint_transform(link, q.as_slice())
                .compose(&link.tree)
        })
        .collect()
}

/// Compute forward kinematics: link transforms and spatial velocities.
///
/// Returns (world-to-link transforms, velocities in link frame).
pub fn forward_kinematics(
    model: &Model,
    state: &State,
) -> (Vec<SpatialTransform>, Vec<SpatialVec>) {
    let x_tree = tree_transforms(model, &state.q);
    let nl = model.nlinks();
    let mut x_world = Vec::with_capacity(nl);
    let mut velocities: Vec<SpatialVec> = Vec::with_capacity(nl);

    for (i, link) in model.links.iter().enumerate() {
        let vj = match link.joint {
            Some(j) => {
                let joint = &model.joints[j];
                joint.velocity(&state.v.as_slice()[joint.v_offset..joint.v_offset + joint.nv()])
            }
            None => SpatialVec::zero(),
        };

        match link.parent {
            None => {
                x_world.push(x_tree[i]);
                velocities.push(vj);
            }
            Some(p) => {
                // world -> link = (parent -> link) after (world -> parent)
                x_world.push(x_tree[i].compose(&x_world[p]));
                velocities.push(x_tree[i].apply_motion(&velocities[p]) + vj);
            }
        }
    }

    (x_world, velocities)
}

/// Recompute the cached link transforms and body poses of `state` from `state.q`.
pub fn update_kinematics(model: &Model, state: &mut State) {
    let (x_world, _) = forward_kinematics(model, state);
    state.link_xform = x_world;
    state.update_body_poses(model);
}
