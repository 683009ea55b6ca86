//! Composite Rigid Body Algorithm (CRBA): mass matrix computation.

use crate::kinematics::{link_dofs, link_subspace, tree_transforms};
use kine_math::{DMat, Mat6, Mat6X};
use kine_model::{Model, State};

/// Compute the joint-space mass matrix M(q) using CRBA.
///
/// Returns an nv × nv symmetric positive-definite matrix.
pub fn crba(model: &Model, state: &State) -> DMat {
    let mut mass_matrix = DMat::zeros(model.nv, model.nv);
    let x_tree = tree_transforms(model, &state.q);
    let x_mot: Vec<Mat6> = x_tree.iter().map(|x| x.to_motion_matrix().data).collect();

    // Composite inertias, accumulated leaf to root.
    let mut i_c: Vec<Mat6> = model.links.iter().map(|l| l.inertia.to_matrix().data).collect();
    for (i, link) in model.links.iter().enumerate().rev() {
        if let Some(p) = link.parent {
            let ic_in_parent = x_mot[i].transpose() * i_c[i] * x_mot[i];
            i_c[p] += ic_in_parent;
        }
    }

    for (i, link) in model.links.iter().enumerate() {
        let (v_i, n_i) = link_dofs(model, link);
        if n_i == 0 {
            continue;
        }
        let s_i = link_subspace(model, link);

        // Diagonal block: S_i^T * I_c_i * S_i
        let mut f: Mat6X = i_c[i] * &s_i;
        let diag = s_i.transpose() * &f;
        mass_matrix.view_mut((v_i, v_i), (n_i, n_i)).copy_from(&diag);

        // Off-diagonal blocks: walk up the tree.
        f = x_mot[i].transpose() * f;
        let mut j = link.parent;
        while let Some(ju) = j {
            let link_j = &model.links[ju];
            let (v_j, n_j) = link_dofs(model, link_j);
            if n_j > 0 {
                let block = f.transpose() * link_subspace(model, link_j);
                mass_matrix.view_mut((v_i, v_j), (n_i, n_j)).copy_from(&block);
                mass_matrix
                    .view_mut((v_j, v_i), (n_j, n_i))
                    .copy_from(&block.transpose());
            }
            f = x_mot[ju].transpose() * f;
            j = link_j.parent;
        }
    }

    mass_matrix
}
