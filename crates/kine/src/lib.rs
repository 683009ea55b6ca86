//! kine: rigid body simulation engine.
//!
//! This is the umbrella crate that provides the `Simulator` and re-exports
//! core types from sub-crates. The library boundary is four operations:
//! [`load_model`], [`make_state`], [`step`] and dropping the values they
//! return.

pub mod dynamics;
pub mod simulation;
pub mod solver;

pub use kine_contact::{self, Contact, ContactMaterial};
pub use kine_math::{self, Vec3};
pub use kine_mjcf::{self, MjcfError};
pub use kine_model::{
    self, Actuator, Geometry, Integrator, Joint, JointType, Model, ModelBuilder, State,
};
pub use kine_rigid::{self, aba, aba_with_external_forces, crba, forward_kinematics, rnea};

pub use simulation::{Simulation, Simulator};
pub use solver::{Rk4Solver, SemiImplicitEulerSolver, Solver};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to turn a model file into a [`Model`]; its `Display` is the diagnostic.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: MjcfError,
}

/// Load a model from an MJCF file.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let model = kine_mjcf::load_file(path).map_err(|source| LoadError {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        nbody = model.nbody(),
        nv = model.nv,
        "model loaded"
    );
    Ok(model)
}

/// Allocate simulation state for a model.
pub fn make_state(model: &Model) -> State {
    State::new(model)
}

/// Advance `state` by one timestep with the model's integrator.
pub fn step(model: &Model, state: &mut State) {
    match model.opt.integrator {
        Integrator::Euler => SemiImplicitEulerSolver::default().step(model, state),
        Integrator::Rk4 => Rk4Solver::default().step(model, state),
    }
}
