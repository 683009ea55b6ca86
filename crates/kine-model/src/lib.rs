//! Model and state definitions for the kine physics engine.
//!
//! A [`Model`] is the static description of a system (bodies, joints, geoms,
//! actuators, options). A [`State`] holds the quantities that change while
//! simulating it.

pub mod body;
pub mod geom;
pub mod joint;
pub mod model;
pub mod state;

pub use body::{Body, Link};
pub use geom::{Geom, Geometry};
pub use joint::{Joint, JointType};
pub use model::{Actuator, Integrator, Model, ModelBuilder, ModelError, SimOptions};
pub use state::State;
