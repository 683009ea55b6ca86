//! Featherstone articulated rigid body dynamics.
//!
//! Implements:
//! - Forward kinematics
//! - Articulated Body Algorithm (ABA) for forward dynamics
//! - Recursive Newton-Euler Algorithm (RNEA) for inverse dynamics
//! - Composite Rigid Body Algorithm (CRBA) for the mass matrix
//! - Kinetic and potential energy
//! - Quaternion-aware position integration
//!
//! All algorithms run over the model's link tree, where each joint owns one
//! link and multi-DOF joints use 6 × n motion subspaces.

pub mod aba;
pub mod crba;
pub mod energy;
pub mod integrate;
pub mod kinematics;
pub mod rnea;

pub use aba::{aba, aba_with_external_forces};
pub use crba::crba;
pub use energy::{kinetic_energy, potential_energy, total_energy};
pub use integrate::integrate_positions;
pub use kinematics::{forward_kinematics, update_kinematics};
pub use rnea::rnea;
