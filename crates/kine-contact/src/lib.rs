//! Ground contact for the kine physics engine.
//!
//! Geoms of moving bodies collide with plane geoms attached to the world.
//! Contacts are soft: a mass-normalised spring-damper along the plane normal
//! plus Coulomb friction clipped to what the damper could remove in one step.

pub mod material;
pub mod solver;

pub use material::ContactMaterial;
pub use solver::{candidate_points, contact_forces, find_contacts, geom_pose};

use kine_math::Vec3;

/// A point of a body geom below a world plane.
#[derive(Debug, Clone)]
pub struct Contact {
    /// Index of the body geom.
    pub geom: usize,
    /// Index of the plane geom.
    pub plane: usize,
    /// Body owning `geom`.
    pub body: usize,
    /// Link whose frame is the body frame.
    pub link: usize,
    /// Contact point in world coordinates.
    pub point: Vec3,
    /// Plane normal in world coordinates, pointing out of the ground.
    pub normal: Vec3,
    /// Penetration depth (positive when touching).
    pub depth: f64,
    /// Fraction of the body's load this point carries among the points of
    /// its geom touching the same plane.
    pub share: f64,
}
