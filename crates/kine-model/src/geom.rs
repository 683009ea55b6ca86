//! Collision and visual geometry attached to bodies.

use kine_math::{Mat3, Quat, SpatialInertia, Vec3};
use std::f64::consts::PI;

/// Geometric primitive. Sizes follow MJCF conventions (radii and half-lengths).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere { radius: f64 },
    /// Cylinder with hemispherical caps along the local Z axis.
    Capsule { radius: f64, half_length: f64 },
    Box { half_extents: Vec3 },
    /// Cylinder along the local Z axis.
    Cylinder { radius: f64, half_length: f64 },
    Ellipsoid { radii: Vec3 },
    /// Infinite plane through the geom origin with normal along local +Z.
    Plane,
}

impl Geometry {
    /// Volume of the solid (zero for planes).
    pub fn volume(&self) -> f64 {
        match self {
            Geometry::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            Geometry::Capsule {
                radius,
                half_length,
            } => PI * radius * radius * 2.0 * half_length + 4.0 / 3.0 * PI * radius.powi(3),
            Geometry::Box { half_extents: e } => 8.0 * e.x * e.y * e.z,
            Geometry::Cylinder {
                radius,
                half_length,
            } => PI * radius * radius * 2.0 * half_length,
            Geometry::Ellipsoid { radii } => 4.0 / 3.0 * PI * radii.x * radii.y * radii.z,
            Geometry::Plane => 0.0,
        }
    }

    /// Rotational inertia about the geometric center, in local axes, for a solid
    /// of uniform density and total mass `mass`.
    pub fn inertia(&self, mass: f64) -> Mat3 {
        let diag = match self {
            Geometry::Sphere { radius } => {
                let i = 2.0 / 5.0 * mass * radius * radius;
                Vec3::new(i, i, i)
            }
            Geometry::Capsule {
                radius,
                half_length,
            } => {
                let (r, h) = (*radius, *half_length);
                let v_cyl = PI * r * r * 2.0 * h;
                let v_sph = 4.0 / 3.0 * PI * r.powi(3);
                let m_cyl = mass * v_cyl / (v_cyl + v_sph);
                let m_sph = mass - m_cyl;
                let axial = m_cyl * r * r / 2.0 + m_sph * 2.0 / 5.0 * r * r;
                let transverse = m_cyl * (3.0 * r * r + 4.0 * h * h) / 12.0
                    + m_sph * (2.0 / 5.0 * r * r + h * h + 0.75 * h * r);
                Vec3::new(transverse, transverse, axial)
            }
            Geometry::Box { half_extents: e } => {
                let (a, b, c) = (e.x * e.x, e.y * e.y, e.z * e.z);
                Vec3::new(b + c, a + c, a + b) * (mass / 3.0)
            }
            Geometry::Cylinder {
                radius,
                half_length,
            } => {
                let (r, h) = (*radius, *half_length);
                let transverse = mass * (3.0 * r * r + 4.0 * h * h) / 12.0;
                Vec3::new(transverse, transverse, mass * r * r / 2.0)
            }
            Geometry::Ellipsoid { radii: e } => {
                let (a, b, c) = (e.x * e.x, e.y * e.y, e.z * e.z);
                Vec3::new(b + c, a + c, a + b) * (mass / 5.0)
            }
            Geometry::Plane => Vec3::zeros(),
        };
        Mat3::from_diagonal(&diag)
    }

    /// Whether this primitive can carry mass.
    pub fn is_solid(&self) -> bool {
        !matches!(self, Geometry::Plane)
    }
}

/// A geometry placed in a body frame.
#[derive(Debug, Clone)]
pub struct Geom {
    /// Geom name (may be empty).
    pub name: String,
    /// Owning body index (0 = world).
    pub body: usize,
    pub geometry: Geometry,
    /// Position in the body frame.
    pub pos: Vec3,
    /// Orientation in the body frame.
    pub quat: Quat,
    /// Sliding friction coefficient.
    pub friction: f64,
}

impl Geom {
    /// Create a geom at the body origin with default friction.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: String::new(),
            body: 0,
            geometry,
            pos: Vec3::zeros(),
            quat: Quat::identity(),
            friction: 1.0,
        }
    }

    /// Set the name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the placement within the body frame.
    pub fn at(mut self, pos: Vec3, quat: Quat) -> Self {
        self.pos = pos;
        self.quat = quat;
        self
    }

    /// Spatial inertia of this geom in its body frame for the given mass.
    pub fn body_inertia(&self, mass: f64) -> SpatialInertia {
        let local = SpatialInertia::new(mass, Vec3::zeros(), self.geometry.inertia(mass));
        let rotated = local.rotated(&self.quat.to_matrix());
        SpatialInertia::new(mass, self.pos, rotated.inertia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_volume_and_inertia() {
        let g = Geometry::Box {
            half_extents: Vec3::new(0.1, 0.1, 0.1),
        };
        assert_relative_eq!(g.volume(), 0.008, epsilon = 1e-12);
        // Solid cube of side 0.2: I = m s² / 6.
        let i = g.inertia(8.0);
        assert_relative_eq!(i[(0, 0)], 8.0 * 0.04 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(i[(2, 2)], 8.0 * 0.04 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_reduces_to_sphere() {
        let capsule = Geometry::Capsule {
            radius: 0.2,
            half_length: 0.0,
        };
        let sphere = Geometry::Sphere { radius: 0.2 };
        assert_relative_eq!(capsule.volume(), sphere.volume(), epsilon = 1e-12);
        assert_relative_eq!(capsule.inertia(2.0), sphere.inertia(2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_plane_is_not_solid() {
        assert!(!Geometry::Plane.is_solid());
        assert_relative_eq!(Geometry::Plane.volume(), 0.0);
    }

    #[test]
    fn test_offset_geom_inertia() {
        let geom = Geom::new(Geometry::Sphere { radius: 0.1 })
            .at(Vec3::new(0.0, 0.0, 0.5), Quat::identity());
        let si = geom.body_inertia(1.0);
        assert_relative_eq!(si.com, Vec3::new(0.0, 0.0, 0.5));
        assert_relative_eq!(si.inertia[(0, 0)], 0.004, epsilon = 1e-12);
    }
}
