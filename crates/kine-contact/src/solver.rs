//! Contact detection against world planes and force computation.

use crate::Contact;
use crate::material::ContactMaterial;
use kine_math::{Mat3, SpatialTransform, SpatialVec, Vec3};
use kine_model::{Geom, Geometry, Model};

/// World pose (position, orientation) of a geom given world-to-link transforms.
pub fn geom_pose(model: &Model, geom: &Geom, link_xform: &[SpatialTransform]) -> (Vec3, Mat3) {
    let local_rot = geom.quat.normalize().to_matrix();
    match model.bodies[geom.body].link {
        Some(l) => {
            let x = &link_xform[l];
            (x.point_to_parent(&geom.pos), x.rot.transpose() * local_rot)
        }
        None => (geom.pos, local_rot),
    }
}

/// Points of a geom that may touch a plane with unit normal `normal`.
///
/// Everything is in world coordinates; the geom sits at `pos` with
/// orientation `rot`.
pub fn candidate_points(geometry: &Geometry, pos: &Vec3, rot: &Mat3, normal: &Vec3) -> Vec<Vec3> {
    // Plane normal in geom coordinates.
    let n_local = rot.transpose() * normal;
    let to_world = |p: Vec3| pos + rot * p;

    match geometry {
        Geometry::Sphere { radius } => vec![pos - normal * *radius],
        Geometry::Capsule {
            radius,
            half_length,
        } => [1.0, -1.0]
            .iter()
            .map(|s| to_world(Vec3::new(0.0, 0.0, s * half_length)) - normal * *radius)
            .collect(),
        Geometry::Box { half_extents: e } => {
            let mut corners = Vec::with_capacity(8);
            for sx in [-1.0, 1.0] {
                for sy in [-1.0, 1.0] {
                    for sz in [-1.0, 1.0] {
                        corners.push(to_world(Vec3::new(sx * e.x, sy * e.y, sz * e.z)));
                    }
                }
            }
            corners
        }
        Geometry::Cylinder {
            radius,
            half_length,
        } => {
            // Direction within the cap plane pointing most against the normal.
            let radial = Vec3::new(-n_local.x, -n_local.y, 0.0);
            let rims: Vec<Vec3> = if radial.norm() > 1e-6 {
                vec![radial.normalize() * *radius]
            } else {
                // Cap is flat on the plane: support it on four rim points.
                vec![
                    Vec3::new(*radius, 0.0, 0.0),
                    Vec3::new(-*radius, 0.0, 0.0),
                    Vec3::new(0.0, *radius, 0.0),
                    Vec3::new(0.0, -*radius, 0.0),
                ]
            };
            [1.0, -1.0]
                .iter()
                .flat_map(|s| {
                    let cap = Vec3::new(0.0, 0.0, s * half_length);
                    rims.iter().map(move |r| cap + r)
                })
                .map(to_world)
                .collect()
        }
        Geometry::Ellipsoid { radii } => {
            // Support point of the ellipsoid in direction -n.
            let d = -n_local;
            let scaled = radii.component_mul(&d);
            let norm = scaled.norm();
            if norm < 1e-12 {
                return vec![*pos];
            }
            vec![to_world(radii.component_mul(&scaled) / norm)]
        }
        Geometry::Plane => Vec::new(),
    }
}

/// Find contacts between the geoms of moving bodies and world planes.
pub fn find_contacts(model: &Model, link_xform: &[SpatialTransform]) -> Vec<Contact> {
    let planes: Vec<(usize, Vec3, Vec3)> = model
        .geoms
        .iter()
        .enumerate()
        .filter(|(_, g)| g.body == 0 && g.geometry == Geometry::Plane)
        .map(|(i, g)| {
            let (pos, rot) = geom_pose(model, g, link_xform);
            (i, pos, rot * Vec3::z())
        })
        .collect();

    let mut contacts = Vec::new();
    if planes.is_empty() {
        return contacts;
    }

    for (gi, geom) in model.geoms.iter().enumerate() {
        if geom.body == 0 || !geom.geometry.is_solid() {
            continue;
        }
        let Some(link) = model.bodies[geom.body].link else {
            continue;
        };
        let (pos, rot) = geom_pose(model, geom, link_xform);

        for &(pi, origin, normal) in &planes {
            let points = candidate_points(&geom.geometry, &pos, &rot, &normal);
            let touching: Vec<(Vec3, f64)> = points
                .into_iter()
                .map(|p| (p, (origin - p).dot(&normal)))
                .filter(|(_, depth)| *depth > 0.0)
                .collect();
            let share = 1.0 / touching.len().max(1) as f64;
            for (point, depth) in touching {
                contacts.push(Contact {
                    geom: gi,
                    plane: pi,
                    body: geom.body,
                    link,
                    point,
                    normal,
                    depth,
                    share,
                });
            }
        }
    }

    tracing::trace!(ncon = contacts.len(), "plane contacts detected");
    contacts
}

/// Compute contact forces for all contacts.
///
/// `link_velocities` are link-frame spatial velocities from forward kinematics;
/// when absent the contacts act as pure springs. Returns one spatial force per
/// link, in link coordinates.
pub fn contact_forces(
    model: &Model,
    contacts: &[Contact],
    link_xform: &[SpatialTransform],
    link_velocities: Option<&[SpatialVec]>,
    material: &ContactMaterial,
) -> Vec<SpatialVec> {
    let mut forces = vec![SpatialVec::zero(); model.nlinks()];
    let (k, b) = material.gains(model.opt.timestep);

    for contact in contacts {
        let xf = &link_xform[contact.link];
        let p_local = xf.point_to_child(&contact.point);

        let vel_world = match link_velocities {
            Some(vels) => {
                let v = &vels[contact.link];
                xf.rot.transpose() * (v.linear() + v.angular().cross(&p_local))
            }
            None => Vec3::zeros(),
        };

        let mass = model.subtree_mass[contact.body] * contact.share;
        let normal_vel = vel_world.dot(&contact.normal);
        let normal_force = (mass * (k * contact.depth - b * normal_vel)).max(0.0);

        let mu = model.geoms[contact.geom]
            .friction
            .max(model.geoms[contact.plane].friction);
        let tangent_vel = vel_world - contact.normal * normal_vel;
        let tangent_speed = tangent_vel.norm();
        let friction = if tangent_speed > 1e-10 {
            let magnitude = (mu * normal_force).min(b * mass * tangent_speed);
            -tangent_vel / tangent_speed * magnitude
        } else {
            Vec3::zeros()
        };

        let f_local = xf.rot * (contact.normal * normal_force + friction);
        forces[contact.link] += SpatialVec::new(p_local.cross(&f_local), f_local);
    }

    forces
}
