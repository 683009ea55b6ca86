//! Model definition: static description of a physical system.

use crate::{Body, Geom, Joint, JointType, Link, State};
use kine_math::{DVec, GRAVITY, Quat, SpatialInertia, SpatialTransform, Vec3};
use thiserror::Error;

/// Errors raised while assembling a [`Model`].
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("body '{body}' refers to parent {parent}, which is not defined before it")]
    InvalidParent { body: String, parent: usize },

    #[error("joint '{joint}' refers to body {body}, which does not exist")]
    InvalidJointBody { joint: String, body: usize },

    #[error("free joint in body '{0}' must be the only joint of that body")]
    FreeJointNotAlone(String),

    #[error("moving body '{0}' has no mass")]
    MasslessBody(String),

    #[error("actuator '{name}': {reason}")]
    InvalidActuator { name: String, reason: String },

    #[error("timestep must be positive, got {0}")]
    InvalidTimestep(f64),
}

/// Numerical integrator used to advance the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integrator {
    /// Semi-implicit Euler.
    #[default]
    Euler,
    /// Classic 4th-order Runge-Kutta.
    Rk4,
}

/// Global simulation options.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    /// Integration timestep (seconds).
    pub timestep: f64,
    /// Gravity vector in world frame.
    pub gravity: Vec3,
    pub integrator: Integrator,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            timestep: 0.002,
            gravity: Vec3::new(0.0, 0.0, -GRAVITY),
            integrator: Integrator::Euler,
        }
    }
}

/// Motor actuator applying `gear * ctrl` to a scalar joint.
#[derive(Debug, Clone)]
pub struct Actuator {
    pub name: String,
    /// Index of the driven joint.
    pub joint: usize,
    pub gear: f64,
    /// Control clamp range (None = unclamped).
    pub ctrl_range: Option<[f64; 2]>,
}

/// Static model describing the topology and parameters of a physical system.
#[derive(Debug, Clone)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Bodies in the kinematic tree (index 0 = world).
    pub bodies: Vec<Body>,
    /// Joints, grouped by body in body order.
    pub joints: Vec<Joint>,
    /// Geoms of all bodies, world geoms included.
    pub geoms: Vec<Geom>,
    pub actuators: Vec<Actuator>,
    /// Dynamics tree; parents always precede children.
    pub links: Vec<Link>,
    pub opt: SimOptions,
    /// Total number of position coordinates.
    pub nq: usize,
    /// Total number of velocity coordinates (degrees of freedom).
    pub nv: usize,
    /// Reference configuration.
    pub qpos0: DVec,
    /// Mass of each body together with all its descendants.
    pub subtree_mass: Vec<f64>,
    /// World-to-link transforms at the reference configuration.
    pub link_xform0: Vec<SpatialTransform>,
}

impl Model {
    /// Create a state at the reference configuration.
    pub fn default_state(&self) -> State {
        State::new(self)
    }

    /// Number of bodies, world included.
    pub fn nbody(&self) -> usize {
        self.bodies.len()
    }

    /// Number of joints.
    pub fn njnt(&self) -> usize {
        self.joints.len()
    }

    /// Number of geoms.
    pub fn ngeom(&self) -> usize {
        self.geoms.len()
    }

    /// Number of actuators.
    pub fn nu(&self) -> usize {
        self.actuators.len()
    }

    /// Number of links in the dynamics tree.
    pub fn nlinks(&self) -> usize {
        self.links.len()
    }

    /// Timestep shorthand.
    pub fn timestep(&self) -> f64 {
        self.opt.timestep
    }

    /// Look up a body by name.
    pub fn body_id(&self, name: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.name == name)
    }

    /// Look up a joint by name.
    pub fn joint_id(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Joints of a body.
    pub fn body_joints(&self, body: usize) -> &[Joint] {
        let b = &self.bodies[body];
        &self.joints[b.jnt_adr..b.jnt_adr + b.jnt_num]
    }

    /// Joint transform of a link for the configuration `q` (identity for welded links).
    pub fn link_joint_transform(&self, link: &Link, q: &[f64]) -> SpatialTransform {
        match link.joint {
            Some(j) => {
                let joint = &self.joints[j];
                joint.joint_transform(&q[joint.q_offset..joint.q_offset + joint.nq()])
            }
            None => SpatialTransform::identity(),
        }
    }
}

/// Builder for constructing models.
///
/// Bodies are numbered in the order they are added, starting at 1; body 0 is
/// the world.
pub struct ModelBuilder {
    name: String,
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    geoms: Vec<Geom>,
    actuators: Vec<Actuator>,
    opt: SimOptions,
}

impl ModelBuilder {
    /// Start building a new model.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            bodies: vec![Body::world()],
            joints: Vec::new(),
            geoms: Vec::new(),
            actuators: Vec::new(),
            opt: SimOptions::default(),
        }
    }

    /// Set the model name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the gravity vector.
    pub fn gravity(mut self, g: Vec3) -> Self {
        self.opt.gravity = g;
        self
    }

    /// Set the timestep.
    pub fn timestep(mut self, dt: f64) -> Self {
        self.opt.timestep = dt;
        self
    }

    /// Select the integrator.
    pub fn integrator(mut self, integrator: Integrator) -> Self {
        self.opt.integrator = integrator;
        self
    }

    /// Index the next added body will get.
    pub fn next_body(&self) -> usize {
        self.bodies.len()
    }

    /// Add a body without joints (welded to its parent until joints are added).
    pub fn add_body(
        mut self,
        name: &str,
        parent: usize,
        pos: Vec3,
        quat: Quat,
        inertia: SpatialInertia,
    ) -> Self {
        self.bodies.push(Body {
            name: name.to_string(),
            parent: Some(parent),
            pos,
            quat,
            inertia,
            jnt_adr: 0,
            jnt_num: 0,
            link: None,
        });
        self
    }

    /// Attach a joint to an existing body.
    pub fn add_joint(mut self, body: usize, mut joint: Joint) -> Self {
        joint.body = body;
        self.joints.push(joint);
        self
    }

    /// Attach a geom to a body (0 = world).
    pub fn add_geom(mut self, body: usize, mut geom: Geom) -> Self {
        geom.body = body;
        self.geoms.push(geom);
        self
    }

    /// Add a motor actuator.
    pub fn add_actuator(mut self, actuator: Actuator) -> Self {
        self.actuators.push(actuator);
        self
    }

    /// Add a body with a hinge joint at its origin.
    pub fn add_hinge_body(
        self,
        name: &str,
        parent: usize,
        pos: Vec3,
        axis: Vec3,
        inertia: SpatialInertia,
    ) -> Self {
        let body = self.next_body();
        self.add_body(name, parent, pos, Quat::identity(), inertia)
            .add_joint(body, Joint::hinge(axis).named(name))
    }

    /// Add a body with a free joint.
    pub fn add_free_body(
        self,
        name: &str,
        parent: usize,
        pos: Vec3,
        inertia: SpatialInertia,
    ) -> Self {
        let body = self.next_body();
        self.add_body(name, parent, pos, Quat::identity(), inertia)
            .add_joint(body, Joint::free().named(name))
    }

    /// Validate and assemble the model.
    pub fn build(self) -> Result<Model, ModelError> {
        let Self {
            name,
            mut bodies,
            mut joints,
            mut geoms,
            mut actuators,
            opt,
        } = self;

        if !(opt.timestep > 0.0) {
            return Err(ModelError::InvalidTimestep(opt.timestep));
        }

        for (i, body) in bodies.iter().enumerate().skip(1) {
            match body.parent {
                Some(p) if p < i => {}
                p => {
                    return Err(ModelError::InvalidParent {
                        body: body.name.clone(),
                        parent: p.unwrap_or(usize::MAX),
                    });
                }
            }
        }

        // Group joints by body, keeping their relative order.
        for joint in &joints {
            if joint.body == 0 || joint.body >= bodies.len() {
                return Err(ModelError::InvalidJointBody {
                    joint: joint.name.clone(),
                    body: joint.body,
                });
            }
        }
        // order[old] = new index, so actuators keep pointing at the same joint.
        let mut perm: Vec<usize> = (0..joints.len()).collect();
        perm.sort_by_key(|&j| joints[j].body);
        let mut order = vec![0; joints.len()];
        for (new, &old) in perm.iter().enumerate() {
            order[old] = new;
        }
        joints.sort_by_key(|j| j.body);
        geoms.sort_by_key(|g| g.body);

        let mut nq = 0;
        let mut nv = 0;
        let mut next_joint = 0;
        for (b, body) in bodies.iter_mut().enumerate() {
            body.jnt_adr = next_joint;
            while next_joint < joints.len() && joints[next_joint].body == b {
                let joint = &mut joints[next_joint];
                joint.q_offset = nq;
                joint.v_offset = nv;
                nq += joint.nq();
                nv += joint.nv();
                next_joint += 1;
            }
            body.jnt_num = next_joint - body.jnt_adr;

            let body_joints = &joints[body.jnt_adr..next_joint];
            if body_joints.len() > 1
                && body_joints.iter().any(|j| j.joint_type == JointType::Free)
            {
                return Err(ModelError::FreeJointNotAlone(body.name.clone()));
            }
        }

        let mut subtree_mass: Vec<f64> = bodies.iter().map(|b| b.inertia.mass).collect();
        for b in (1..bodies.len()).rev() {
            if let Some(p) = bodies[b].parent {
                subtree_mass[p] += subtree_mass[b];
            }
        }
        for (body, mass) in bodies.iter().zip(&subtree_mass).skip(1) {
            if body.jnt_num > 0 && *mass <= 0.0 {
                return Err(ModelError::MasslessBody(body.name.clone()));
            }
        }

        for act in &mut actuators {
            if let Some(&j) = order.get(act.joint) {
                act.joint = j;
            }
        }
        for act in &actuators {
            let Some(joint) = joints.get(act.joint) else {
                return Err(ModelError::InvalidActuator {
                    name: act.name.clone(),
                    reason: format!("joint index {} out of range", act.joint),
                });
            };
            if joint.nv() != 1 {
                return Err(ModelError::InvalidActuator {
                    name: act.name.clone(),
                    reason: format!("joint '{}' is not a hinge or slide joint", joint.name),
                });
            }
        }

        let links = build_links(&mut bodies, &joints);

        let mut qpos0 = DVec::zeros(nq);
        for joint in &joints {
            let body = &bodies[joint.body];
            let q = &mut qpos0.as_mut_slice()[joint.q_offset..joint.q_offset + joint.nq()];
            joint.reference_position(q, &body.pos, &body.quat.normalize());
        }

        let mut model = Model {
            name,
            bodies,
            joints,
            geoms,
            actuators,
            links,
            opt,
            nq,
            nv,
            qpos0,
            subtree_mass,
            link_xform0: Vec::new(),
        };
        model.link_xform0 = reference_link_poses(&model);
        Ok(model)
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand bodies and joints into the link tree, recording each body's link.
fn build_links(bodies: &mut [Body], joints: &[Joint]) -> Vec<Link> {
    let mut links: Vec<Link> = Vec::new();
    for b in 1..bodies.len() {
        let parent_link = bodies[b].parent.and_then(|p| bodies[p].link);
        let body = &bodies[b];
        let body_joints = &joints[body.jnt_adr..body.jnt_adr + body.jnt_num];

        if body_joints.is_empty() {
            links.push(Link {
                body: b,
                parent: parent_link,
                joint: None,
                tree: body.parent_to_body(),
                inertia: body.inertia,
            });
        } else {
            let mut parent = parent_link;
            for (k, joint) in body_joints.iter().enumerate() {
                let tree = if k > 0 || joint.joint_type == JointType::Free {
                    SpatialTransform::identity()
                } else {
                    body.parent_to_body()
                };
                let inertia = if k + 1 == body_joints.len() {
                    body.inertia
                } else {
                    SpatialInertia::zero()
                };
                links.push(Link {
                    body: b,
                    parent,
                    joint: Some(body.jnt_adr + k),
                    tree,
                    inertia,
                });
                parent = Some(links.len() - 1);
            }
        }
        bodies[b].link = Some(links.len() - 1);
    }
    links
}

/// World-to-link transforms at `qpos0`.
fn reference_link_poses(model: &Model) -> Vec<SpatialTransform> {
    let q = model.qpos0.as_slice();
    let mut xforms: Vec<SpatialTransform> = Vec::with_capacity(model.links.len());
    for link in &model.links {
        let x_tree = model.link_joint_transform(link, q).compose(&link.tree);
        let x = match link.parent {
            Some(p) => x_tree.compose(&xforms[p]),
            None => x_tree,
        };
        xforms.push(x);
    }
    xforms
}
