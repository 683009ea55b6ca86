//! Rigid bodies and the internal link tree used by the dynamics.

use kine_math::{Quat, SpatialInertia, SpatialTransform, Vec3};

/// A rigid body in the kinematic tree. Body 0 is the world.
#[derive(Debug, Clone)]
pub struct Body {
    /// Name of the body (empty when unnamed).
    pub name: String,
    /// Parent body index (`None` only for the world body).
    pub parent: Option<usize>,
    /// Position in the parent body frame.
    pub pos: Vec3,
    /// Orientation in the parent body frame.
    pub quat: Quat,
    /// Spatial inertia in the body frame.
    pub inertia: SpatialInertia,
    /// Index of the first joint of this body.
    pub jnt_adr: usize,
    /// Number of joints attached to this body.
    pub jnt_num: usize,
    /// Link whose frame is this body's frame (`None` for the world).
    pub link: Option<usize>,
}

impl Body {
    /// The world body.
    pub fn world() -> Self {
        Self {
            name: "world".to_string(),
            parent: None,
            pos: Vec3::zeros(),
            quat: Quat::identity(),
            inertia: SpatialInertia::zero(),
            jnt_adr: 0,
            jnt_num: 0,
            link: None,
        }
    }

    /// Reference transform from the parent body frame to this body's frame.
    pub fn parent_to_body(&self) -> SpatialTransform {
        SpatialTransform::from_pose(self.pos, self.quat.normalize().to_matrix())
    }
}

/// A node of the dynamics tree.
///
/// Each joint gets its own link; a body with several joints becomes a chain
/// of links where only the last one carries the body's inertia. A body
/// without joints is a single welded link.
#[derive(Debug, Clone)]
pub struct Link {
    /// Body this link belongs to.
    pub body: usize,
    /// Parent link (`None` when attached to the world).
    pub parent: Option<usize>,
    /// Joint driving this link (`None` for welded links).
    pub joint: Option<usize>,
    /// Transform from the parent link frame to this link's frame at rest.
    pub tree: SpatialTransform,
    /// Inertia carried by this link, in its own frame.
    pub inertia: SpatialInertia,
}
