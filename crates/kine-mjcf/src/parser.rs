//! MJCF XML parser implementation.

use crate::attrs::{self, AttrMap, Attrs};
use crate::defaults::{DefaultsManager, MAIN_CLASS};
use crate::{MjcfError, Result};
use kine_math::{GRAVITY, Mat3, Quat, SpatialInertia, Vec3};
use kine_model::{Actuator, Geom, Geometry, Integrator, Joint, Model, ModelBuilder};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Density used to infer geom masses (kg/m³, water).
const DEFAULT_DENSITY: f64 = 1000.0;

/// How body inertia is obtained (`<compiler inertiafromgeom>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InertiaFromGeom {
    /// Use `<inertial>` when present, geoms otherwise.
    Auto,
    /// Always use geoms.
    Always,
    /// Never use geoms.
    Never,
}

/// An element whose attributes are resolved against a default class at build time.
#[derive(Debug, Clone)]
struct ClassedElement {
    attrs: AttrMap,
    class: Option<String>,
}

/// Parsed joint element.
#[derive(Debug, Clone)]
struct JointElement {
    element: ClassedElement,
    /// Declared with `<freejoint>`.
    free: bool,
}

/// Parsed body element. Index 0 is the world body.
#[derive(Debug, Clone)]
struct BodyElement {
    parent: Option<usize>,
    attrs: AttrMap,
    /// Effective child class (own or inherited).
    childclass: Option<String>,
    inertial: Option<AttrMap>,
    joints: Vec<JointElement>,
    geoms: Vec<ClassedElement>,
}

impl BodyElement {
    fn new(parent: Option<usize>, attrs: AttrMap, childclass: Option<String>) -> Self {
        Self {
            parent,
            attrs,
            childclass,
            inertial: None,
            joints: Vec::new(),
            geoms: Vec::new(),
        }
    }
}

/// Parsing context: the element whose children are being read.
#[derive(Debug, Clone)]
enum Frame {
    Root,
    Default(String),
    WorldBody,
    Body(usize),
    Actuator,
    /// Elements whose content is not interpreted.
    Ignored,
}

/// MJCF loader.
pub struct MjcfLoader {
    defaults: DefaultsManager,
    model_name: String,
    bodies: Vec<BodyElement>,
    motors: Vec<ClassedElement>,
    gravity: Vec3,
    timestep: f64,
    integrator: Integrator,
    angle_in_degrees: bool,
    inertia_from_geom: InertiaFromGeom,
    has_worldbody: bool,
}

impl MjcfLoader {
    /// Load MJCF from file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let xml_content = fs::read_to_string(path)?;
        Self::from_xml_str(&xml_content)
    }

    /// Load MJCF from XML string.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let mut loader = Self {
            defaults: DefaultsManager::new(),
            model_name: String::new(),
            bodies: vec![BodyElement::new(None, AttrMap::new(), None)],
            motors: Vec::new(),
            gravity: Vec3::new(0.0, 0.0, -GRAVITY),
            timestep: 0.002,
            integrator: Integrator::Euler,
            angle_in_degrees: true,
            inertia_from_geom: InertiaFromGeom::Auto,
            has_worldbody: false,
        };

        loader.parse_xml(xml)?;
        Ok(loader)
    }

    fn parse_xml(&mut self, xml: &str) -> Result<()> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let frame = self.open_element(&e, stack.last(), &mut seen_root)?;
                    stack.push(frame);
                }
                Ok(Event::Empty(e)) => {
                    self.open_element(&e, stack.last(), &mut seen_root)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MjcfError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(MjcfError::InvalidMjcf("missing <mujoco> root element".into()));
        }
        if !stack.is_empty() {
            return Err(MjcfError::InvalidMjcf("unexpected end of document".into()));
        }
        if !self.has_worldbody {
            return Err(MjcfError::InvalidMjcf("missing <worldbody> element".into()));
        }
        Ok(())
    }

    /// Handle an opening (or self-closing) tag; returns the frame for its children.
    fn open_element(
        &mut self,
        e: &BytesStart,
        parent: Option<&Frame>,
        seen_root: &mut bool,
    ) -> Result<Frame> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let attrs = attrs::collect(e)?;

        let Some(parent) = parent else {
            if *seen_root || tag != "mujoco" {
                return Err(MjcfError::InvalidMjcf(format!(
                    "root element must be <mujoco>, found <{tag}>"
                )));
            }
            *seen_root = true;
            if let Some(name) = attrs.get("model") {
                self.model_name = name.clone();
            }
            return Ok(Frame::Root);
        };

        match (parent, tag.as_str()) {
            (_, "include") => Err(MjcfError::Unsupported("<include>".into())),

            (Frame::Root, "compiler") => {
                self.parse_compiler(&attrs)?;
                Ok(Frame::Ignored)
            }
            (Frame::Root, "option") => {
                self.parse_option(&attrs)?;
                Ok(Frame::Ignored)
            }
            (Frame::Root, "default") => {
                let class = attrs.get("class").cloned().unwrap_or(MAIN_CLASS.to_string());
                self.defaults.begin_class(&class, MAIN_CLASS)?;
                Ok(Frame::Default(class))
            }
            (Frame::Root, "worldbody") => {
                self.has_worldbody = true;
                Ok(Frame::WorldBody)
            }
            (Frame::Root, "actuator") => Ok(Frame::Actuator),

            (Frame::Default(parent_class), "default") => {
                let class = attrs.get("class").ok_or_else(|| {
                    MjcfError::InvalidMjcf("nested <default> requires a class".into())
                })?;
                self.defaults.begin_class(class, parent_class)?;
                Ok(Frame::Default(class.clone()))
            }
            (Frame::Default(class), _) => {
                self.defaults.set(class, &tag, attrs);
                Ok(Frame::Ignored)
            }

            (Frame::WorldBody, "body") => Ok(Frame::Body(self.add_body(0, attrs))),
            (Frame::Body(b), "body") => Ok(Frame::Body(self.add_body(*b, attrs))),
            (Frame::WorldBody, "geom") => {
                self.add_geom(0, attrs);
                Ok(Frame::Ignored)
            }
            (Frame::Body(b), "geom") => {
                self.add_geom(*b, attrs);
                Ok(Frame::Ignored)
            }
            (Frame::Body(b), "joint" | "freejoint") => {
                let b = *b;
                let class = self.element_class(b, &attrs);
                self.bodies[b].joints.push(JointElement {
                    element: ClassedElement { attrs, class },
                    free: tag == "freejoint",
                });
                Ok(Frame::Ignored)
            }
            (Frame::Body(b), "inertial") => {
                self.bodies[*b].inertial = Some(attrs);
                Ok(Frame::Ignored)
            }
            (Frame::WorldBody, "joint" | "freejoint" | "inertial") => Err(MjcfError::InvalidMjcf(
                format!("<{tag}> is not allowed in <worldbody>"),
            )),
            (Frame::WorldBody | Frame::Body(_), "frame") => {
                Err(MjcfError::Unsupported("<frame>".into()))
            }

            (Frame::Actuator, "motor") => {
                let class = attrs.get("class").cloned();
                self.motors.push(ClassedElement { attrs, class });
                Ok(Frame::Ignored)
            }
            (Frame::Actuator, other) => {
                tracing::warn!(actuator = other, "skipping unsupported actuator type");
                Ok(Frame::Ignored)
            }

            _ => Ok(Frame::Ignored),
        }
    }

    fn parse_compiler(&mut self, attrs: &AttrMap) -> Result<()> {
        let a = Attrs::new("compiler", attrs);
        match a.str("angle") {
            None | Some("degree") => self.angle_in_degrees = true,
            Some("radian") => self.angle_in_degrees = false,
            Some(other) => {
                return Err(MjcfError::InvalidMjcf(format!(
                    "compiler angle must be degree or radian, got '{other}'"
                )));
            }
        }
        self.inertia_from_geom = match a.tristate("inertiafromgeom")? {
            None => InertiaFromGeom::Auto,
            Some(true) => InertiaFromGeom::Always,
            Some(false) => InertiaFromGeom::Never,
        };
        Ok(())
    }

    fn parse_option(&mut self, attrs: &AttrMap) -> Result<()> {
        let a = Attrs::new("option", attrs);
        if let Some(g) = a.vec3("gravity")? {
            self.gravity = g;
        }
        if let Some(dt) = a.f64("timestep")? {
            if !(dt > 0.0) {
                return Err(MjcfError::InvalidMjcf(format!(
                    "option timestep must be positive, got {dt}"
                )));
            }
            self.timestep = dt;
        }
        if let Some(integrator) = a.str("integrator") {
            self.integrator = match integrator {
                "Euler" => Integrator::Euler,
                "RK4" => Integrator::Rk4,
                "implicit" | "implicitfast" => {
                    tracing::warn!(integrator, "implicit integrators are not available, using Euler");
                    Integrator::Euler
                }
                other => {
                    return Err(MjcfError::InvalidMjcf(format!(
                        "unknown integrator '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    fn add_body(&mut self, parent: usize, attrs: AttrMap) -> usize {
        let childclass = attrs
            .get("childclass")
            .cloned()
            .or_else(|| self.bodies[parent].childclass.clone());
        self.bodies.push(BodyElement::new(Some(parent), attrs, childclass));
        self.bodies.len() - 1
    }

    fn add_geom(&mut self, body: usize, attrs: AttrMap) {
        let class = self.element_class(body, &attrs);
        self.bodies[body].geoms.push(ClassedElement { attrs, class });
    }

    /// Own class, else the enclosing body's child class.
    fn element_class(&self, body: usize, attrs: &AttrMap) -> Option<String> {
        attrs
            .get("class")
            .cloned()
            .or_else(|| self.bodies[body].childclass.clone())
    }

    fn resolve(&self, tag: &str, element: &ClassedElement) -> Result<AttrMap> {
        self.defaults
            .resolve(element.class.as_deref(), tag, &element.attrs)
    }

    /// Build a kine Model from the parsed MJCF.
    pub fn build_model(&self) -> Result<Model> {
        let mut builder = ModelBuilder::new()
            .name(self.model_name.clone())
            .gravity(self.gravity)
            .timestep(self.timestep)
            .integrator(self.integrator);

        let mut joint_ids: HashMap<String, usize> = HashMap::new();
        let mut njnt = 0;

        for (b, body) in self.bodies.iter().enumerate() {
            let mut geoms = Vec::with_capacity(body.geoms.len());
            for element in &body.geoms {
                let attrs = self.resolve("geom", element)?;
                geoms.push(self.build_geom(&attrs)?);
            }

            if b > 0 {
                let a = Attrs::new("body", &body.attrs);
                let name = a.str("name").unwrap_or_default();
                let pos = a.vec3("pos")?.unwrap_or_else(Vec3::zeros);
                let quat = a.orientation(self.angle_in_degrees)?;
                let inertia = self.body_inertia(body, &geoms)?;
                let parent = body.parent.unwrap_or(0);
                builder = builder.add_body(name, parent, pos, quat, inertia);

                for element in &body.joints {
                    let joint = if element.free {
                        let name = element.element.attrs.get("name").cloned().unwrap_or_default();
                        Joint::free().named(name)
                    } else {
                        let attrs = self.resolve("joint", &element.element)?;
                        self.build_joint(&attrs)?
                    };
                    if !joint.name.is_empty() {
                        joint_ids.insert(joint.name.clone(), njnt);
                    }
                    njnt += 1;
                    builder = builder.add_joint(b, joint);
                }
            }

            for (geom, _) in geoms {
                builder = builder.add_geom(b, geom);
            }
        }

        for element in &self.motors {
            let attrs = self.resolve("motor", element)?;
            builder = builder.add_actuator(build_motor(&attrs, &joint_ids)?);
        }

        let model = builder.build()?;
        tracing::debug!(
            name = %model.name,
            nbody = model.nbody(),
            njnt = model.njnt(),
            ngeom = model.ngeom(),
            nv = model.nv,
            nu = model.nu(),
            "MJCF model built"
        );
        Ok(model)
    }

    fn build_joint(&self, attrs: &AttrMap) -> Result<Joint> {
        let a = Attrs::new("joint", attrs);
        let axis = a.vec3("axis")?.unwrap_or_else(Vec3::z);
        let joint_type = a.str("type").unwrap_or("hinge");
        if matches!(joint_type, "hinge" | "slide") && axis.norm() < 1e-12 {
            return Err(MjcfError::InvalidMjcf("joint axis has zero length".into()));
        }

        let mut joint = match joint_type {
            "hinge" => Joint::hinge(axis),
            "slide" => Joint::slide(axis),
            "ball" => Joint::ball(),
            "free" => Joint::free(),
            other => {
                return Err(MjcfError::InvalidMjcf(format!(
                    "unknown joint type '{other}'"
                )));
            }
        };
        joint = joint.named(a.str("name").unwrap_or_default());
        if joint_type != "free" {
            joint = joint.with_anchor(a.vec3("pos")?.unwrap_or_else(Vec3::zeros));
        }
        joint = joint.with_damping(a.f64("damping")?.unwrap_or(0.0));

        let range = a.pair("range")?;
        let limited = a.tristate("limited")?.unwrap_or(range.is_some());
        if limited {
            let [lo, hi] = range.ok_or_else(|| {
                MjcfError::InvalidMjcf(format!("limited joint '{}' has no range", joint.name))
            })?;
            if lo > hi {
                return Err(MjcfError::InvalidMjcf(format!(
                    "joint '{}' range is inverted",
                    joint.name
                )));
            }
            let scale = |x: f64| {
                if joint_type == "hinge" && self.angle_in_degrees {
                    x.to_radians()
                } else {
                    x
                }
            };
            joint = joint.with_limits(scale(lo), scale(hi));
        }
        Ok(joint)
    }

    /// Build a geom and its mass.
    fn build_geom(&self, attrs: &AttrMap) -> Result<(Geom, f64)> {
        let a = Attrs::new("geom", attrs);
        let kind = a.str("type").unwrap_or("sphere");
        let size = a.numbers("size")?.unwrap_or_default();
        let fromto = a.array("fromto", 6)?;

        let mut pos = a.vec3("pos")?.unwrap_or_else(Vec3::zeros);
        let mut quat = a.orientation(self.angle_in_degrees)?;
        let mut half_length = None;
        if let Some(ft) = &fromto {
            let from = Vec3::new(ft[0], ft[1], ft[2]);
            let to = Vec3::new(ft[3], ft[4], ft[5]);
            let dir = to - from;
            if dir.norm() < 1e-12 {
                return Err(MjcfError::InvalidMjcf("geom fromto has zero length".into()));
            }
            pos = (from + to) * 0.5;
            quat = Quat::from_two_vectors(&Vec3::z(), &dir);
            half_length = Some(dir.norm() * 0.5);
        }

        let need = |n: usize| leading_sizes(kind, &size, n);

        let geometry = match kind {
            "sphere" => Geometry::Sphere { radius: need(1)?[0] },
            "capsule" | "cylinder" => {
                let (radius, half_length) = match half_length {
                    Some(h) => (need(1)?[0], h),
                    None => {
                        let s = need(2)?;
                        (s[0], s[1])
                    }
                };
                if kind == "capsule" {
                    Geometry::Capsule { radius, half_length }
                } else {
                    Geometry::Cylinder { radius, half_length }
                }
            }
            "box" | "ellipsoid" => {
                let extents = match half_length {
                    Some(h) => {
                        let s = need(2)?;
                        Vec3::new(s[0], s[1], h)
                    }
                    None => {
                        let s = need(3)?;
                        Vec3::new(s[0], s[1], s[2])
                    }
                };
                if kind == "box" {
                    Geometry::Box { half_extents: extents }
                } else {
                    Geometry::Ellipsoid { radii: extents }
                }
            }
            "plane" => Geometry::Plane,
            "mesh" | "hfield" | "sdf" => {
                return Err(MjcfError::Unsupported(format!("{kind} geoms")));
            }
            other => {
                return Err(MjcfError::InvalidMjcf(format!("unknown geom type '{other}'")));
            }
        };

        let mass = match a.f64("mass")? {
            Some(m) => m,
            None => a.f64("density")?.unwrap_or(DEFAULT_DENSITY) * geometry.volume(),
        };
        if mass < 0.0 {
            return Err(MjcfError::InvalidMjcf("geom mass must not be negative".into()));
        }

        let mut geom = Geom::new(geometry)
            .named(a.str("name").unwrap_or_default())
            .at(pos, quat);
        if let Some(mu) = a.leading("friction", 1, 3)? {
            geom.friction = mu;
        }
        Ok((geom, mass))
    }

    fn body_inertia(&self, body: &BodyElement, geoms: &[(Geom, f64)]) -> Result<SpatialInertia> {
        let explicit = match (&body.inertial, self.inertia_from_geom) {
            (Some(attrs), InertiaFromGeom::Auto | InertiaFromGeom::Never) => {
                Some(self.inertial(attrs)?)
            }
            _ => None,
        };
        if let Some(inertia) = explicit {
            return Ok(inertia);
        }
        if self.inertia_from_geom == InertiaFromGeom::Never {
            return Ok(SpatialInertia::zero());
        }
        Ok(geoms
            .iter()
            .filter(|(g, _)| g.geometry.is_solid())
            .fold(SpatialInertia::zero(), |acc, (g, mass)| {
                acc.merge(&g.body_inertia(*mass))
            }))
    }

    fn inertial(&self, attrs: &AttrMap) -> Result<SpatialInertia> {
        let a = Attrs::new("inertial", attrs);
        let mass = a
            .f64("mass")?
            .ok_or_else(|| MjcfError::InvalidMjcf("<inertial> requires mass".into()))?;
        if mass < 0.0 {
            return Err(MjcfError::InvalidMjcf("inertial mass must not be negative".into()));
        }
        let pos = a.vec3("pos")?.unwrap_or_else(Vec3::zeros);

        let inertia = if let Some(d) = a.vec3("diaginertia")? {
            let rot = a.orientation(self.angle_in_degrees)?.to_matrix();
            rot * Mat3::from_diagonal(&d) * rot.transpose()
        } else if let Some(f) = a.array("fullinertia", 6)? {
            Mat3::new(f[0], f[3], f[4], f[3], f[1], f[5], f[4], f[5], f[2])
        } else {
            return Err(MjcfError::InvalidMjcf(
                "<inertial> requires diaginertia or fullinertia".into(),
            ));
        };
        Ok(SpatialInertia::new(mass, pos, inertia))
    }
}

/// First `n` entries of a geom size list, all positive.
fn leading_sizes<'s>(kind: &str, size: &'s [f64], n: usize) -> Result<&'s [f64]> {
    if size.len() < n {
        return Err(MjcfError::InvalidMjcf(format!(
            "{kind} geom needs {n} size values, got {}",
            size.len()
        )));
    }
    if size[..n].iter().any(|s| !(*s > 0.0)) {
        return Err(MjcfError::InvalidMjcf(format!(
            "{kind} geom sizes must be positive"
        )));
    }
    Ok(&size[..n])
}

fn build_motor(attrs: &AttrMap, joint_ids: &HashMap<String, usize>) -> Result<Actuator> {
    let a = Attrs::new("motor", attrs);
    let joint_name = a
        .str("joint")
        .ok_or_else(|| MjcfError::InvalidMjcf("motor requires a joint".into()))?;
    let joint = *joint_ids.get(joint_name).ok_or_else(|| {
        MjcfError::InvalidMjcf(format!("motor references unknown joint '{joint_name}'"))
    })?;

    let ctrl_range = a.pair("ctrlrange")?;
    let limited = a.tristate("ctrllimited")?.unwrap_or(ctrl_range.is_some());
    let ctrl_range = if limited {
        Some(ctrl_range.ok_or_else(|| {
            MjcfError::InvalidMjcf(format!("motor on '{joint_name}' is ctrllimited without ctrlrange"))
        })?)
    } else {
        None
    };

    Ok(Actuator {
        name: a
            .str("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("motor_{joint_name}")),
        joint,
        gear: a.leading("gear", 1, 6)?.unwrap_or(1.0),
        ctrl_range,
    })
}
