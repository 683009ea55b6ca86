//! MuJoCo MJCF XML loader for the kine physics engine.
//!
//! Supports loading models from the MJCF XML format and converting them to a
//! kine [`Model`]. Unsupported features are reported as errors rather than
//! silently dropped.

mod attrs;
mod defaults;
mod parser;

pub use parser::MjcfLoader;

use kine_model::{Model, ModelError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MjcfError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid MJCF: {0}")]
    InvalidMjcf(String),

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, MjcfError>;

/// Parse an MJCF file and build the model.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Model> {
    MjcfLoader::from_file(path)?.build_model()
}

/// Parse an MJCF document held in memory and build the model.
pub fn load_str(xml: &str) -> Result<Model> {
    MjcfLoader::from_xml_str(xml)?.build_model()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kine_math::Vec3;
    use kine_model::{Geometry, Integrator, JointType};
    use std::io::Write;

    const FALLING_BOX: &str = r#"
    <mujoco model="falling box">
        <option timestep="0.002"/>
        <worldbody>
            <geom name="floor" type="plane" size="5 5 0.1"/>
            <body name="box" pos="0 0 1">
                <freejoint/>
                <geom type="box" size="0.1 0.1 0.1" mass="1"/>
            </body>
        </worldbody>
    </mujoco>
    "#;

    #[test]
    fn test_falling_box_counts() {
        let model = load_str(FALLING_BOX).unwrap();
        assert_eq!(model.name, "falling box");
        assert_eq!(model.nbody(), 2);
        assert_eq!(model.njnt(), 1);
        assert_eq!(model.ngeom(), 2);
        assert_eq!(model.nv, 6);
        assert_eq!(model.nq, 7);
        assert_relative_eq!(model.timestep(), 0.002);
        assert_eq!(model.bodies[1].name, "box");
        assert_relative_eq!(model.bodies[1].inertia.mass, 1.0);
        assert_relative_eq!(model.qpos0[2], 1.0);
    }

    #[test]
    fn test_simple_hinge() {
        let mjcf = r#"
        <mujoco>
            <option gravity="0 0 -9.81" timestep="0.001" integrator="RK4"/>
            <worldbody>
                <body name="link1" pos="0 0 0">
                    <inertial pos="0 0 -0.5" mass="1.0" diaginertia="0.1 0.1 0.1"/>
                    <joint name="joint1" type="hinge" axis="0 1 0" range="-90 90"/>
                </body>
            </worldbody>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        assert_eq!(model.nbody(), 2);
        assert_eq!(model.nv, 1);
        assert_eq!(model.opt.integrator, Integrator::Rk4);
        let joint = &model.joints[0];
        assert_eq!(joint.joint_type, JointType::Hinge);
        let [lo, hi] = joint.limits.unwrap();
        assert_relative_eq!(lo, -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(hi, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(model.bodies[1].inertia.com, Vec3::new(0.0, 0.0, -0.5));
    }

    #[test]
    fn test_multi_joint_body() {
        let mjcf = r#"
        <mujoco>
            <compiler angle="radian"/>
            <worldbody>
                <body name="link1">
                    <inertial mass="1.0" diaginertia="0.1 0.1 0.1"/>
                    <joint type="hinge" axis="0 0 1"/>
                    <body name="link2" pos="1 0 0">
                        <inertial mass="0.5" diaginertia="0.05 0.05 0.05"/>
                        <joint type="slide" axis="1 0 0" range="-0.5 0.5"/>
                        <joint type="ball"/>
                    </body>
                </body>
            </worldbody>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        assert_eq!(model.nbody(), 3);
        assert_eq!(model.njnt(), 3);
        assert_eq!(model.nv, 5);
        assert_eq!(model.nq, 6);
        assert_eq!(model.nlinks(), 3);
        assert_eq!(model.joints[1].limits, Some([-0.5, 0.5]));
    }

    #[test]
    fn test_geom_inertia_from_density() {
        let mjcf = r#"
        <mujoco>
            <worldbody>
                <body name="ball" pos="0 0 1">
                    <joint type="free"/>
                    <geom name="ball_geom" type="sphere" size="0.1"/>
                </body>
            </worldbody>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        let expected = 1000.0 * 4.0 / 3.0 * std::f64::consts::PI * 0.001;
        assert_relative_eq!(model.bodies[1].inertia.mass, expected, epsilon = 1e-9);
        assert_eq!(model.geoms[0].geometry, Geometry::Sphere { radius: 0.1 });
        assert_eq!(model.geoms[0].name, "ball_geom");
    }

    #[test]
    fn test_fromto_capsule() {
        let mjcf = r#"
        <mujoco>
            <worldbody>
                <body name="limb">
                    <joint type="hinge" axis="0 1 0"/>
                    <geom type="capsule" fromto="0 0 0 0.4 0 0" size="0.05" friction="0.7 0.1 0.1"/>
                </body>
            </worldbody>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        let geom = &model.geoms[0];
        assert_eq!(
            geom.geometry,
            Geometry::Capsule {
                radius: 0.05,
                half_length: 0.2
            }
        );
        assert_relative_eq!(geom.pos, Vec3::new(0.2, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(geom.quat.rotate(&Vec3::z()), Vec3::x(), epsilon = 1e-12);
        assert_relative_eq!(geom.friction, 0.7);
        // Centre of mass sits at the capsule midpoint.
        assert_relative_eq!(model.bodies[1].inertia.com, Vec3::new(0.2, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_default_classes() {
        let mjcf = r#"
        <mujoco>
            <default>
                <joint damping="0.5"/>
                <geom type="box" size="0.1 0.1 0.1"/>
                <default class="soft">
                    <joint damping="2"/>
                </default>
            </default>
            <worldbody>
                <body name="a" childclass="soft">
                    <joint axis="1 0 0"/>
                    <geom/>
                    <body name="b" pos="0 0 -0.3">
                        <joint class="main" axis="1 0 0"/>
                        <geom type="sphere" size="0.05"/>
                    </body>
                </body>
            </worldbody>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        assert_relative_eq!(model.joints[0].damping, 2.0);
        assert_relative_eq!(model.joints[1].damping, 0.5);
        assert!(matches!(model.geoms[0].geometry, Geometry::Box { .. }));
        assert!(matches!(model.geoms[1].geometry, Geometry::Sphere { .. }));
    }

    #[test]
    fn test_motor_actuator() {
        let mjcf = r#"
        <mujoco>
            <worldbody>
                <body name="arm">
                    <joint name="shoulder" axis="0 1 0"/>
                    <geom type="capsule" size="0.05 0.2"/>
                </body>
            </worldbody>
            <actuator>
                <motor joint="shoulder" gear="50" ctrlrange="-1 1"/>
            </actuator>
        </mujoco>
        "#;

        let model = load_str(mjcf).unwrap();
        assert_eq!(model.nu(), 1);
        let motor = &model.actuators[0];
        assert_eq!(motor.name, "motor_shoulder");
        assert_eq!(motor.joint, 0);
        assert_relative_eq!(motor.gear, 50.0);
        assert_eq!(motor.ctrl_range, Some([-1.0, 1.0]));
    }

    #[test]
    fn test_body_orientation() {
        let mjcf = r#"
        <mujoco>
            <worldbody>
                <body name="tilted" euler="0 0 90">
                    <geom type="sphere" size="0.1"/>
                </body>
            </worldbody>
        </mujoco>
        "#;
        let model = load_str(mjcf).unwrap();
        let q = model.bodies[1].quat;
        assert_relative_eq!(q.rotate(&Vec3::x()), Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_implicit_integrator_falls_back_to_euler() {
        let mjcf = r#"<mujoco><option integrator="implicitfast"/><worldbody/></mujoco>"#;
        let model = load_str(mjcf).unwrap();
        assert_eq!(model.opt.integrator, Integrator::Euler);
        assert_eq!(model.nbody(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FALLING_BOX.as_bytes()).unwrap();
        let model = load_file(file.path()).unwrap();
        assert_eq!(model.nbody(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = load_file("/definitely/not/here.xml").unwrap_err();
        assert!(matches!(err, MjcfError::IoError(_)));
    }

    #[test]
    fn test_wrong_root() {
        let err = load_str("<robot><worldbody/></robot>").unwrap_err();
        assert!(err.to_string().contains("root element"), "{err}");
    }

    #[test]
    fn test_missing_worldbody() {
        let err = load_str("<mujoco><option timestep=\"0.01\"/></mujoco>").unwrap_err();
        assert!(err.to_string().contains("worldbody"), "{err}");
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(load_str(""), Err(MjcfError::InvalidMjcf(_))));
    }

    #[test]
    fn test_malformed_xml() {
        let err = load_str("<mujoco><worldbody></mujoco>").unwrap_err();
        assert!(matches!(err, MjcfError::XmlError(_) | MjcfError::InvalidMjcf(_)));
    }

    #[test]
    fn test_bad_numbers() {
        let mjcf = r#"<mujoco><worldbody><body pos="0 zero 1"/></worldbody></mujoco>"#;
        let err = load_str(mjcf).unwrap_err();
        assert!(err.to_string().contains("pos"), "{err}");

        let mjcf = r#"<mujoco><option gravity="0 -9.81"/><worldbody/></mujoco>"#;
        assert!(load_str(mjcf).is_err());
    }

    #[test]
    fn test_unknown_types() {
        let joint = r#"<mujoco><worldbody><body><joint type="screw"/><geom size="0.1"/></body></worldbody></mujoco>"#;
        assert!(load_str(joint).unwrap_err().to_string().contains("screw"));

        let geom = r#"<mujoco><worldbody><geom type="blob"/></worldbody></mujoco>"#;
        assert!(load_str(geom).unwrap_err().to_string().contains("blob"));
    }

    #[test]
    fn test_mesh_is_unsupported() {
        let mjcf = r#"<mujoco><worldbody><geom type="mesh" mesh="bunny"/></worldbody></mujoco>"#;
        assert!(matches!(load_str(mjcf), Err(MjcfError::Unsupported(_))));
    }

    #[test]
    fn test_motor_on_unknown_joint() {
        let mjcf = r#"
        <mujoco>
            <worldbody><body><joint name="a"/><geom size="0.1"/></body></worldbody>
            <actuator><motor joint="b"/></actuator>
        </mujoco>
        "#;
        let err = load_str(mjcf).unwrap_err();
        assert!(err.to_string().contains("unknown joint 'b'"), "{err}");
    }

    #[test]
    fn test_massless_moving_body() {
        let mjcf = r#"<mujoco><worldbody><body name="ghost"><joint/></body></worldbody></mujoco>"#;
        assert!(matches!(load_str(mjcf), Err(MjcfError::Model(ModelError::MasslessBody(_)))));
    }
}
