//! Integration tests for the kine physics engine.

use approx::assert_relative_eq;
use kine::{
    Model, ModelBuilder, Simulation, Simulator,
    kine_math::{DVec, GRAVITY, Mat3, Quat, SpatialInertia, Vec3},
    kine_model::{Geom, Geometry, Joint},
    kine_rigid::{aba, crba, rnea, total_energy},
};
use std::io::Write;

fn rod(mass: f64, length: f64) -> SpatialInertia {
    SpatialInertia::new(
        mass,
        Vec3::new(0.0, 0.0, -length / 2.0),
        Mat3::from_diagonal(&Vec3::new(
            mass * length * length / 12.0,
            mass * length * length / 12.0,
            0.0,
        )),
    )
}

/// Single pendulum: hinge about Y, hanging along -Z, rod mass 1kg length 1m.
fn make_pendulum(dt: f64) -> Model {
    ModelBuilder::new()
        .timestep(dt)
        .add_hinge_body("pendulum", 0, Vec3::zeros(), Vec3::y(), rod(1.0, 1.0))
        .build()
        .unwrap()
}

/// Double pendulum with two identical links.
fn make_double_pendulum(dt: f64) -> Model {
    ModelBuilder::new()
        .timestep(dt)
        .add_hinge_body("link1", 0, Vec3::zeros(), Vec3::y(), rod(1.0, 1.0))
        .add_hinge_body("link2", 1, Vec3::new(0.0, 0.0, -1.0), Vec3::y(), rod(1.0, 1.0))
        .build()
        .unwrap()
}

fn write_model(xml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(xml.as_bytes()).unwrap();
    file
}

#[test]
fn single_pendulum_period() {
    let dt = 0.0005;
    let model = make_pendulum(dt);
    let mut state = model.default_state();
    state.q[0] = 0.1; // small angle

    let sim = Simulator::rk4();

    // Compound pendulum: T = 2pi * sqrt(I_pivot / (m * g * d)), I_pivot = mL^2/3, d = L/2
    let expected_period = 2.0 * std::f64::consts::PI * ((1.0 / 3.0) / (GRAVITY * 0.5)).sqrt();

    let total_steps = (10.0 / dt) as usize;
    let mut prev_q = state.q[0];
    let mut zero_crossings: Vec<f64> = Vec::new();

    for step in 0..total_steps {
        sim.step(&model, &mut state);

        // Positive -> negative crossings are one full period apart
        if prev_q > 0.0 && state.q[0] <= 0.0 {
            let frac = prev_q / (prev_q - state.q[0]);
            zero_crossings.push((step as f64 + frac) * dt);
        }
        prev_q = state.q[0];
    }

    assert!(
        zero_crossings.len() >= 2,
        "need at least 2 zero crossings, got {}",
        zero_crossings.len()
    );
    let periods: Vec<f64> = zero_crossings.windows(2).map(|w| w[1] - w[0]).collect();
    let avg_period = periods.iter().sum::<f64>() / periods.len() as f64;
    let relative_error = ((avg_period - expected_period) / expected_period).abs();

    assert!(
        relative_error < 0.01,
        "period error {:.4}% exceeds 1% (measured={:.6}, expected={:.6})",
        relative_error * 100.0,
        avg_period,
        expected_period,
    );
}

#[test]
fn double_pendulum_energy_conservation() {
    let dt = 0.0005;
    let model = make_double_pendulum(dt);
    let mut state = model.default_state();
    state.q[0] = 0.5;
    state.q[1] = 0.3;

    let sim = Simulator::rk4();
    let e0 = total_energy(&model, &state);

    sim.simulate(&model, &mut state, (5.0 / dt) as usize);

    let drift = (total_energy(&model, &state) - e0).abs();
    assert!(drift < 1e-4, "energy drift {drift:.2e} exceeds 1e-4 (e0={e0:.6})");
}

#[test]
fn damped_pendulum_loses_energy() {
    let model = ModelBuilder::new()
        .add_body("arm", 0, Vec3::zeros(), Quat::identity(), rod(1.0, 1.0))
        .add_joint(1, Joint::hinge(Vec3::y()).with_damping(0.5))
        .build()
        .unwrap();
    let mut state = model.default_state();
    state.q[0] = 0.5;
    let e0 = total_energy(&model, &state);

    Simulator::rk4().simulate(&model, &mut state, 2000);
    assert!(total_energy(&model, &state) < e0 - 0.1);
}

#[test]
fn aba_equals_minv_tau_minus_c() {
    let model = make_double_pendulum(0.001);
    let mut state = model.default_state();
    state.q[0] = 0.3;
    state.q[1] = -0.2;
    state.v[0] = 0.1;
    state.v[1] = -0.1;

    let tau = DVec::from_vec(vec![0.4, -0.7]);
    let qdd = aba(&model, &state, &tau);
    let m = crba(&model, &state);
    let c = rnea(&model, &state, &DVec::zeros(model.nv));

    // M * qdd + c = tau
    let lhs = &m * &qdd + &c;
    for i in 0..model.nv {
        assert_relative_eq!(lhs[i], tau[i], epsilon = 1e-8);
    }
}

#[test]
fn free_joint_freefall() {
    let dt = 0.001;
    let model = ModelBuilder::new()
        .timestep(dt)
        .add_free_body("ball", 0, Vec3::new(0.0, 0.0, 5.0), SpatialInertia::sphere(1.0, 0.1))
        .build()
        .unwrap();
    let mut state = model.default_state();

    Simulator::new().simulate(&model, &mut state, 100);

    // v = [wx, wy, wz, vx, vy, vz]; positions are [x, y, z, qw, qx, qy, qz].
    assert_relative_eq!(state.v[5], -GRAVITY * 0.1, epsilon = 1e-9);
    // Semi-implicit Euler: z = z0 - g dt^2 n(n+1)/2
    let expected_z = 5.0 - GRAVITY * dt * dt * (100.0 * 101.0 / 2.0);
    assert_relative_eq!(state.q[2], expected_z, epsilon = 1e-9);
    assert_relative_eq!(state.xpos[1].z, expected_z, epsilon = 1e-9);
    assert_relative_eq!(state.q[3], 1.0, epsilon = 1e-12);
}

#[test]
fn sphere_comes_to_rest_on_plane() {
    let model = ModelBuilder::new()
        .add_geom(0, Geom::new(Geometry::Plane).named("floor"))
        .add_free_body("ball", 0, Vec3::new(0.0, 0.0, 0.5), SpatialInertia::sphere(1.0, 0.1))
        .add_geom(1, Geom::new(Geometry::Sphere { radius: 0.1 }))
        .build()
        .unwrap();
    let mut sim = Simulation::new(&model);
    sim.run_until(3.0);

    // Static penetration balances gravity: k d = g with k = 1 / 0.02^2.
    let depth = GRAVITY * 0.02 * 0.02;
    let pos = sim.state().xpos[1];
    assert_relative_eq!(pos.z, 0.1 - depth, epsilon = 1e-3);
    assert_relative_eq!(pos.x, 0.0, epsilon = 1e-9);
    assert!(sim.state().v.norm() < 1e-2);
}

#[test]
fn falling_box_from_mjcf_lands_flat() {
    let file = write_model(
        r#"
        <mujoco model="hello">
            <option timestep="0.002"/>
            <worldbody>
                <geom name="floor" type="plane" size="5 5 0.1" friction="1 0.005 0.0001"/>
                <body name="box" pos="0 0 1">
                    <freejoint/>
                    <geom type="box" size="0.1 0.1 0.1" rgba="1 0 0 1"/>
                </body>
            </worldbody>
        </mujoco>"#,
    );
    let model = kine::load_model(file.path()).unwrap();
    assert_eq!(model.nbody(), 2);
    assert_eq!(model.njnt(), 1);
    assert_eq!(model.ngeom(), 2);
    assert_eq!(model.nv, 6);

    let mut state = kine::make_state(&model);
    let mut steps = 0;
    while state.time < 3.0 {
        kine::step(&model, &mut state);
        steps += 1;
    }
    assert!((1500..=1501).contains(&steps));
    assert!(state.time >= 3.0 && state.time < 3.0 + model.timestep());

    let pos = state.xpos[1];
    assert_relative_eq!(pos.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(pos.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(pos.z, 0.1, epsilon = 0.01);
    // Still upright.
    assert_relative_eq!(state.xmat[1][(2, 2)], 1.0, epsilon = 1e-6);
}

#[test]
fn rk4_option_selects_rk4_solver() {
    let file = write_model(
        r#"
        <mujoco>
            <option integrator="RK4" timestep="0.01"/>
            <worldbody>
                <body pos="0 0 2"><freejoint/><geom type="sphere" size="0.1"/></body>
            </worldbody>
        </mujoco>"#,
    );
    let model = kine::load_model(file.path()).unwrap();
    let mut sim = Simulation::new(&model);
    let steps = sim.run_until(0.5);
    assert!((50..=51).contains(&steps));

    // RK4 reproduces the parabola exactly.
    let t = sim.time();
    assert_relative_eq!(sim.state().xpos[1].z, 2.0 - 0.5 * GRAVITY * t * t, epsilon = 1e-9);
}

#[test]
fn motor_drives_joint() {
    let file = write_model(
        r#"
        <mujoco>
            <option gravity="0 0 0"/>
            <worldbody>
                <body name="wheel">
                    <joint name="spin" type="hinge" axis="0 0 1"/>
                    <geom type="cylinder" size="0.1 0.05"/>
                </body>
            </worldbody>
            <actuator><motor joint="spin" gear="2" ctrlrange="-1 1" ctrllimited="true"/></actuator>
        </mujoco>"#,
    );
    let model = kine::load_model(file.path()).unwrap();
    let mut state = kine::make_state(&model);
    state.ctrl[0] = 10.0;
    for _ in 0..10 {
        kine::step(&model, &mut state);
    }
    // Clamped control of 1 times gear 2 over the z moment of inertia.
    let izz = crba(&model, &state)[(0, 0)];
    assert_relative_eq!(state.v[0], 2.0 / izz * state.time, epsilon = 1e-9);
}

#[test]
fn hinge_limit_stops_the_joint() {
    let model = ModelBuilder::new()
        .add_body("arm", 0, Vec3::zeros(), Quat::identity(), rod(1.0, 1.0))
        .add_joint(1, Joint::hinge(Vec3::y()).with_limits(-0.2, 0.2))
        .build()
        .unwrap();
    let mut state = model.default_state();
    state.q[0] = 0.15;
    state.v[0] = 5.0;

    let sim = Simulator::new();
    let mut max_q: f64 = 0.0;
    for _ in 0..500 {
        sim.step(&model, &mut state);
        max_q = max_q.max(state.q[0]);
    }
    assert!(max_q < 0.3, "joint overshot its limit to {max_q}");
    sim.simulate(&model, &mut state, 2000);
    assert!(state.q[0].abs() < 0.25);
}
