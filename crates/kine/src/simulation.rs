//! Simulation drivers.

use crate::solver::{Rk4Solver, SemiImplicitEulerSolver, Solver};
use kine_model::{Integrator, Model, State};

/// Main simulation driver.
pub struct Simulator {
    solver: Box<dyn Solver>,
}

impl Simulator {
    /// Create a simulator with the default semi-implicit Euler solver.
    pub fn new() -> Self {
        Self {
            solver: Box::new(SemiImplicitEulerSolver::default()),
        }
    }

    /// Create a simulator with the RK4 solver.
    pub fn rk4() -> Self {
        Self {
            solver: Box::new(Rk4Solver::default()),
        }
    }

    /// Create a simulator with a custom solver.
    pub fn with_solver(solver: Box<dyn Solver>) -> Self {
        Self { solver }
    }

    /// Create a simulator using the integrator the model asks for.
    pub fn for_model(model: &Model) -> Self {
        match model.opt.integrator {
            Integrator::Euler => Self::new(),
            Integrator::Rk4 => Self::rk4(),
        }
    }

    /// Advance simulation by one timestep.
    pub fn step(&self, model: &Model, state: &mut State) {
        self.solver.step(model, state);
    }

    /// Run simulation for `n` steps.
    pub fn simulate(&self, model: &Model, state: &mut State, n: usize) {
        for _ in 0..n {
            self.step(model, state);
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// A state bound to the model it was made for.
///
/// The borrow keeps the model alive for as long as the state is in use.
pub struct Simulation<'m> {
    model: &'m Model,
    state: State,
    simulator: Simulator,
}

impl<'m> Simulation<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            state: State::new(model),
            simulator: Simulator::for_model(model),
        }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Advance by one timestep.
    pub fn step(&mut self) {
        self.simulator.step(self.model, &mut self.state);
    }

    /// Step while `time < t_end`; returns the number of steps taken.
    ///
    /// On return `t_end <= time < t_end + timestep` unless `time` already
    /// exceeded `t_end`.
    pub fn run_until(&mut self, t_end: f64) -> usize {
        let mut steps = 0;
        let mut diverged = false;
        while self.state.time < t_end {
            self.step();
            steps += 1;
            if !diverged && !self.state.is_finite() {
                diverged = true;
                tracing::warn!(time = self.state.time, "simulation state is no longer finite");
            }
        }
        tracing::debug!(steps, time = self.state.time, "simulation finished");
        steps
    }
}
