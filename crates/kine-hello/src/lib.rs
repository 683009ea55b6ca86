//! Load a model, simulate it for a fixed duration and print a summary.

use clap::Parser;
use kine::{LoadError, Model, Simulation};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "hello", version, about)]
pub struct Cli {
    /// MJCF model file to simulate.
    pub model: PathBuf,

    /// Simulated time to run, in seconds.
    #[arg(long, env = "KINE_DURATION", default_value_t = 10.0, value_parser = parse_duration)]
    pub duration: f64,

    /// Index of the body whose final position is reported.
    #[arg(long, env = "KINE_BODY", default_value_t = 1)]
    pub body: usize,
}

fn parse_duration(s: &str) -> Result<f64, String> {
    let d: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if d.is_finite() && d >= 0.0 {
        Ok(d)
    } else {
        Err(format!("'{s}' is not a non-negative number of seconds"))
    }
}

#[derive(Debug, Error)]
pub enum HelloError {
    /// The command line did not name exactly one model file.
    #[error("{usage}")]
    Usage {
        usage: String,
        #[source]
        source: clap::Error,
    },

    #[error("Load model error: {0}")]
    Load(#[from] LoadError),

    #[error("could not write report: {0}")]
    Io(#[from] io::Error),
}

impl HelloError {
    pub fn usage(source: clap::Error) -> Self {
        use clap::CommandFactory;
        Self::Usage {
            usage: Cli::command().render_usage().to_string(),
            source,
        }
    }
}

/// Load the model named on the command line, run it and write the report to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<(), HelloError> {
    let model = kine::load_model(&cli.model)?;

    writeln!(out, "kine Hello World!")?;
    writeln!(out, "Model loaded successfully: {}", cli.model.display())?;
    write_counts(&model, out)?;
    writeln!(out)?;

    writeln!(out, "Running simulation for {} seconds...", cli.duration)?;
    let mut sim = Simulation::new(&model);
    let steps = sim.run_until(cli.duration);

    writeln!(out, "Simulation complete!")?;
    writeln!(out, "Total steps: {steps}")?;
    writeln!(out, "Final time: {:.3} seconds", sim.time())?;
    writeln!(out, "Timestep: {:.5} seconds", model.timestep())?;

    if model.nbody() > cli.body {
        writeln!(out)?;
        write_position(&model, &sim, cli.body, out)?;
    }
    Ok(())
}

fn write_counts<W: Write>(model: &Model, out: &mut W) -> io::Result<()> {
    writeln!(out, "Number of bodies: {}", model.nbody())?;
    writeln!(out, "Number of joints: {}", model.njnt())?;
    writeln!(out, "Number of geoms: {}", model.ngeom())?;
    writeln!(out, "Number of DOFs: {}", model.nv)
}

fn write_position<W: Write>(
    model: &Model,
    sim: &Simulation<'_>,
    body: usize,
    out: &mut W,
) -> io::Result<()> {
    let name = &model.bodies[body].name;
    if name.is_empty() {
        writeln!(out, "Final position of body {body}:")?;
    } else {
        writeln!(out, "Final position of body {body} ({name}):")?;
    }
    let pos = sim.state().body_pos(body);
    writeln!(out, "  x: {:.3}", pos.x)?;
    writeln!(out, "  y: {:.3}", pos.y)?;
    writeln!(out, "  z: {:.3}", pos.z)
}
