use clap::Parser;
use kine_hello::{Cli, HelloError};
use std::io;
use std::process::ExitCode;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // Stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            eprint!("{err}");
            println!("{}", HelloError::usage(err));
            return ExitCode::FAILURE;
        }
    };

    init_tracing();

    let result = kine_hello::run(&cli, &mut io::stdout().lock());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}
