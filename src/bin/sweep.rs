use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speedup::sweep::{self, Sweep, DEFAULT_EXECUTABLE};

/// Run the performance benchmark once per power-of-two problem size and relay its output.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Path to the benchmark executable
    #[arg(short, long, default_value = DEFAULT_EXECUTABLE)]
    executable: PathBuf,

    /// Exponent of the smallest problem size
    #[arg(long, default_value_t = sweep::MIN_EXPONENT)]
    min_exp: u32,

    /// Exponent of the largest problem size
    #[arg(long, default_value_t = sweep::MAX_EXPONENT)]
    max_exp: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();

    let sweep = Sweep::new(opts.executable)
        .with_sizes(sweep::power_of_two_sizes(opts.min_exp, opts.max_exp));
    let report = sweep.run(&mut io::stdout().lock())?;
    info!(
        captured = report.captured(),
        passed_through = report.passed_through(),
        unavailable = report.unavailable(),
        "sweep complete"
    );

    if report.unavailable() > 0 {
        bail!(
            "{} of {} runs could not start {}",
            report.unavailable(),
            report.invocations.len(),
            sweep.executable().display()
        );
    }
    Ok(())
}
