use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speedup::plot::{self, PlotConfig, Typeface, DEFAULT_OUTPUT};

/// Aggregate the GPU speedups of a benchmark log and plot them against problem size.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Path to the benchmark log
    log: PathBuf,

    /// Where to write the SVG chart
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Typeface of the chart's text: times, helvetica, or computer-modern
    #[arg(long, default_value_t = Typeface::default())]
    font: Typeface,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let opts = Opts::parse();

    let stats = speedup::aggregate_file(&opts.log)
        .with_context(|| format!("unable to aggregate {}", opts.log.display()))?;
    info!(groups = stats.len(), "aggregated log");

    let mut out = csv::Writer::from_writer(io::stdout());
    out.write_record(["size", "count", "mean", "stddev"])?;
    for s in &stats {
        out.write_record(&[
            s.size.to_string(),
            s.count.to_string(),
            s.mean.to_string(),
            s.stddev.to_string(),
        ])?;
    }
    out.flush()?;

    let config = PlotConfig { output: opts.output, typeface: opts.font, ..PlotConfig::default() };
    plot::plot(&stats, &config)?;
    info!(path = %config.output.display(), "wrote chart");

    Ok(())
}
