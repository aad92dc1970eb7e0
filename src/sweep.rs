//! Sequential invocation of the benchmark executable over a range of problem sizes.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

/// The benchmark executable's location relative to the directory the sweep is run from.
pub const DEFAULT_EXECUTABLE: &str = "../bin/performance_tests";

/// The smallest default problem size is `2^MIN_EXPONENT`.
pub const MIN_EXPONENT: u32 = 10;

/// The largest default problem size is `2^MAX_EXPONENT`.
pub const MAX_EXPONENT: u32 = 20;

/// An error which aborts a sweep.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// Capturing the benchmark's output failed for a reason a direct invocation won't fix.
    #[error("unable to run {} -n {size}: {source}", .executable.display())]
    Capture {
        /// The benchmark executable.
        executable: PathBuf,
        /// The problem size it was run with.
        size: u64,
        /// The underlying failure.
        source: io::Error,
    },
    /// Invoking the benchmark directly failed for an unexpected reason.
    #[error("unable to run {} -n {size} directly: {source}", .executable.display())]
    Direct {
        /// The benchmark executable.
        executable: PathBuf,
        /// The problem size it was run with.
        size: u64,
        /// The underlying failure.
        source: io::Error,
    },
    /// Captured output could not be relayed.
    #[error("unable to write benchmark output: {0}")]
    Output(#[source] io::Error),
}

/// The outcome of running the benchmark at a single problem size.
#[derive(Debug)]
pub enum Invocation {
    /// The benchmark's output was captured and relayed.
    Captured {
        /// The problem size.
        size: u64,
        /// The benchmark's exit status.
        status: ExitStatus,
        /// The benchmark's standard output.
        stdout: String,
    },
    /// Capturing failed, so the benchmark was run again writing directly to the terminal.
    PassedThrough {
        /// The problem size.
        size: u64,
        /// The benchmark's exit status.
        status: ExitStatus,
    },
    /// Neither capturing nor the direct fallback could start the benchmark.
    Unavailable {
        /// The problem size.
        size: u64,
        /// Why the fallback could not start the benchmark.
        reason: io::Error,
    },
}

impl Invocation {
    /// The problem size the benchmark was run with.
    pub const fn size(&self) -> u64 {
        match self {
            Invocation::Captured { size, .. }
            | Invocation::PassedThrough { size, .. }
            | Invocation::Unavailable { size, .. } => *size,
        }
    }
}

/// The outcomes of every invocation of a sweep, in order.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// One entry per problem size.
    pub invocations: Vec<Invocation>,
}

impl SweepReport {
    /// The number of runs whose output was captured.
    pub fn captured(&self) -> usize {
        self.invocations.iter().filter(|i| matches!(i, Invocation::Captured { .. })).count()
    }

    /// The number of runs which fell back to writing directly to the terminal.
    pub fn passed_through(&self) -> usize {
        self.invocations.iter().filter(|i| matches!(i, Invocation::PassedThrough { .. })).count()
    }

    /// The number of runs which could not start the benchmark at all.
    pub fn unavailable(&self) -> usize {
        self.invocations.iter().filter(|i| matches!(i, Invocation::Unavailable { .. })).count()
    }
}

/// Powers of two from `2^min_exp` to `2^max_exp` inclusive. Exponents too large for a `u64` are
/// dropped.
pub fn power_of_two_sizes(min_exp: u32, max_exp: u32) -> Vec<u64> {
    (min_exp..=max_exp).filter_map(|e| 1u64.checked_shl(e)).collect()
}

/// A sweep of the benchmark executable over a sequence of problem sizes.
#[derive(Debug, Clone)]
pub struct Sweep {
    executable: PathBuf,
    sizes: Vec<u64>,
}

impl Sweep {
    /// Sweep the given executable over the default sizes, 1024 up to 1048576 networks.
    pub fn new<P: Into<PathBuf>>(executable: P) -> Sweep {
        Sweep { executable: executable.into(), sizes: Sweep::default_sizes() }
    }

    /// The default problem sizes.
    pub fn default_sizes() -> Vec<u64> {
        power_of_two_sizes(MIN_EXPONENT, MAX_EXPONENT)
    }

    /// Use the given problem sizes instead, run in the given order.
    pub fn with_sizes(mut self, sizes: Vec<u64>) -> Sweep {
        self.sizes = sizes;
        self
    }

    /// The executable being swept.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The problem sizes being swept.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Run the benchmark once per problem size, writing captured output to `out`. Each run
    /// completes before the next begins.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();
        for &size in &self.sizes {
            info!(size, "running benchmark");
            report.invocations.push(self.invoke(size, out)?);
        }
        Ok(report)
    }

    /// Run the benchmark at a single problem size.
    ///
    /// If the benchmark can't be started or its output isn't UTF-8, it is run a second time with
    /// its output inherited by this process. Any other capture failure is an error.
    pub fn invoke<W: Write>(&self, size: u64, out: &mut W) -> Result<Invocation, SweepError> {
        let err = match self.capture(size) {
            Ok((status, stdout)) => {
                debug!(size, %status, bytes = stdout.len(), "captured benchmark output");
                writeln!(out, "{}", stdout).map_err(SweepError::Output)?;
                return Ok(Invocation::Captured { size, status, stdout });
            }
            Err(e) if is_recoverable(&e) => e,
            Err(source) => {
                return Err(SweepError::Capture { executable: self.executable.clone(), size, source })
            }
        };

        warn!(size, error = %err, "unable to capture benchmark output, running directly");
        // captured output may still be buffered ahead of the child's
        out.flush().map_err(SweepError::Output)?;
        match self.command(size).status() {
            Ok(status) => {
                debug!(size, %status, "benchmark ran directly");
                Ok(Invocation::PassedThrough { size, status })
            }
            Err(reason) if is_recoverable(&reason) => {
                warn!(
                    size,
                    error = %reason,
                    executable = %self.executable.display(),
                    "benchmark unavailable"
                );
                Ok(Invocation::Unavailable { size, reason })
            }
            Err(source) => {
                Err(SweepError::Direct { executable: self.executable.clone(), size, source })
            }
        }
    }

    fn capture(&self, size: u64) -> io::Result<(ExitStatus, String)> {
        let output = self.command(size).stderr(Stdio::inherit()).output()?;
        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok((output.status, stdout))
    }

    fn command(&self, size: u64) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-n").arg(size.to_string());
        cmd
    }
}

/// Failures a direct invocation is expected to either survive or report more usefully.
fn is_recoverable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied | io::ErrorKind::InvalidData
    )
}
