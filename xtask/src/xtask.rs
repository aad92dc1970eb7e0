use anyhow::Result;
use clap::{Parser, Subcommand};
use xshell::{cmd, Shell};

#[derive(Debug, Parser)]
struct XTask {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Format, lint, and test.
    Ci,
    /// Format the code.
    Format,
    /// Run clippy over every target.
    Clippy,
    /// Run the tests, with and without the command line tools.
    Test,
    /// Run the benchmarks.
    Bench,
}

fn main() -> Result<()> {
    let xtask = XTask::parse();
    let sh = Shell::new()?;
    match xtask.cmd.unwrap_or(Command::Ci) {
        Command::Ci => {
            cmd!(sh, "cargo fmt --all -- --check").run()?;
            clippy(&sh)?;
            test(&sh)
        }
        Command::Format => Ok(cmd!(sh, "cargo fmt --all").run()?),
        Command::Clippy => clippy(&sh),
        Command::Test => test(&sh),
        Command::Bench => Ok(cmd!(sh, "cargo bench").run()?),
    }
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --all-features --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo test --all-features").run()?;
    cmd!(sh, "cargo test --no-default-features --lib").run()?;
    Ok(())
}
