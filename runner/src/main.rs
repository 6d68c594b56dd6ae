//! Scenario runner for effect-yielding sagas.
//!
//! Drives scripted sagas described in scenario files against registered
//! substitutions. No effect is ever executed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use saga_runner::config::{HarnessConfig, load_config};
use saga_runner::errors::RunError;
use saga_runner::exit_codes;
use saga_runner::logging;
use saga_runner::scenario::Scenario;

#[derive(Parser)]
#[command(
    name = "saga-runner",
    version,
    about = "Deterministic test harness for effect-yielding sagas"
)]
struct Cli {
    /// Harness config (TOML). Defaults apply when the file is missing.
    #[arg(long, global = true, default_value = "saga-runner.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario's saga and print the run output as JSON.
    Run {
        scenario: PathBuf,
    },
    /// Check the expectations of one or more scenarios.
    Verify {
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match dispatch(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Run { scenario } => cmd_run(&scenario, config),
        Command::Verify { scenarios } => Ok(cmd_verify(&scenarios, &config)),
    }
}

fn cmd_run(path: &Path, config: HarnessConfig) -> Result<i32> {
    let scenario = Scenario::load(path)?;
    let mut runner = scenario
        .runner()
        .with_context(|| format!("prepare {}", path.display()))?
        .with_config(config);
    match runner.run() {
        Ok(output) => {
            let payload = serde_json::to_string_pretty(&*output).context("serialize run output")?;
            println!("{}", payload);
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            Ok(run_error_code(&err))
        }
    }
}

/// Verify every scenario; the highest exit code wins.
fn cmd_verify(paths: &[PathBuf], config: &HarnessConfig) -> i32 {
    paths
        .iter()
        .map(|path| verify_one(path, config))
        .max()
        .unwrap_or(exit_codes::OK)
}

fn verify_one(path: &Path, config: &HarnessConfig) -> i32 {
    let scenario = match Scenario::load(path) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("{:#}", err);
            return exit_codes::INVALID;
        }
    };
    match scenario.verify_with(config.clone()) {
        Ok(verdict) if verdict.passed() => {
            println!("ok {} ({} checks)", path.display(), verdict.checked);
            exit_codes::OK
        }
        Ok(verdict) => {
            println!(
                "FAILED {} ({} of {} checks)",
                path.display(),
                verdict.failures.len(),
                verdict.checked
            );
            for failure in &verdict.failures {
                println!("\n{}\n", failure);
            }
            exit_codes::FAILED
        }
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            run_error_code(&err)
        }
    }
}

fn run_error_code(err: &RunError) -> i32 {
    match err {
        RunError::Usage(_) => exit_codes::INVALID,
        RunError::Saga(_) => exit_codes::RAISED,
    }
}
