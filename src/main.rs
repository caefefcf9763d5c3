//! SeisFlows CLI Entry Point
//!
//! Provides the command-line interface for the workflow lifecycle.
//!
//! # Usage
//!
//! ```bash
//! # Start a new run from parameters.yaml in the current directory
//! seisflows submit
//!
//! # Continue an interrupted run
//! seisflows resume --workdir /scratch/marmousi
//!
//! # Inspect and edit checkpointed state
//! seisflows debug
//!
//! # Remove output, logs and scratch, then start over
//! seisflows restart --yes
//! ```

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;

use seisflows::config::paths::absolutize;
use seisflows::lifecycle::{
    run_shell, AssumeYes, Lifecycle, Outcome, Prompt, RunOptions, TerminalPrompt,
    DEFAULT_PARAMETER_FILE,
};
use seisflows::{SeisflowsError, APP_NAME, VERSION};

/// Lifecycle operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Task {
    /// Start a new run
    Submit,
    /// Continue from the last checkpoint
    Resume,
    /// Reload the last checkpoint into an interactive shell
    Debug,
    /// Remove output, logs and scratch
    Clean,
    /// Clean, then submit
    Restart,
    /// Validate the parameter file without running anything
    Check,
}

#[derive(Debug, Parser)]
#[command(name = "seisflows", version, about = "Seismic inversion workflow manager")]
struct Cli {
    #[arg(value_enum)]
    task: Task,

    /// Run directory (default: current directory)
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// Parameter file, relative to the run directory
    #[arg(
        short,
        long = "parameter-file",
        alias = "parameter_file",
        default_value = DEFAULT_PARAMETER_FILE
    )]
    parameter_file: PathBuf,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Seismic Inversion Workflow Manager");
    println!();
}

/// Resolves the run directory against the current directory.
fn resolve_workdir(workdir: Option<PathBuf>) -> Result<PathBuf, SeisflowsError> {
    let current = env::current_dir().map_err(|e| SeisflowsError::io("read current directory", e))?;
    let workdir = match workdir {
        Some(dir) => absolutize(&dir, &current),
        None => current,
    };
    info!("Working directory: {}", workdir.display());
    Ok(workdir)
}

/// Main application logic. Returns the process exit code on success.
fn run(cli: Cli) -> Result<ExitCode, SeisflowsError> {
    let workdir = resolve_workdir(cli.workdir)?;
    let options = RunOptions::new(workdir).with_parameter_file(cli.parameter_file);

    let prompt: Box<dyn Prompt> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt)
    };
    let mut lifecycle = Lifecycle::new(options, prompt);

    let outcome = match cli.task {
        Task::Submit => lifecycle.submit()?,
        Task::Resume => lifecycle.resume()?,
        Task::Restart => lifecycle.restart()?,
        Task::Clean => lifecycle.clean()?,
        Task::Check => lifecycle.check()?,
        Task::Debug => {
            let mut session = lifecycle.debug()?;
            let stdin = io::stdin();
            run_shell(&mut session, stdin.lock(), io::stdout())?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    match outcome {
        Outcome::Ran(summary) => {
            if let Some(stage) = summary.stopped_after {
                info!("Stopped after '{}'; run `seisflows resume` to continue", stage);
            } else if summary.finished {
                info!("Workflow complete");
            }
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Checked | Outcome::Cleaned(_) => Ok(ExitCode::SUCCESS),
        // A declined clean changes nothing and is not a failure.
        Outcome::Declined if cli.task == Task::Clean => Ok(ExitCode::SUCCESS),
        Outcome::Declined => {
            info!("Aborted by user");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    print_banner();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
