use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use layout_migrator_core::vcs::DEFAULT_SEARCH_DEPTH;
use layout_migrator_core::{AutoCommit, GitRepository, MigrationReport, Pipeline, ProjectUnit, StepSource};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_LEVEL_VAR: &str = "MIGRATOR_LOG_LEVEL";

/// Migrator - move cartridge projects from the legacy layout to the new one
#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(version)] // Auto-pull version from Cargo.toml
#[command(about = "Apply ordered migration steps to cartridge projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Don't commit after each step
    #[arg(long, global = true)]
    no_auto_commit: bool,

    /// Write the JSON report to this file
    #[arg(long, global = true, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<Level>,

    /// Debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate a single project unit
    Project(Target),
    /// Migrate every project unit below a workspace root
    Projects(Target),
}

#[derive(Args, Debug)]
struct Target {
    /// Project unit or workspace root directory
    dir: PathBuf,

    /// Step directory, or `bundled:<prefix>` for the built-in catalog
    steps: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("Error: {:#}", err);
        return ExitCode::FAILURE;
    }
    debug!("migrator v{} starting", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (target, workspace) = match &cli.command {
        Commands::Project(target) => (target, false),
        Commands::Projects(target) => (target, true),
    };
    let dir = existing_dir(&target.dir)?;
    let source = StepSource::parse(&target.steps);
    if let StepSource::Directory(steps) = &source {
        existing_dir(steps)?;
    }

    let mut pipeline = Pipeline::default();
    if cli.no_auto_commit {
        info!("auto-commit disabled");
    } else {
        let repository = GitRepository::discover(&dir, DEFAULT_SEARCH_DEPTH)?;
        info!(root = %repository.root().display(), "committing after each step");
        pipeline = pipeline.with_hook(AutoCommit::new(repository));
    }

    let report = if workspace {
        pipeline.run_workspace(&dir, &source)?
    } else {
        pipeline.run(&[ProjectUnit::from_path(&dir)], &source)?
    };

    print!("{}", report.summary());
    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }
    Ok(())
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("'{}' is not a directory", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", path.display()))
}

fn write_report(report: &MigrationReport, path: &Path) -> Result<()> {
    let json = report.to_json().context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to '{}'", path.display()))?;
    info!(report = %path.display(), "report written");
    Ok(())
}

/// RUST_LOG wins, then the command line, then MIGRATOR_LOG_LEVEL
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(log_level(cli)?.to_string())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to initialize logging")
}

fn log_level(cli: &Cli) -> Result<Level> {
    if let Some(level) = cli.log_level {
        return Ok(level);
    }
    if cli.verbose {
        return Ok(Level::DEBUG);
    }
    if cli.quiet {
        return Ok(Level::ERROR);
    }
    match env::var(LOG_LEVEL_VAR) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid {} '{}'", LOG_LEVEL_VAR, value)),
        Err(_) => Ok(Level::INFO),
    }
}
