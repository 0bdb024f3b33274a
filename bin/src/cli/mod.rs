use std::{io::Write, path::Path, process::ExitCode};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use clap::{Parser, Subcommand};
use serde::Serialize;
use simplelog::LevelFilter;

use crate::config::{Config, ConfigArgs};

mod asset;
mod descriptor;
mod submission;

/// Describes the parameters of procedural assets and build graphs, and runs them with submitted
/// values.
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Logging level.
    #[arg(long, default_value = "Warn", global = true)]
    log_level: LevelFilter,

    #[command(flatten)]
    config: ConfigArgs,

    /// Skip submitted values that fail to decode, reporting them, instead of rejecting the whole
    /// request.
    #[arg(long, global = true)]
    best_effort: bool,
}

#[derive(Subcommand)]
enum Command {
    DescribeDescriptor(descriptor::DescribeCommand),
    ApplyDescriptor(descriptor::ApplyCommand),
    DescribeAsset(asset::DescribeCommand),
    ApplyAsset(asset::ApplyCommand),
}

pub fn run() -> ExitCode {
    let args = Args::parse();
    match run_args(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            match serde_json::to_string(&FailureReport::from(&err)) {
                Ok(report) => eprintln!("{report}"),
                Err(_) => eprintln!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run_args(args: &Args) -> Result<()> {
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())
        .with_context(|| "configuring logging")?;

    let mut config = args.config.load()?;
    config.best_effort |= args.best_effort;

    use Command::*;
    match &args.command {
        DescribeDescriptor(cmd) => descriptor::describe(cmd, &config),
        ApplyDescriptor(cmd) => descriptor::apply(cmd, &config),
        DescribeAsset(cmd) => asset::describe(cmd, &config),
        ApplyAsset(cmd) => asset::apply(cmd, &config),
    }
}

/// Structured description of a failed command, written to stderr.
#[derive(Debug, PartialEq, Serialize)]
struct FailureReport {
    kind: String,
    subject: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
}

impl From<&anyhow::Error> for FailureReport {
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        match err.downcast_ref::<engine::Error>() {
            Some(engine_err) => {
                let report = engine::ErrorReport::from(engine_err);
                Self {
                    kind: report.kind.to_string(),
                    subject: report.subject,
                    message,
                    stderr: report.stderr,
                }
            }
            None => Self {
                kind: "Other".to_owned(),
                subject: None,
                message,
                stderr: None,
            },
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).with_context(|| "writing JSON to stdout")?;
    writeln!(stdout).with_context(|| "writing JSON to stdout")?;
    Ok(())
}

/// Writes the output archive, replacing any existing file only once it is complete.
fn write_archive(path: &Path, archive: &[u8]) -> Result<()> {
    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("opening output archive {:?} for writing", path))?;
    file.write_all(archive)
        .with_context(|| format!("writing output archive {:?}", path))?;
    file.commit()
        .with_context(|| format!("committing output archive {:?}", path))?;
    log::info!("Wrote {} bytes to {:?}.", archive.len(), path);
    Ok(())
}

/// Creates the workspace for one command invocation.
fn create_workspace(config: &Config, source: &Path) -> Result<engine::RequestWorkspace> {
    let identity = engine::RequestIdentity::new("cli", source.display().to_string());
    engine::RequestWorkspace::create(&config.workspace_root, &identity)
        .with_context(|| format!("creating request workspace for {:?}", source))
}
