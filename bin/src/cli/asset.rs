use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use engine::{LiveAdapter, LiveExecutor, LiveSource, ManifestLiveSource};

use crate::{
    cli::{create_workspace, print_json, submission::SubmissionArgs, write_archive},
    config::Config,
};

/// Prints the definition of an asset, read from its YAML manifest, as JSON.
#[derive(Args, Debug)]
pub struct DescribeCommand {
    /// Path to the asset manifest.
    manifest: PathBuf,
}

/// Cooks an asset with the given values, writing everything it outputs to a ZIP archive.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Path to the asset manifest.
    manifest: PathBuf,

    #[command(flatten)]
    submission: SubmissionArgs,

    /// Path to write the ZIP archive of outputs to.
    #[arg(long)]
    output: PathBuf,
}

pub fn describe(cmd: &DescribeCommand, config: &Config) -> Result<()> {
    let source = ManifestLiveSource::new(&cmd.manifest, config.tool_timeout);
    source
        .install()
        .with_context(|| format!("installing {:?}", cmd.manifest))?;
    let described = LiveAdapter::describe(&source)
        .with_context(|| format!("describing {:?}", cmd.manifest))?;
    print_json(&described.value)
}

pub fn apply(cmd: &ApplyCommand, config: &Config) -> Result<()> {
    let source = ManifestLiveSource::new(&cmd.manifest, config.tool_timeout);
    let workspace = create_workspace(config, &cmd.manifest)?;
    let submission = cmd.submission.stage(&workspace)?;

    let execution = LiveExecutor::new(config.execute_options())
        .execute(&source, &submission, &workspace)
        .with_context(|| format!("cooking {:?}", cmd.manifest))?;

    write_archive(&cmd.output, &execution.archive)?;
    workspace.close()?;
    print_json(&execution)
}
