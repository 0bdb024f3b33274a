use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use engine::{DescriptorAdapter, DescriptorCache, DescriptorExecutor, ExternalTool};

use crate::{
    cli::{create_workspace, print_json, submission::SubmissionArgs, write_archive},
    config::Config,
};

/// Prints the parameters of a build graph source as JSON, compiling its descriptor first if it
/// is missing or out of date.
#[derive(Args, Debug)]
pub struct DescribeCommand {
    /// Path to the build graph source.
    source: PathBuf,
}

/// Builds a build graph source with the given values, writing its outputs to a ZIP archive.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Path to the build graph source.
    source: PathBuf,

    #[command(flatten)]
    submission: SubmissionArgs,

    /// Path to write the ZIP archive of outputs to.
    #[arg(long)]
    output: PathBuf,
}

fn new_cache(config: &Config) -> Result<DescriptorCache<ExternalTool>> {
    let tool = ExternalTool::locate(&config.build_tool, config.tool_timeout)
        .with_context(|| "locating the build tool")?;
    Ok(DescriptorCache::new(tool))
}

pub fn describe(cmd: &DescribeCommand, config: &Config) -> Result<()> {
    let cache = new_cache(config)?;
    let cached = cache
        .resolve(&cmd.source)
        .with_context(|| format!("resolving descriptor of {:?}", cmd.source))?;
    log::info!("Descriptor of {:?}: {}.", cmd.source, cached.transition);
    let described = DescriptorAdapter::describe(&cached.descriptor_path)
        .with_context(|| format!("describing {:?}", cached.descriptor_path))?;
    print_json(&described.value)
}

pub fn apply(cmd: &ApplyCommand, config: &Config) -> Result<()> {
    let executor = DescriptorExecutor::new(new_cache(config)?, config.execute_options());
    let workspace = create_workspace(config, &cmd.source)?;
    let submission = cmd.submission.stage(&workspace)?;

    let execution = executor
        .execute(&cmd.source, &submission, &workspace)
        .with_context(|| format!("building {:?}", cmd.source))?;

    write_archive(&cmd.output, &execution.archive)?;
    workspace.close()?;
    print_json(&execution)
}
