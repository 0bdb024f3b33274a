//! End to end handling of an apply request: describe the source, apply the submission, run the
//! source, and archive what it produced.


use std::{ffi::OsString, path::Path};

use serde::Serialize;

use crate::{
    ApplyOptions, ApplyReport, ArgumentLine, DescriptorAdapter, DescriptorCache, LiveAdapter,
    LiveSource, OutputSynthesis, RequestWorkspace, SkippedParm, Submission, ToolInvoker,
    ValueEngine, archive,
    apply::{DEFAULT_OUTPUT_EXTENSION, LiveTarget},
    error::{Error, Result},
};

/// Settings shared by both executors.
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    pub best_effort: bool,
    /// Extension of synthesised output files, without the leading dot.
    pub output_extension: String,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            best_effort: false,
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_owned(),
        }
    }
}

impl ExecuteOptions {
    fn value_engine(&self, workspace: &RequestWorkspace) -> ValueEngine {
        ValueEngine::new(ApplyOptions {
            best_effort: self.best_effort,
            outputs: Some(OutputSynthesis {
                dir: workspace.outputs_dir(),
                extension: self.output_extension.clone(),
            }),
        })
    }
}

/// Outcome of a successful request.
#[derive(Debug, Serialize)]
pub struct Execution {
    /// ZIP archive of the outputs.
    #[serde(skip)]
    pub archive: Vec<u8>,
    pub report: ApplyReport,
    pub skipped: Vec<SkippedParm>,
}

/// Runs descriptor sources through the build tool, using their cached descriptors to check the
/// submission.
pub struct DescriptorExecutor<T> {
    cache: DescriptorCache<T>,
    options: ExecuteOptions,
}

impl<T> DescriptorExecutor<T>
where
    T: ToolInvoker,
{
    pub fn new(cache: DescriptorCache<T>, options: ExecuteOptions) -> Self {
        Self { cache, options }
    }

    pub fn cache(&self) -> &DescriptorCache<T> {
        &self.cache
    }

    /// Builds `source_path` with the submitted values, archiving the outputs it was asked to
    /// write.
    pub fn execute(
        &self,
        source_path: &Path,
        submission: &Submission,
        workspace: &RequestWorkspace,
    ) -> Result<Execution> {
        let cached = self.cache.resolve(source_path)?;
        let described = DescriptorAdapter::describe(&cached.descriptor_path)?;

        let mut line = ArgumentLine::new();
        let report =
            self.options
                .value_engine(workspace)
                .apply(&described.value, submission, &mut line)?;

        let tool = self.cache.tool();
        log::info!("Building {:?} with {line}.", cached.source_path);
        let mut args: Vec<OsString> = vec![cached.source_path.clone().into_os_string()];
        args.extend(line.into_tokens());
        let output = tool.invoke(&args)?;
        if !output.is_success() {
            return Err(Error::ExternalProcess {
                program: tool.program().to_owned(),
                reason: output.describe_status(),
                stderr: output.stderr,
            });
        }

        let mut paths = Vec::with_capacity(report.expected_outputs.len());
        for expected in &report.expected_outputs {
            if !expected.path.is_file() {
                return Err(Error::ExternalProcess {
                    program: tool.program().to_owned(),
                    reason: format!(
                        "output {:?} was not written to {:?}",
                        expected.name, expected.path
                    ),
                    stderr: output.stderr,
                });
            }
            paths.push(expected.path.clone());
        }

        Ok(Execution {
            archive: archive::zip_files(&paths)?,
            report,
            skipped: described.skipped,
        })
    }
}

/// Cooks live node types with the submitted values, archiving everything written to the
/// workspace's outputs directory.
#[derive(Clone, Debug, Default)]
pub struct LiveExecutor {
    options: ExecuteOptions,
}

impl LiveExecutor {
    pub fn new(options: ExecuteOptions) -> Self {
        Self { options }
    }

    pub fn execute(
        &self,
        source: &dyn LiveSource,
        submission: &Submission,
        workspace: &RequestWorkspace,
    ) -> Result<Execution> {
        if source.is_installed() {
            source.reload().map_err(Error::LiveSource)?;
        } else {
            source.install().map_err(Error::LiveSource)?;
        }
        let described = LiveAdapter::describe(source)?;

        let mut instance = source
            .create_working_instance()
            .map_err(Error::LiveSource)?;
        let report = self.options.value_engine(workspace).apply(
            &described.value.parm_template_group,
            submission,
            &mut LiveTarget::new(instance.as_mut()),
        )?;

        let outputs_dir = workspace.outputs_dir();
        log::info!(
            "Cooking {:?} into {:?}.",
            described.value.node_type_name,
            outputs_dir
        );
        instance.cook(&outputs_dir).map_err(Error::LiveSource)?;
        drop(instance);

        Ok(Execution {
            archive: archive::zip_dir(&outputs_dir)?,
            report,
            skipped: described.skipped,
        })
    }
}
