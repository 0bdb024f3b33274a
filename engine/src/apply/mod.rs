//! Type checked application of submitted values onto a target.

mod target;
mod value;

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use schema::{ParmTemplate, ParmTemplateGroup};
use serde::Serialize;

use crate::error::{Error, ErrorReport, Result};

pub use target::{ApplyTarget, ArgumentLine, LiveTarget};
pub use value::{ParmScalar, ParmValue};
pub(crate) use value::integral_float;

pub const DEFAULT_OUTPUT_EXTENSION: &str = "exr";

/// Values submitted for one request.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    /// JSON encoded values by parameter name.
    pub values: HashMap<String, String>,
    /// Paths of uploaded files by parameter name.
    pub files: HashMap<String, PathBuf>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, json: impl Into<String>) -> Self {
        self.values.insert(name.into(), json.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.into(), path.into());
        self
    }
}

/// Where to synthesise paths for outputs that nothing was submitted for.
#[derive(Clone, Debug)]
pub struct OutputSynthesis {
    pub dir: PathBuf,
    pub extension: String,
}

impl OutputSynthesis {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: DEFAULT_OUTPUT_EXTENSION.to_owned(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ApplyOptions {
    /// Skip and report values that fail to decode, instead of failing the whole call.
    pub best_effort: bool,
    pub outputs: Option<OutputSynthesis>,
}

/// An output path that the target is expected to write.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExpectedOutput {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Default, Serialize)]
pub struct ApplyReport {
    /// Names of the parameters that had a submitted value or file applied, in application order.
    pub applied: Vec<String>,
    /// Submissions skipped in best effort mode.
    pub rejected: Vec<ErrorReport>,
    pub expected_outputs: Vec<ExpectedOutput>,
}

/// Decodes submissions against a [ParmTemplateGroup] and applies them to an [ApplyTarget].
#[derive(Clone, Debug, Default)]
pub struct ValueEngine {
    options: ApplyOptions,
}

impl ValueEngine {
    pub fn new(options: ApplyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Applies `submission` to `target`: decoded values first, then files, then synthesised
    /// output paths.
    ///
    /// Every submission is checked before anything is applied, so in strict mode a failure
    /// leaves the target untouched.
    pub fn apply(
        &self,
        group: &ParmTemplateGroup,
        submission: &Submission,
        target: &mut dyn ApplyTarget,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        for name in submission.values.keys().chain(submission.files.keys()) {
            if group.find(name).is_none() {
                log::info!("Ignoring submission for unknown parameter {name:?}.");
            }
        }

        let mut values: Vec<(&str, ParmValue)> = Vec::new();
        let mut files: Vec<(&str, &Path)> = Vec::new();
        let mut submitted: Vec<&str> = Vec::new();
        for template in group {
            let name = template.name();
            if let Some(raw) = submission.values.get(name) {
                match self.recover(value::decode(template, raw), &mut report)? {
                    Some(Some(value)) => {
                        values.push((name, value));
                        submitted.push(name);
                    }
                    Some(None) => log::debug!("Empty submission for {name:?}, leaving it unset."),
                    None => {}
                }
            }
            if let Some(path) = submission.files.get(name) {
                if self.recover(check_accepts_file(template), &mut report)?.is_some() {
                    files.push((name, path));
                    submitted.push(name);
                }
            }
        }

        for (name, value) in &values {
            log::debug!("Applying {name} = {value}.");
            target.apply_value(name, value)?;
            report.applied.push((*name).to_owned());
        }
        for (name, path) in &files {
            log::debug!("Applying file {name} = {:?}.", path);
            target.apply_file(name, path)?;
            report.applied.push((*name).to_owned());
        }

        if let Some(outputs) = &self.options.outputs {
            for template in group
                .iter()
                .filter(|t| t.is_output_file() && !submitted.contains(&t.name()))
            {
                let path = outputs.path_for(template.name());
                log::debug!("Expecting output {} at {:?}.", template.name(), path);
                target.apply_file(template.name(), &path)?;
                report.expected_outputs.push(ExpectedOutput {
                    name: template.name().to_owned(),
                    path,
                });
            }
        }

        Ok(report)
    }

    /// In best effort mode, records a failure and returns `Ok(None)`. Otherwise returns it.
    fn recover<T>(&self, result: Result<T>, report: &mut ApplyReport) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.options.best_effort && is_submission_error(&err) => {
                log::warn!("Skipping submitted value: {err}");
                report.rejected.push(ErrorReport::from(&err));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn is_submission_error(err: &Error) -> bool {
    matches!(err, Error::ValueDecode { .. } | Error::ValueArity { .. })
}

fn check_accepts_file(template: &ParmTemplate) -> Result<()> {
    match template {
        ParmTemplate::String(_) => Ok(()),
        other => Err(Error::ValueDecode {
            name: other.name().to_owned(),
            reason: format!("a {} parameter does not accept files", other.template_type()),
        }),
    }
}
