//! A [LiveSource] backed by a YAML asset manifest on disk.
//!
//! ```yaml
//! nodeTypeName: rocks
//! nodeTypeCategory: Sop
//! parmTemplateGroup:
//!   name: rocks
//!   label: Rocks
//!   entries:
//!     - {type: Int, name: count, label: Count, defaultValue: [10]}
//! cook:
//!   program: ./cook-rocks
//!   args: [--quiet]
//! ```
//!
//! Cooking writes the applied values to `parameters.json` in the output directory, then runs the
//! optional cook command with that file and the output directory appended to its arguments.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    ExternalTool, ToolInvoker,
    apply::ParmValue,
    live::{LiveDefinition, LiveInstance, LiveSource},
};

pub const PARAMETERS_FILE_NAME: &str = "parameters.json";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(flatten)]
    definition: LiveDefinition,
    #[serde(default)]
    cook: Option<CookCommand>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CookCommand {
    /// Program to run. Relative paths with a directory component are relative to the manifest.
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

pub struct ManifestLiveSource {
    manifest_path: PathBuf,
    tool_timeout: Option<Duration>,
    installed: Mutex<Option<Manifest>>,
}

impl ManifestLiveSource {
    /// Creates an uninstalled source for the manifest at `manifest_path`.
    pub fn new(manifest_path: impl Into<PathBuf>, tool_timeout: Option<Duration>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            tool_timeout,
            installed: Mutex::new(None),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    fn read_manifest(&self) -> Result<Manifest> {
        let file = std::fs::File::open(&self.manifest_path)
            .with_context(|| format!("opening asset manifest {:?}", self.manifest_path))?;
        let mut manifest: Manifest = serde_yaml_ng::from_reader(file)
            .with_context(|| format!("parsing asset manifest {:?}", self.manifest_path))?;
        if manifest.definition.library_file_path.is_empty() {
            manifest.definition.library_file_path = self.manifest_path.display().to_string();
        }
        if let Some(cook) = &mut manifest.cook {
            if cook.program.components().count() > 1 && cook.program.is_relative() {
                if let Some(dir) = self.manifest_path.parent() {
                    cook.program = dir.join(&cook.program);
                }
            }
        }
        Ok(manifest)
    }

    fn load(&self) -> Result<()> {
        let manifest = self.read_manifest()?;
        *self
            .installed
            .lock()
            .expect("failed to lock installed manifest for loading") = Some(manifest);
        Ok(())
    }

    fn current(&self) -> Result<Manifest> {
        let installed = self
            .installed
            .lock()
            .expect("failed to lock installed manifest for reading")
            .clone();
        match installed {
            Some(manifest) => Ok(manifest),
            None => self.read_manifest(),
        }
    }
}

impl LiveSource for ManifestLiveSource {
    fn definition(&self) -> Result<LiveDefinition> {
        Ok(self.current()?.definition)
    }

    fn is_installed(&self) -> bool {
        self.installed
            .lock()
            .expect("failed to lock installed manifest for checking")
            .is_some()
    }

    fn install(&self) -> Result<()> {
        log::info!("Installing asset manifest {:?}.", self.manifest_path);
        self.load()
    }

    fn reload(&self) -> Result<()> {
        log::debug!("Reloading asset manifest {:?}.", self.manifest_path);
        self.load()
    }

    fn create_working_instance(&self) -> Result<Box<dyn LiveInstance>> {
        let manifest = self.current()?;
        Ok(Box::new(ManifestInstance {
            cook: manifest.cook,
            tool_timeout: self.tool_timeout,
            parameters: CookParameters::default(),
        }))
    }
}

/// Contents of the parameters file written by a cook.
#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CookParameters {
    pub values: BTreeMap<String, serde_json::Value>,
    pub files: BTreeMap<String, PathBuf>,
}

struct ManifestInstance {
    cook: Option<CookCommand>,
    tool_timeout: Option<Duration>,
    parameters: CookParameters,
}

impl LiveInstance for ManifestInstance {
    fn set_parameter_value(&mut self, name: &str, value: &ParmValue) -> Result<()> {
        self.parameters
            .values
            .insert(name.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    fn set_parameter_file(&mut self, name: &str, path: &Path) -> Result<()> {
        self.parameters
            .files
            .insert(name.to_owned(), path.to_owned());
        Ok(())
    }

    fn cook(&mut self, output_dir: &Path) -> Result<()> {
        let parameters_path = output_dir.join(PARAMETERS_FILE_NAME);
        let file = std::fs::File::create(&parameters_path)
            .with_context(|| format!("creating {:?}", parameters_path))?;
        serde_json::to_writer_pretty(file, &self.parameters)
            .with_context(|| format!("writing {:?}", parameters_path))?;

        let Some(cook) = &self.cook else {
            return Ok(());
        };
        let tool = ExternalTool::locate(&cook.program, self.tool_timeout)?;
        let mut args: Vec<OsString> = cook.args.iter().map(OsString::from).collect();
        args.push(parameters_path.into());
        args.push(output_dir.into());
        let output = tool.invoke(&args)?;
        if !output.is_success() {
            bail!(
                "cook command {:?} {}: {}",
                tool.program(),
                output.describe_status(),
                output.stderr.trim()
            );
        }
        Ok(())
    }
}
