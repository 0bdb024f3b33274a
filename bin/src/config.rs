use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Args;
use engine::{ExecuteOptions, apply::DEFAULT_OUTPUT_EXTENSION};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "harpoon.yaml";
const XDG_PREFIX: &str = "harpoon";
const DEFAULT_BUILD_TOOL: &str = "gaea.build.exe";

/// CLI arguments relating to [Config].
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Path to the configuration file. Defaults to harpoon.yaml in the XDG configuration
    /// directories, or built in defaults if there is none.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<Config> {
        let path = self.config.clone().or_else(|| {
            xdg::BaseDirectories::with_prefix(XDG_PREFIX).find_config_file(CONFIG_FILE_NAME)
        });
        match path {
            Some(path) => load_config(&path),
            None => {
                log::debug!("No {CONFIG_FILE_NAME} found, using defaults.");
                Ok(YamlConfig::default().prepare(None))
            }
        }
    }
}

/// Loads the configuration from the file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let file =
        std::fs::File::open(path).with_context(|| format!("opening configuration {:?}", path))?;
    let config: YamlConfig = serde_yaml_ng::from_reader(file)
        .with_context(|| format!("parsing configuration {:?}", path))?;
    log::debug!("Loaded configuration {:?}.", path);
    Ok(config.prepare(path.parent()))
}

/// Configuration, read and prepared from a `harpoon.yaml`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory that request workspaces are created in.
    pub workspace_root: PathBuf,
    /// Program that compiles and builds descriptor sources.
    pub build_tool: PathBuf,
    pub tool_timeout: Option<Duration>,
    pub output_extension: String,
    pub best_effort: bool,
}

impl Config {
    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            best_effort: self.best_effort,
            output_extension: self.output_extension.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    #[serde(default)]
    workspace_root: Option<PathBuf>,
    #[serde(default)]
    build_tool: Option<PathBuf>,
    #[serde(default)]
    tool_timeout_secs: Option<u64>,
    #[serde(default)]
    output_extension: Option<String>,
    #[serde(default)]
    best_effort: bool,
}

impl YamlConfig {
    /// Creates a `Config` from self. Relative paths are resolved against `base_dir`, the directory
    /// containing the configuration file.
    fn prepare(self, base_dir: Option<&Path>) -> Config {
        let resolve = |path: PathBuf| match base_dir {
            // Bare program names are searched for on PATH instead.
            Some(dir) if path.is_relative() && path.components().count() > 1 => dir.join(path),
            _ => path,
        };
        Config {
            workspace_root: self
                .workspace_root
                .map(|root| match base_dir {
                    Some(dir) if root.is_relative() => dir.join(root),
                    _ => root,
                })
                .unwrap_or_else(|| std::env::temp_dir().join(XDG_PREFIX)),
            build_tool: self
                .build_tool
                .map(resolve)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_TOOL)),
            tool_timeout: self.tool_timeout_secs.map(Duration::from_secs),
            output_extension: self
                .output_extension
                .map(|ext| ext.trim_start_matches('.').to_owned())
                .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_owned()),
            best_effort: self.best_effort,
        }
    }
}
