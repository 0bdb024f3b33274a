//! Fakes shared by tests within this crate.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{Error, Result, ToolInvoker, ToolOutput};

/// Minimal descriptor with one parameter of each supported type.
pub const NODEMAP_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<NodeMap>
  <Parameter Owner="Mountain" Name="Seed" Variable="seed" Type="int" Default="3" Min="0" Max="100" />
  <Parameter Owner="Mountain" Name="Style" Variable="style" Type="choice" Default="1" Choices="Basic,Eroded,Old" />
  <Parameter Owner="Mountain" Name="Scale" Variable="scale" Type="double" Default="0.5" Min="0" Max="1" />
  <Parameter Owner="Mountain" Name="Bulk" Variable="bulk" Type="bool" Default="true" />
  <Parameter Owner="Input" Name="Mask" Variable="mask" Type="in" />
  <Parameter Owner="Output" Name="Height" Variable="height" Type="out" />
</NodeMap>
"#;

type Respond = dyn Fn(&[OsString]) -> Result<ToolOutput> + Send + Sync;

/// [ToolInvoker] that records its calls and responds with a closure instead of running anything.
pub struct FakeTool {
    program: PathBuf,
    calls: Mutex<Vec<Vec<OsString>>>,
    respond: Box<Respond>,
}

impl FakeTool {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[OsString]) -> Result<ToolOutput> + Send + Sync + 'static,
    {
        Self {
            program: PathBuf::from("fake-build-tool"),
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// A build tool that writes `xml` as the descriptor of the source named by its first
    /// argument.
    pub fn compiling(xml: &'static str) -> Self {
        Self::new(move |args| {
            let source = Path::new(&args[0]);
            std::fs::write(source.with_extension("xml"), xml).map_err(|error| Error::Io {
                context: "fake compile".into(),
                error,
            })?;
            Ok(ToolOutput::success())
        })
    }

    /// A tool that exits with `status` and writes `stderr`.
    pub fn failing(status: i32, stderr: &'static str) -> Self {
        Self::new(move |_| {
            Ok(ToolOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: stderr.to_owned(),
            })
        })
    }

    pub fn calls(&self) -> Vec<Vec<OsString>> {
        self.calls
            .lock()
            .expect("failed to lock calls for reading")
            .clone()
    }

    pub fn num_calls(&self) -> usize {
        self.calls
            .lock()
            .expect("failed to lock calls for counting")
            .len()
    }
}

impl ToolInvoker for FakeTool {
    fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(&self, args: &[OsString]) -> Result<ToolOutput> {
        self.calls
            .lock()
            .expect("failed to lock calls for recording")
            .push(args.to_vec());
        (self.respond)(args)
    }
}
