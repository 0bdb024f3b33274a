//! Invocation of external command line tools.

use std::{
    ffi::{OsStr, OsString},
    io::{Read, Seek},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use crate::error::{Error, IoContext, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a completed tool invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ToolOutput {
    /// Exit code, or [None] if the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    pub(crate) fn describe_status(&self) -> String {
        match self.status {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by a signal".to_owned(),
        }
    }
}

/// Required trait for running an external tool with a list of arguments.
///
/// Implementations block until the tool completes. A non-zero exit status is not an error at
/// this level; callers decide what it means.
pub trait ToolInvoker: Send + Sync {
    /// Path or name of the program, for error reporting.
    fn program(&self) -> &Path;

    fn invoke(&self, args: &[OsString]) -> Result<ToolOutput>;
}

/// A tool run as a child process.
#[derive(Clone, Debug)]
pub struct ExternalTool {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalTool {
    /// Resolves `program` once, either as a path to an existing file or by searching `PATH` for a
    /// bare name.
    pub fn locate(program: impl AsRef<Path>, timeout: Option<Duration>) -> Result<Self> {
        let program = program.as_ref();
        let resolved = resolve_program(program, std::env::var_os("PATH").as_deref()).ok_or_else(
            || Error::ToolUnavailable {
                program: program.to_owned(),
            },
        )?;
        log::debug!("Resolved tool {:?} to {:?}.", program, resolved);
        Ok(Self {
            program: resolved,
            timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn wait_with_timeout(&self, child: &mut std::process::Child) -> Result<Option<i32>> {
        let Some(timeout) = self.timeout else {
            let status = child
                .wait()
                .io_context(|| format!("waiting for {:?}", self.program))?;
            return Ok(status.code());
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child
                .try_wait()
                .io_context(|| format!("polling {:?}", self.program))?
            {
                return Ok(status.code());
            }
            if started.elapsed() >= timeout {
                if let Err(err) = child.kill() {
                    log::warn!("Failed to kill {:?} after timeout: {err}", self.program);
                }
                // Reap the killed child.
                let _ = child.wait();
                return Err(Error::Timeout {
                    program: self.program.clone(),
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ToolInvoker for ExternalTool {
    fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(&self, args: &[OsString]) -> Result<ToolOutput> {
        let mut stdout_file =
            tempfile::tempfile().io_context(|| "creating file to capture stdout")?;
        let mut stderr_file =
            tempfile::tempfile().io_context(|| "creating file to capture stderr")?;

        log::debug!("Running {:?} with arguments {:?}.", self.program, args);
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(
                stdout_file
                    .try_clone()
                    .io_context(|| "duplicating stdout capture file")?,
            ))
            .stderr(Stdio::from(
                stderr_file
                    .try_clone()
                    .io_context(|| "duplicating stderr capture file")?,
            ))
            .spawn()
            .io_context(|| format!("starting {:?}", self.program))?;

        let status = self.wait_with_timeout(&mut child)?;

        Ok(ToolOutput {
            status,
            stdout: read_captured(&mut stdout_file)?,
            stderr: read_captured(&mut stderr_file)?,
        })
    }
}

fn read_captured(file: &mut std::fs::File) -> Result<String> {
    file.rewind()
        .io_context(|| "rewinding captured output")?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .io_context(|| "reading captured output")?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Returns the path to run for `program`. Paths with more than one component must exist as
/// files; bare names are searched for in `search_path`.
fn resolve_program(program: &Path, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_owned());
    }
    std::env::split_paths(search_path?)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use googletest::prelude::*;

    use super::*;

    #[gtest]
    fn test_resolve_bare_name_on_search_path() -> Result<()> {
        let tempdir = tempfile::tempdir()?;
        let tool = testutils::write_fixture(tempdir.path(), "bin/buildtool", "")?;
        let search_path =
            std::env::join_paths([tempdir.path().join("empty"), tempdir.path().join("bin")])?;

        expect_that!(
            resolve_program(Path::new("buildtool"), Some(&search_path)),
            some(eq(&tool))
        );
        Ok(())
    }

    #[gtest]
    fn test_resolve_missing_program() -> Result<()> {
        let tempdir = tempfile::tempdir()?;
        let search_path = std::env::join_paths([tempdir.path()])?;

        expect_that!(
            resolve_program(Path::new("no-such-tool"), Some(&search_path)).is_none(),
            eq(true)
        );
        expect_that!(
            resolve_program(&tempdir.path().join("no-such-tool"), None).is_none(),
            eq(true)
        );
        Ok(())
    }

    #[gtest]
    fn test_locate_reports_unavailable_tool() {
        let result = ExternalTool::locate("/nonexistent/harpoon-build-tool", None);

        expect_that!(
            result.map(|_| ()).unwrap_err().kind(),
            eq(crate::ErrorKind::ToolUnavailable)
        );
    }

    #[cfg(unix)]
    #[gtest]
    fn test_invoke_captures_output_and_status() -> Result<()> {
        let tool = ExternalTool::locate("/bin/sh", None)?;

        let output = tool.invoke(&["-c", "echo out; echo err >&2; exit 3"].map(OsString::from))?;

        expect_that!(output.status, some(eq(3)));
        expect_that!(output.stdout, eq("out\n"));
        expect_that!(output.stderr, eq("err\n"));
        expect_that!(output.is_success(), eq(false));
        Ok(())
    }

    #[cfg(unix)]
    #[gtest]
    fn test_invoke_times_out() -> Result<()> {
        let tool = ExternalTool::locate("/bin/sh", Some(Duration::from_millis(100)))?;

        let result = tool.invoke(&["-c", "sleep 5"].map(OsString::from));

        expect_that!(
            result.unwrap_err().kind(),
            eq(crate::ErrorKind::Timeout)
        );
        Ok(())
    }
}
