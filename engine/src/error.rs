use std::{path::PathBuf, time::Duration};

use schema::{ParmTemplateType, SchemaError};
use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of describing sources and applying values to them.
///
/// Only [Error::UnsupportedParameterKind] is recoverable: adapters log it and drop the offending
/// entry. Everything else is fatal to the call that produced it.
#[derive(Debug, thiserror::Error, strum_macros::EnumDiscriminants)]
#[strum_discriminants(name(ErrorKind))]
#[strum_discriminants(derive(Hash, Serialize, strum_macros::Display))]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("parameter {name:?} is of unsupported kind {kind:?}")]
    UnsupportedParameterKind { name: String, kind: String },
    #[error("compiling {source_path:?} failed: {reason}")]
    Compile {
        source_path: PathBuf,
        reason: String,
        stderr: String,
    },
    #[error("value for parameter {name:?} could not be decoded: {reason}")]
    ValueDecode { name: String, reason: String },
    #[error("parameter {name:?} accepts at most {max} values, got {got}")]
    ValueArity { name: String, max: usize, got: usize },
    #[error("{program:?} failed: {reason}")]
    ExternalProcess {
        program: PathBuf,
        reason: String,
        stderr: String,
    },
    #[error("external tool {program:?} is not available")]
    ToolUnavailable { program: PathBuf },
    #[error("{program:?} did not complete within {timeout:?}")]
    Timeout { program: PathBuf, timeout: Duration },
    #[error("live source: {0:#}")]
    LiveSource(anyhow::Error),
    #[error("writing result archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("{context}: {error}")]
    Io {
        context: String,
        #[source]
        error: std::io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.into()
    }

    /// The offending parameter, field, path or program that the error relates to, if any.
    pub fn subject(&self) -> Option<String> {
        use Error::*;
        match self {
            Schema(err) => match (err.parm(), err.field()) {
                (Some(parm), Some(field)) => Some(format!("{parm}.{field}")),
                (Some(parm), None) => Some(parm.to_owned()),
                (None, _) => None,
            },
            UnsupportedParameterKind { name, .. }
            | ValueDecode { name, .. }
            | ValueArity { name, .. } => Some(name.clone()),
            Compile { source_path, .. } => Some(source_path.display().to_string()),
            ExternalProcess { program, .. }
            | ToolUnavailable { program }
            | Timeout { program, .. } => Some(program.display().to_string()),
            LiveSource(_) | Archive(_) | Io { .. } => None,
        }
    }

    /// Captured standard error of the external process that failed, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Compile { stderr, .. } | Error::ExternalProcess { stderr, .. }
                if !stderr.is_empty() =>
            {
                Some(stderr.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn unsupported(name: &str, kind: impl ToString) -> Self {
        Error::UnsupportedParameterKind {
            name: name.to_owned(),
            kind: kind.to_string(),
        }
    }

    pub(crate) fn unsupported_type(name: &str, template_type: ParmTemplateType) -> Self {
        Self::unsupported(name, template_type)
    }
}

/// Extension to attach a description of the failed operation to [std::io::Error]s.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|error| Error::Io {
            context: f().into(),
            error,
        })
    }
}

/// Structured, serializable summary of an [Error], identifying its kind and offending subject.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub subject: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            subject: err.subject(),
            message: err.to_string(),
            stderr: err.stderr().map(str::to_owned),
        }
    }
}
