use std::{
    ffi::OsString,
    fmt::{self, Display},
    path::Path,
};

use crate::{
    apply::ParmValue,
    error::{Error, Result},
    live::LiveInstance,
};

/// Required trait for something that accepts parameter values by name.
pub trait ApplyTarget {
    fn apply_value(&mut self, name: &str, value: &ParmValue) -> Result<()>;

    fn apply_file(&mut self, name: &str, path: &Path) -> Result<()>;
}

/// Accumulates `name:value` arguments for a build tool invocation.
///
/// Each argument is kept separate, and is never interpreted by a shell.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArgumentLine {
    tokens: Vec<OsString>,
}

impl ArgumentLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[OsString] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<OsString> {
        self.tokens
    }

    fn push(&mut self, name: &str, value: impl AsRef<std::ffi::OsStr>) {
        let mut token = OsString::from(name);
        token.push(":");
        token.push(value);
        self.tokens.push(token);
    }
}

impl Display for ArgumentLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&token.to_string_lossy())?;
        }
        Ok(())
    }
}

impl ApplyTarget for ArgumentLine {
    fn apply_value(&mut self, name: &str, value: &ParmValue) -> Result<()> {
        self.push(name, value.to_string());
        Ok(())
    }

    fn apply_file(&mut self, name: &str, path: &Path) -> Result<()> {
        self.push(name, path);
        Ok(())
    }
}

/// Applies values to a working instance of a live node type.
pub struct LiveTarget<'a> {
    instance: &'a mut dyn LiveInstance,
}

impl<'a> LiveTarget<'a> {
    pub fn new(instance: &'a mut dyn LiveInstance) -> Self {
        Self { instance }
    }
}

impl ApplyTarget for LiveTarget<'_> {
    fn apply_value(&mut self, name: &str, value: &ParmValue) -> Result<()> {
        self.instance
            .set_parameter_value(name, value)
            .map_err(Error::LiveSource)
    }

    fn apply_file(&mut self, name: &str, path: &Path) -> Result<()> {
        self.instance
            .set_parameter_file(name, path)
            .map_err(Error::LiveSource)
    }
}
