use serde::Serialize;

use crate::Error;

/// A parameter entry that an adapter dropped because the model cannot represent its kind.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SkippedParm {
    pub name: String,
    pub kind: String,
}

/// Result of describing a source: the value, plus the entries that were skipped to produce it.
#[derive(Clone, Debug, PartialEq)]
pub struct Described<T> {
    pub value: T,
    pub skipped: Vec<SkippedParm>,
}

impl<T> Described<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Collects skipped entries while an adapter walks a source.
#[derive(Default)]
pub(crate) struct SkipLog {
    skipped: Vec<SkippedParm>,
}

impl SkipLog {
    /// Records `err` if it is recoverable, otherwise returns it.
    pub(crate) fn recover(&mut self, source: &str, err: Error) -> Result<(), Error> {
        match err {
            Error::UnsupportedParameterKind { name, kind } => {
                log::warn!("Skipping parameter {name:?} of {source}: unsupported kind {kind:?}.");
                self.skipped.push(SkippedParm { name, kind });
                Ok(())
            }
            err => Err(err),
        }
    }

    pub(crate) fn finish<T>(self, value: T) -> Described<T> {
        Described {
            value,
            skipped: self.skipped,
        }
    }
}
