//! Compiled descriptor cache, keyed by the content digest of the source file.
//!
//! Each source `<dir>/<stem>.<ext>` owns a derived descriptor `<dir>/<stem>.xml` and a sidecar
//! record `<dir>/<stem>.cache.json` naming the digest of the source that the descriptor was
//! compiled from. The descriptor is recompiled only when the digest changes.

#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    ffi::OsString,
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};

use crate::{
    HashDigest, ToolInvoker,
    error::{Error, IoContext, Result},
};

const RECORD_VERSION: &str = "1";
const RECORD_SUFFIX: &str = "cache.json";
const DESCRIPTOR_EXTENSION: &str = "xml";
/// Flag that asks the build tool to emit the parameter descriptor instead of building.
pub const NODEMAP_FLAG: &str = "--nodemap";

/// State of the derived descriptor for one source file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum CacheState {
    /// No descriptor or no valid record exists.
    Unbuilt,
    /// The record matches the current source digest.
    Fresh,
    /// The source changed since the descriptor was compiled.
    Stale,
}

/// What [DescriptorCache::resolve] had to do to produce the descriptor.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum CacheTransition {
    Reused,
    Built,
    Rebuilt,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachedDescriptor {
    /// Canonical path of the source file.
    pub source_path: PathBuf,
    pub descriptor_path: PathBuf,
    /// Digest of the source content that the descriptor was compiled from.
    pub digest: HashDigest,
    pub transition: CacheTransition,
}

/// Persisted sidecar record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub version: String,
    pub source_path: PathBuf,
    pub source_hash: HashDigest,
    pub derived_path: PathBuf,
}

/// Resolves source files to compiled descriptors, compiling them with the build tool when needed.
///
/// Concurrent calls for the same source within one process are serialised, so it is compiled at
/// most once. Calls for different sources proceed independently.
pub struct DescriptorCache<T> {
    tool: T,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl<T> DescriptorCache<T>
where
    T: ToolInvoker,
{
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Path of the descriptor derived from `source_path`.
    pub fn descriptor_path(source_path: &Path) -> PathBuf {
        source_path.with_extension(DESCRIPTOR_EXTENSION)
    }

    /// Path of the sidecar record for `source_path`.
    pub fn record_path(source_path: &Path) -> PathBuf {
        source_path.with_extension(RECORD_SUFFIX)
    }

    /// Reports the state of the descriptor for `source_path` without compiling anything.
    pub fn state(&self, source_path: &Path) -> Result<CacheState> {
        let source_path = canonical(source_path)?;
        let digest = HashDigest::of_file(&source_path)?;
        Ok(Self::state_for(&source_path, &digest))
    }

    /// Returns the descriptor for `source_path`, compiling it first if it is absent or stale.
    ///
    /// A failed compilation leaves any previous record untouched, so the next call retries.
    pub fn resolve(&self, source_path: &Path) -> Result<CachedDescriptor> {
        let source_path = canonical(source_path)?;
        let lock = self.lock_for(&source_path);
        let result = {
            let _guard = lock
                .lock()
                .expect("failed to lock source path for descriptor compilation");
            self.resolve_locked(source_path.clone())
        };
        self.release(&source_path, lock);
        result
    }

    fn resolve_locked(&self, source_path: PathBuf) -> Result<CachedDescriptor> {
        let descriptor_path = Self::descriptor_path(&source_path);
        let digest = HashDigest::of_file(&source_path)?;

        let transition = match Self::state_for(&source_path, &digest) {
            CacheState::Fresh => {
                log::debug!("Reusing descriptor {:?} (source digest {digest}).", descriptor_path);
                return Ok(CachedDescriptor {
                    source_path,
                    descriptor_path,
                    digest,
                    transition: CacheTransition::Reused,
                });
            }
            CacheState::Unbuilt => CacheTransition::Built,
            CacheState::Stale => CacheTransition::Rebuilt,
        };

        log::info!("Compiling descriptor for {:?} ({transition}).", source_path);
        let digest = self.compile(&source_path, &descriptor_path)?;
        write_record(
            &Self::record_path(&source_path),
            &CacheRecord {
                version: RECORD_VERSION.to_owned(),
                source_path: source_path.clone(),
                source_hash: digest,
                derived_path: descriptor_path.clone(),
            },
        )?;

        Ok(CachedDescriptor {
            source_path,
            descriptor_path,
            digest,
            transition,
        })
    }

    fn state_for(source_path: &Path, digest: &HashDigest) -> CacheState {
        let Some(record) = read_record(&Self::record_path(source_path)) else {
            return CacheState::Unbuilt;
        };
        if !record.derived_path.is_file() {
            return CacheState::Unbuilt;
        }
        if record.source_hash == *digest {
            CacheState::Fresh
        } else {
            CacheState::Stale
        }
    }

    fn lock_for(&self, source_path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .expect("failed to lock descriptor cache lock table");
        locks.entry(source_path.to_owned()).or_default().clone()
    }

    /// Drops the table entry for `source_path` once no other call holds or awaits it.
    fn release(&self, source_path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .locks
            .lock()
            .expect("failed to lock descriptor cache lock table");
        drop(lock);
        if locks
            .get(source_path)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(source_path);
        }
    }

    #[cfg(test)]
    fn num_locks(&self) -> usize {
        self.locks
            .lock()
            .expect("failed to lock descriptor cache lock table")
            .len()
    }

    /// Compiles a staged copy of the source, then moves the produced descriptor into place.
    /// Returns the digest of the content that was compiled.
    fn compile(&self, source_path: &Path, descriptor_path: &Path) -> Result<HashDigest> {
        let compile_err = |reason: String, stderr: String| Error::Compile {
            source_path: source_path.to_owned(),
            reason,
            stderr,
        };

        let parent = source_path.parent().unwrap_or(Path::new("."));
        let file_name = source_path
            .file_name()
            .ok_or_else(|| compile_err("source path has no file name".into(), String::new()))?;
        let staging = tempfile::Builder::new()
            .prefix(".harpoon-compile-")
            .tempdir_in(parent)
            .io_context(|| format!("creating staging directory in {:?}", parent))?;

        let staged_source = staging.path().join(file_name);
        std::fs::copy(source_path, &staged_source)
            .io_context(|| format!("staging {:?} for compilation", source_path))?;
        let digest = HashDigest::of_file(&staged_source)?;

        let args: [OsString; 2] = [staged_source.clone().into(), NODEMAP_FLAG.into()];
        let output = self.tool.invoke(&args)?;
        if !output.is_success() {
            return Err(compile_err(
                format!("{:?} {}", self.tool.program(), output.describe_status()),
                output.stderr,
            ));
        }

        let produced = Self::descriptor_path(&staged_source);
        if !produced.is_file() {
            return Err(compile_err(
                "the build tool did not produce a descriptor".into(),
                output.stderr,
            ));
        }
        std::fs::rename(&produced, descriptor_path)
            .io_context(|| format!("moving compiled descriptor to {:?}", descriptor_path))?;

        Ok(digest)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).io_context(|| format!("resolving canonical path for {:?}", path))
}

/// Reads the record at `record_path`. Missing, unreadable, corrupt and other-version records are
/// all treated as absent.
fn read_record(record_path: &Path) -> Option<CacheRecord> {
    let file = match File::open(record_path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("Failed to open cache record {:?}: {err}", record_path);
            return None;
        }
    };
    let record: CacheRecord = match serde_json::from_reader(file) {
        Ok(record) => record,
        Err(err) => {
            log::warn!("Ignoring corrupt cache record {:?}: {err}", record_path);
            return None;
        }
    };
    if record.version != RECORD_VERSION {
        log::warn!(
            "Ignoring cache record {:?} with version {:?}.",
            record_path,
            record.version
        );
        return None;
    }
    Some(record)
}

fn write_record(record_path: &Path, record: &CacheRecord) -> Result<()> {
    let context = || format!("writing cache record {:?}", record_path);
    let mut file = AtomicWriteFile::open(record_path).io_context(context)?;
    serde_json::to_writer_pretty(&mut file, record)
        .map_err(std::io::Error::from)
        .io_context(context)?;
    file.flush().io_context(context)?;
    file.commit().io_context(context)
}
