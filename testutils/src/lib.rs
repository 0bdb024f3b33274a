//! Utilities used in tests in multiple crates within the workspace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Creates a value suitable as a baseline in tests, to be overridden with struct update syntax.
pub trait DefaultForTest {
    fn default_for_test() -> Self;
}

/// Writes `contents` to the file `name` within `dir`, creating parent directories as needed.
/// Returns the path of the written file.
pub fn write_fixture(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating fixture directory {:?}", parent))?;
    }
    std::fs::write(&path, contents).with_context(|| format!("writing fixture {:?}", path))?;
    Ok(path)
}

/// Returns the sorted relative paths of all files under `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {:?}", dir))?;
        if entry.file_type().is_file() {
            found.push(entry.path().strip_prefix(dir)?.to_owned());
        }
    }
    Ok(found)
}
