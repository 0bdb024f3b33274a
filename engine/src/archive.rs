//! ZIP archives of request outputs, built in memory.

use std::{
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::{IoContext, Result};

/// Archives each of `files` under its file name.
pub(crate) fn zip_files(files: &[PathBuf]) -> Result<Vec<u8>> {
    let mut writer = ArchiveWriter::new();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        writer.add(&name, path)?;
    }
    writer.finish()
}

/// Archives every file under `dir`, named by its path relative to `dir`.
pub(crate) fn zip_dir(dir: &Path) -> Result<Vec<u8>> {
    let mut writer = ArchiveWriter::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry
            .map_err(std::io::Error::from)
            .io_context(|| format!("walking {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        writer.add(&normalise_path_slashes(relative), entry.path())?;
    }
    writer.finish()
}

struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, name: &str, path: &Path) -> Result<()> {
        log::debug!("Archiving {:?} as {name:?}.", path);
        let mut file =
            std::fs::File::open(path).io_context(|| format!("opening {:?} to archive", path))?;
        self.zip.start_file(name, self.options)?;
        std::io::copy(&mut file, &mut self.zip)
            .io_context(|| format!("archiving {:?}", path))?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        self.zip.flush().io_context(|| "flushing archive")?;
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Uses forward slashes in entry names, whatever the platform.
fn normalise_path_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
