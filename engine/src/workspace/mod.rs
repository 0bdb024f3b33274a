//! Scratch directories scoped to a single request.


use std::{
    io::Read,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::{
    HashDigest,
    error::{Error, IoContext, Result},
};

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";

/// Identifies an inbound request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestIdentity {
    /// Seconds since the UNIX epoch.
    pub timestamp: u64,
    pub client: String,
    pub path: String,
}

impl RequestIdentity {
    pub fn new(client: impl Into<String>, path: impl Into<String>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            timestamp,
            client: client.into(),
            path: path.into(),
        }
    }

    /// Hex digest of the identity, suitable as a path component.
    pub fn digest(&self) -> String {
        let mut data = Vec::new();
        data.extend_from_slice(&self.timestamp.to_be_bytes());
        for field in [&self.client, &self.path] {
            data.extend_from_slice(&(field.len() as u64).to_be_bytes());
            data.extend_from_slice(field.as_bytes());
        }
        HashDigest::of_bytes(&data).to_hex()
    }
}

/// Uniquely named directory holding a request's uploads and outputs.
///
/// Removed when dropped, on every exit path.
#[derive(Debug)]
pub struct RequestWorkspace {
    dir: TempDir,
    id: String,
}

impl RequestWorkspace {
    /// Creates a workspace under `root`, which is created if needed.
    pub fn create(root: &Path, identity: &RequestIdentity) -> Result<Self> {
        std::fs::create_dir_all(root)
            .io_context(|| format!("creating workspace root {:?}", root))?;
        let root = std::fs::canonicalize(root)
            .io_context(|| format!("resolving workspace root {:?}", root))?;
        let id = identity.digest();
        let dir = tempfile::Builder::new()
            .prefix(&format!("{id}-"))
            .tempdir_in(&root)
            .io_context(|| format!("creating request workspace in {:?}", root))?;
        for sub in [UPLOADS_DIR, OUTPUTS_DIR] {
            let sub_path = dir.path().join(sub);
            std::fs::create_dir(&sub_path)
                .io_context(|| format!("creating workspace directory {:?}", sub_path))?;
        }
        log::debug!("Created request workspace {:?}.", dir.path());
        Ok(Self { dir, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join(UPLOADS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.dir.path().join(OUTPUTS_DIR)
    }

    /// Stores an uploaded file for parameter `name`, returning its absolute path.
    ///
    /// Only the final component of `file_name` is used.
    pub fn stage_upload(
        &self,
        name: &str,
        file_name: &str,
        mut content: impl Read,
    ) -> Result<PathBuf> {
        let path = self.upload_path(name, file_name)?;
        let mut file = std::fs::File::create(&path)
            .io_context(|| format!("creating upload {:?}", path))?;
        std::io::copy(&mut content, &mut file)
            .io_context(|| format!("writing upload {:?}", path))?;
        Ok(path)
    }

    /// Copies the file at `source` into the workspace as an upload for parameter `name`.
    pub fn stage_file(&self, name: &str, source: &Path) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = self.upload_path(name, &file_name)?;
        std::fs::copy(source, &path)
            .io_context(|| format!("copying {:?} into workspace", source))?;
        Ok(path)
    }

    /// Removes the workspace, reporting any failure to do so.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_owned();
        self.dir
            .close()
            .io_context(|| format!("removing request workspace {:?}", path))
    }

    /// Uploads are stored as `uploads/<name>/<file name>`, so the original file name survives.
    fn upload_path(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        let dir = self.uploads_dir().join(safe_component(name)?);
        std::fs::create_dir_all(&dir).io_context(|| format!("creating {:?}", dir))?;
        let file_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "upload".into());
        Ok(dir.join(file_name))
    }
}

fn safe_component(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(name),
        _ => Err(Error::ValueDecode {
            name: name.to_owned(),
            reason: "parameter names of uploads must be plain file names".into(),
        }),
    }
}
