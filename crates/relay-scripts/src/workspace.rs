use std::path::{Path, PathBuf};

use relay_core::paths::TEMP_PREFIX;
use relay_core::RelayError;
use tempfile::TempDir;
use tracing::{error, info};

/// Scratch directory owned by a single executor.
///
/// Created under the platform temp root with a unique name and removed
/// recursively on [`TempWorkspace::close`] or drop. Removal failures are
/// logged at error level.
#[derive(Debug)]
pub struct TempWorkspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl TempWorkspace {
    pub fn create() -> Result<Self, RelayError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(RelayError::TempWorkspace)?;
        let path = dir.path().to_path_buf();
        info!(path = %path.display(), "created temp workspace");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to `<workspace>/<file_name>` and return the full path,
    /// ready to be handed to a script as an attachment.
    pub fn stage(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, RelayError> {
        let name = Path::new(file_name);
        let is_plain_name = name.components().count() == 1
            && name.file_name().is_some_and(|n| n == name.as_os_str());
        if !is_plain_name {
            return Err(RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("attachment name '{file_name}' must be a plain file name"),
            )));
        }
        let target = self.path.join(name);
        relay_core::io::atomic_write(&target, data)?;
        Ok(target)
    }

    /// Remove the workspace now, surfacing any error.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                error!(path = %self.path.display(), error = %e, "failed to delete temp workspace");
            }
        }
    }
}
