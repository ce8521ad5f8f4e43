use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::ActionError;

/// Looks up automation scripts in the scripts folder by file-name prefix.
///
/// `SendMessage` matches `SendMessage.scpt`, `SendMessage.applescript` and
/// so on. When several files match, the lexicographically first one wins.
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    dir: PathBuf,
}

impl ScriptRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn resolve(&self, prefix: &str) -> Result<PathBuf, ActionError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            error!(dir = %self.dir.display(), error = %e, "cannot list scripts folder");
            ActionError::ScriptNotFound(prefix.to_string())
        })?;

        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        matches.sort();

        matches.into_iter().next().ok_or_else(|| {
            error!(script = prefix, dir = %self.dir.display(), "script does not exist");
            ActionError::ScriptNotFound(prefix.to_string())
        })
    }
}
