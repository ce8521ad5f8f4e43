use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("scripts folder not found at {0}")]
    ScriptsFolderMissing(PathBuf),

    #[error("config not found at {0}")]
    ConfigMissing(PathBuf),

    #[error("failed to create temp workspace: {0}")]
    TempWorkspace(#[source] std::io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid action kind: {0}")]
    InvalidActionKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
