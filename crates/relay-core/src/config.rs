use crate::error::{RelayError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Settings read from `<parent>/config.yaml`.
///
/// Captured once when the executor is built and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Program that runs the automation scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Passed to the ContactSync script.
    #[serde(default = "default_sync_contact_photos")]
    pub sync_contact_photos: bool,
    /// Script protocol version this relay speaks; checked by the Setup script.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,
    /// Delay between force-quitting the app and relaunching it.
    #[serde(default = "default_respawn_delay_ms")]
    pub respawn_delay_ms: u64,
    /// Upper bound on a single script run. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_timeout_secs: Option<u64>,
}

fn default_interpreter() -> String {
    "osascript".to_string()
}

fn default_sync_contact_photos() -> bool {
    true
}

fn default_protocol_version() -> u32 {
    1
}

fn default_respawn_delay_ms() -> u64 {
    200
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            sync_contact_photos: default_sync_contact_photos(),
            protocol_version: default_protocol_version(),
            respawn_delay_ms: default_respawn_delay_ms(),
            script_timeout_secs: None,
        }
    }
}

impl RelayConfig {
    pub fn load(parent: &Path) -> Result<Self> {
        let path = paths::config_path(parent);
        if !path.exists() {
            return Err(RelayError::ConfigMissing(path));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: RelayConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`RelayConfig::load`], but a missing file yields the defaults.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default(parent: &Path) -> Result<Self> {
        match Self::load(parent) {
            Err(RelayError::ConfigMissing(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, parent: &Path) -> Result<()> {
        let path = paths::config_path(parent);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.script_timeout_secs.map(Duration::from_secs)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.interpreter.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "interpreter is empty".to_string(),
            });
        } else if which::which(&self.interpreter).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("interpreter '{}' not found on PATH", self.interpreter),
            });
        }

        if self.protocol_version == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "protocol_version must be at least 1".to_string(),
            });
        }

        if self.script_timeout_secs == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "script_timeout_secs is 0; every script would time out".to_string(),
            });
        }

        if self.respawn_delay_ms > 10_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "respawn_delay_ms is {}ms; the app stays closed that long after a UI error",
                    self.respawn_delay_ms
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
