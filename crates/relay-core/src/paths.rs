use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SCRIPTS_DIR: &str = "scripts";
pub const CONTACTS_DIR: &str = "contacts";
pub const CONFIG_FILE: &str = "config.yaml";

/// Prefix of the scratch directory created under the platform temp root.
pub const TEMP_PREFIX: &str = "relay";

/// Script family used to launch and quit the messaging app.
pub const HELPERS_SCRIPT: &str = "Helpers";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn scripts_dir(parent: &Path) -> PathBuf {
    parent.join(SCRIPTS_DIR)
}

pub fn contacts_dir(parent: &Path) -> PathBuf {
    parent.join(CONTACTS_DIR)
}

pub fn config_path(parent: &Path) -> PathBuf {
    parent.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
