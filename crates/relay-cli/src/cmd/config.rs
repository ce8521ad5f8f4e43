use crate::output::{print_json, print_pairs};
use anyhow::Context;
use clap::Subcommand;
use relay_core::config::{RelayConfig, WarnLevel};
use relay_core::paths;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (defaults when config.yaml is absent)
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write config.yaml with every setting at its default
    Init {
        /// Overwrite an existing config.yaml
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Init { force } => init(root, force, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = RelayConfig::load_or_default(root).context("failed to load config")?;

    if json {
        return print_json(&config);
    }

    let timeout = config
        .script_timeout_secs
        .map(|s| format!("{s}s"))
        .unwrap_or_else(|| "none".to_string());
    print_pairs(&[
        ("interpreter", config.interpreter.clone()),
        ("sync_contact_photos", config.sync_contact_photos.to_string()),
        ("protocol_version", config.protocol_version.to_string()),
        ("respawn_delay_ms", config.respawn_delay_ms.to_string()),
        ("script_timeout", timeout),
    ]);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = RelayConfig::load_or_default(root).context("failed to load config")?;
    let mut warnings = config.validate();

    let scripts = paths::scripts_dir(root);
    if !scripts.is_dir() {
        warnings.push(relay_core::config::ConfigWarning {
            level: WarnLevel::Error,
            message: format!("scripts folder not found at {}", scripts.display()),
        });
    }

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(root: &Path, force: bool, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    RelayConfig::default()
        .save(root)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({ "written": path }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
