//! Configuration file resolution and TOML loading
//!
//! Config path resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MMEA_CONFIG` environment variable
//! 3. OS-dependent default: `<config_dir>/mmea/<module>.toml`
//!
//! A missing config file is not an error: callers get the `Default` value
//! of their settings type and a warning in the log.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted when no command-line path is given
pub const CONFIG_ENV_VAR: &str = "MMEA_CONFIG";

/// Logging section shared by every module's TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is unset ("error" .. "trace")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Check that `level` names a tracing level
    pub fn validate(&self) -> Result<()> {
        match self.level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => Err(Error::Config(format!("Unknown log level: {}", other))),
        }
    }
}

/// Resolves the config file path for one module
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve config path using the priority order in the module docs
    pub fn resolve(&self, cli_arg: Option<&Path>) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: OS-dependent default
        self.default_path()
    }

    /// OS-dependent default config file path
    pub fn default_path(&self) -> PathBuf {
        let file_name = format!("{}.toml", self.module_name);
        dirs::config_dir()
            .map(|d| d.join("mmea").join(&file_name))
            .unwrap_or_else(|| PathBuf::from(".").join(file_name))
    }
}

/// Load a TOML config file, falling back to defaults when it does not exist
///
/// A file that exists but cannot be read or parsed is an error: silently
/// ignoring a broken config would hide operator mistakes.
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        warn!(
            "Config file not found: {} (using compiled defaults)",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write a config value as TOML
///
/// Writes to a sibling temp file first, then renames over the target so a
/// reader never observes a half-written file.
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
