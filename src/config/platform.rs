//! Configuration directory resolution per platform

use std::path::PathBuf;

use anyhow::Result;

use crate::deps::Environment;
use crate::error::InfraError;

/// Directory name used under the home directory before per-platform paths
pub const LEGACY_DIR_NAME: &str = ".infra";

/// Host operating system family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// `$XDG_CONFIG_HOME`, then systemd, then `~/.infra`
    Linux,
    /// `~/Library/Application Support/Infra`
    MacOs,
    /// `%AppData%\infra`
    Windows,
    /// Anything else, by `std::env::consts::OS` name
    Other(String),
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Pick the directory holding `config.json`.
///
/// An existing `~/.infra` always wins so installs predating the per-platform
/// layout keep working.
pub fn resolve_config_dir(platform: &Platform, env: &dyn Environment) -> Result<PathBuf> {
    let home = env.get_home_dir().ok_or_else(|| {
        InfraError::UnsupportedPlatform("could not determine home directory".to_string())
    })?;

    let legacy = home.join(LEGACY_DIR_NAME);
    if env.dir_exists(&legacy) {
        tracing::debug!("Using legacy configuration directory {}", legacy.display());
        return Ok(legacy);
    }

    match platform {
        Platform::Linux => {
            if let Some(xdg) = env.get_var("XDG_CONFIG_HOME") {
                return Ok(PathBuf::from(xdg).join("infra"));
            }
            tracing::warn!("XDG_CONFIG_HOME is not defined, trying systemd defaults...");

            if let Some(dir) = env.systemd_user_config_dir() {
                return Ok(dir.join("infra"));
            }
            tracing::warn!("systemd-path tool not found, falling back to legacy path ~/.infra");
            Ok(legacy)
        }
        Platform::MacOs => Ok(home
            .join("Library")
            .join("Application Support")
            .join("Infra")),
        Platform::Windows => env
            .get_var("AppData")
            .map(|appdata| PathBuf::from(appdata).join("infra"))
            .ok_or_else(|| InfraError::UnsupportedPlatform("AppData is not defined".to_string()).into()),
        Platform::Other(os) => {
            Err(InfraError::UnsupportedPlatform(format!("unrecognized operating system {os}")).into())
        }
    }
}
