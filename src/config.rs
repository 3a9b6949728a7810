// src/config.rs

//! TOML configuration
//!
//! ```toml
//! override_file = "/etc/sysdep/overrides.yaml"
//!
//! [os]
//! name = "ubuntu"
//! version = "jammy"
//!
//! [os_version_type]
//! ubuntu = "codename"
//!
//! [installers.ubuntu]
//! keys = ["apt", "pip"]
//! default = "apt"
//! ```
//!
//! Installers themselves are registered by the host; the configuration
//! only attaches registered installers to OSes.

use crate::error::{Error, Result};
use crate::installer::InstallerContext;
use crate::os::{OsOverride, OsVersionType};
use crate::rules::{RuleEntry, load_rule_file};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local rule file merged over every view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_file: Option<PathBuf>,

    /// Fixed OS identity instead of detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsOverride>,

    /// OS name -> which version string is the version key
    #[serde(default)]
    pub os_version_type: BTreeMap<String, OsVersionType>,

    /// OS name -> installers available on it
    #[serde(default)]
    pub installers: BTreeMap<String, OsInstallers>,
}

/// Installers for one OS
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsInstallers {
    /// Installer keys in precedence order
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Config {
    /// `<config dir>/sysdep/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sysdep").join("config.toml"))
    }

    /// `<home>/.sysdep/overrides.yaml`
    pub fn default_override_path() -> Option<PathBuf> {
        dirs::home_dir().map(|dir| dir.join(".sysdep").join("overrides.yaml"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load an explicit file, or the default file if there is one
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigError(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        for (os_name, installers) in &self.installers {
            if let Some(default) = &installers.default {
                if !installers.keys.contains(default) {
                    return Err(Error::ConfigError(format!(
                        "default installer [{}] for OS [{}] is not listed in its keys",
                        default, os_name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Configure an installer context
    ///
    /// # Errors
    ///
    /// `NotFoundError` if an installer key is not registered in the context.
    pub fn apply(&self, ctx: &mut InstallerContext) -> Result<()> {
        for (os_name, version_type) in &self.os_version_type {
            ctx.set_os_version_type(os_name.as_str(), *version_type);
        }
        for (os_name, installers) in &self.installers {
            for key in &installers.keys {
                ctx.add_os_installer_key(os_name, key)?;
            }
            if let Some(default) = &installers.default {
                ctx.set_default_os_installer_key(os_name, default)?;
            }
        }
        if let Some(os) = &self.os {
            ctx.set_os_override(os.name.as_str(), os.version.as_str());
        }
        Ok(())
    }

    /// Read the override rule layer
    ///
    /// Uses `override_file`, falling back to the default location. Returns
    /// `None` when the file does not exist.
    pub fn load_override(&self) -> Result<Option<RuleEntry>> {
        let Some(path) = self.override_file.clone().or_else(Self::default_override_path) else {
            return Ok(None);
        };
        if !path.exists() {
            debug!("No override file at {}", path.display());
            return Ok(None);
        }
        let data = load_rule_file(&path)?;
        Ok(Some(RuleEntry::new(data, Vec::new(), path.display().to_string())))
    }
}
