// src/installer/context.rs

//! Installer registry and platform configuration
//!
//! The context is built once by the host: installers are registered under
//! their rule-file keys, attached to the OSes that can use them, and one
//! of them is made the default per OS.

use super::Installer;
use crate::error::{Error, Result};
use crate::os::{OsDetector, OsOverride, OsVersionType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub struct InstallerContext {
    installers: HashMap<String, Arc<dyn Installer>>,
    /// OS name -> installer keys in precedence order
    os_installers: HashMap<String, Vec<String>>,
    default_os_installer: HashMap<String, String>,
    os_version_type: HashMap<String, OsVersionType>,
    os_detect: Box<dyn OsDetector>,
    os_override: Option<OsOverride>,
}

impl InstallerContext {
    pub fn new(os_detect: impl OsDetector + 'static) -> Self {
        Self {
            installers: HashMap::new(),
            os_installers: HashMap::new(),
            default_os_installer: HashMap::new(),
            os_version_type: HashMap::new(),
            os_detect: Box::new(os_detect),
            os_override: None,
        }
    }

    /// Use a fixed OS name and version instead of detection
    pub fn set_os_override(&mut self, os_name: impl Into<String>, os_version: impl Into<String>) {
        let os = OsOverride {
            name: os_name.into(),
            version: os_version.into(),
        };
        debug!("Overriding OS to [{}]", os);
        self.os_override = Some(os);
    }

    pub fn os_override(&self) -> Option<&OsOverride> {
        self.os_override.as_ref()
    }

    pub fn set_os_version_type(&mut self, os_name: impl Into<String>, version_type: OsVersionType) {
        self.os_version_type.insert(os_name.into(), version_type);
    }

    pub fn os_version_type(&self, os_name: &str) -> OsVersionType {
        self.os_version_type.get(os_name).copied().unwrap_or_default()
    }

    /// OS name and version key used for resolution
    ///
    /// The override wins if one is set; otherwise the detector is asked
    /// for either the version or the codename depending on the OS's
    /// version type.
    pub fn os_name_and_version(&self) -> Result<(String, String)> {
        if let Some(os) = &self.os_override {
            return Ok((os.name.clone(), os.version.clone()));
        }
        let os_name = self.os_detect.name()?;
        let os_version = match self.os_version_type(&os_name) {
            OsVersionType::Codename => self.os_detect.codename()?,
            OsVersionType::Version => self.os_detect.version()?,
        };
        Ok((os_name, os_version))
    }

    /// Register an installer, replacing any existing one with the same key
    pub fn set_installer(&mut self, installer_key: impl Into<String>, installer: impl Installer + 'static) {
        let installer_key = installer_key.into();
        debug!("Registering installer [{}]", installer_key);
        self.installers.insert(installer_key, Arc::new(installer));
    }

    pub fn installer(&self, installer_key: &str) -> Result<Arc<dyn Installer>> {
        self.installers
            .get(installer_key)
            .cloned()
            .ok_or_else(|| Error::NotFoundError(format!("installer [{}]", installer_key)))
    }

    pub fn installer_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.installers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// OS names with at least one installer attached
    pub fn os_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.os_installers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Attach a registered installer to an OS
    ///
    /// Installers are matched in the order they were attached.
    pub fn add_os_installer_key(&mut self, os_name: &str, installer_key: &str) -> Result<()> {
        self.installer(installer_key)?;
        debug!("Adding installer [{}] to OS [{}]", installer_key, os_name);
        let keys = self.os_installers.entry(os_name.to_string()).or_default();
        if !keys.iter().any(|k| k == installer_key) {
            keys.push(installer_key.to_string());
        }
        Ok(())
    }

    pub fn os_installer_keys(&self, os_name: &str) -> Result<Vec<String>> {
        self.os_installers
            .get(os_name)
            .cloned()
            .ok_or_else(|| Error::NotFoundError(format!("unknown OS [{}]", os_name)))
    }

    /// Make an attached installer the default for an OS
    pub fn set_default_os_installer_key(&mut self, os_name: &str, installer_key: &str) -> Result<()> {
        let keys = self.os_installer_keys(os_name)?;
        if !keys.iter().any(|k| k == installer_key) {
            return Err(Error::NotFoundError(format!(
                "installer [{}] is not associated with OS [{}]; add it to the OS first",
                installer_key, os_name
            )));
        }
        self.installer(installer_key)?;
        debug!("Setting default installer [{}] for OS [{}]", installer_key, os_name);
        self.default_os_installer
            .insert(os_name.to_string(), installer_key.to_string());
        Ok(())
    }

    /// Default installer for an OS, `None` if the OS has no default
    pub fn default_os_installer_key(&self, os_name: &str) -> Result<Option<String>> {
        if !self.os_installers.contains_key(os_name) {
            return Err(Error::NotFoundError(format!("unknown OS [{}]", os_name)));
        }
        Ok(self.default_os_installer.get(os_name).cloned())
    }
}

impl fmt::Debug for InstallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerContext")
            .field("installers", &self.installer_keys())
            .field("os_installers", &self.os_installers)
            .field("default_os_installer", &self.default_os_installer)
            .field("os_version_type", &self.os_version_type)
            .field("os_override", &self.os_override)
            .finish_non_exhaustive()
    }
}
