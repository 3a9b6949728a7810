// src/os.rs

//! Operating system identity
//!
//! Detection heuristics live outside this crate; hosts plug them in
//! through [`OsDetector`]. [`FixedOs`] reports a known identity and is
//! what tests and explicit configuration use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supplies the name and version of the running OS
pub trait OsDetector: Send + Sync {
    /// OS name as used in rule files (e.g. "ubuntu")
    fn name(&self) -> Result<String>;

    /// Numeric version (e.g. "22.04")
    fn version(&self) -> Result<String>;

    /// Release codename (e.g. "jammy")
    fn codename(&self) -> Result<String>;
}

/// Which OS version string is used as the version key in rule files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsVersionType {
    #[default]
    Version,
    Codename,
}

impl fmt::Display for OsVersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version => write!(f, "version"),
            Self::Codename => write!(f, "codename"),
        }
    }
}

/// An OS with a fixed, known identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedOs {
    pub name: String,
    pub version: String,
    pub codename: Option<String>,
}

impl FixedOs {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            codename: None,
        }
    }

    pub fn with_codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = Some(codename.into());
        self
    }
}

impl OsDetector for FixedOs {
    fn name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn codename(&self) -> Result<String> {
        self.codename
            .clone()
            .ok_or_else(|| Error::NotFoundError(format!("no codename known for OS [{}]", self.name)))
    }
}

/// Explicit OS name and version that replace detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsOverride {
    pub name: String,
    pub version: String,
}

impl OsOverride {
    /// Parse an `OS_NAME:OS_VERSION` pair, e.g. `ubuntu:jammy`
    ///
    /// Everything after the first colon is the version.
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, version) = spec.split_once(':').ok_or_else(|| {
            Error::ConfigError(format!(
                "OS override must be colon-separated OS_NAME:OS_VERSION, e.g. ubuntu:jammy (got '{}')",
                spec
            ))
        })?;
        if name.is_empty() {
            return Err(Error::ConfigError(format!("OS override '{}' has an empty OS name", spec)));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

impl fmt::Display for OsOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}
