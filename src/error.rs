// src/error.rs

//! Error types for rule storage, view merging, resolution and install ordering

use crate::lookup::Definition;
use crate::rules::RuleValue;
use std::fmt;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A view, key or package is not present
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Two views define incompatible rules for the same key
    #[error(transparent)]
    ConflictError(Box<RuleConflict>),

    /// Raw rule data has the wrong shape
    #[error("Invalid rule data{}: {message}", origin.as_deref().map(|o| format!(" in [{o}]")).unwrap_or_default())]
    InvalidDataError {
        message: String,
        origin: Option<String>,
    },

    /// A key exists but has no rule for the requested platform
    #[error(transparent)]
    ResolutionError(Box<ResolutionFailure>),

    /// A graph node lists a dependency that is not in the graph
    #[error("Invalid graph structure: key `{0}` does not exist in the graph")]
    MissingKeyError(String),

    /// The dependency graph is not acyclic
    #[error("A cycle in the dependency graph occurred with key `{0}`")]
    CycleError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// An install command failed or left packages missing
    #[error("Failed to install [{key}]: {message}")]
    InstallError { key: String, message: String },

    #[error("{} installs failed", .0.len())]
    MultipleInstallsFailed(Vec<Error>),
}

impl Error {
    pub(crate) fn invalid_data(message: impl Into<String>, origin: Option<&str>) -> Self {
        Error::InvalidDataError {
            message: message.into(),
            origin: origin.map(str::to_string),
        }
    }

    pub(crate) fn resolution(
        key: &str,
        data: Option<&RuleValue>,
        os_name: &str,
        os_version: &str,
        message: impl Into<String>,
    ) -> Self {
        Error::ResolutionError(Box::new(ResolutionFailure {
            key: key.to_string(),
            data: data.cloned(),
            os_name: os_name.to_string(),
            os_version: os_version.to_string(),
            message: message.into(),
        }))
    }

    /// True for the expected "not defined for this platform" failure
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::ResolutionError(_))
    }
}

/// Details of a failed platform resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub key: String,
    pub data: Option<RuleValue>,
    pub os_name: String,
    pub os_version: String,
    pub message: String,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = match &self.data {
            Some(data) => data.to_yaml(),
            None => "<no data>".to_string(),
        };
        write!(
            f,
            "{}\n\tkey        : {}\n\tOS name    : {}\n\tOS version : {}\n\tData: {}",
            self.message, self.key, self.os_name, self.os_version, data
        )
    }
}

impl std::error::Error for ResolutionFailure {}

/// Two definitions of the same key that cannot be merged
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConflict {
    pub key: String,
    pub existing: Definition,
    pub incoming: Definition,
}

impl fmt::Display for RuleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rules for {} do not match:\nIn [{}]\n\n{}\nIn [{}]\n\n{}",
            self.key,
            self.existing.origin,
            self.existing.data.to_yaml(),
            self.incoming.origin,
            self.incoming.data.to_yaml()
        )
    }
}

impl std::error::Error for RuleConflict {}
