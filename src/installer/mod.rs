// src/installer/mod.rs

//! Installer interface and registry
//!
//! An installer turns the install spec chosen by resolution into items it
//! understands (usually package names) and knows how to build the
//! commands that install them. Command execution itself is left to the
//! host through [`crate::install::CommandExecutor`].

mod context;
mod package_manager;

pub use context::InstallerContext;
pub use package_manager::{DetectFn, PackageManagerInstaller};

use crate::error::Result;
use crate::rules::RuleValue;
use std::collections::BTreeSet;

/// Common interface for all installers (apt, pip, homebrew, ...)
pub trait Installer: Send + Sync {
    /// Interpret an install spec as the items to install
    fn resolve(&self, install_spec: &RuleValue) -> Result<Vec<String>>;

    /// Commands that install the missing subset of `items`
    ///
    /// Returns an empty list when nothing needs installing. Each command
    /// is an argument vector.
    fn install_command(
        &self,
        items: &[String],
        interactive: bool,
        reinstall: bool,
    ) -> Result<Vec<Vec<String>>>;

    /// Items that still need installing
    ///
    /// With `reinstall` set, every item is returned.
    fn packages_to_install(&self, items: &[String], reinstall: bool) -> Result<Vec<String>>;

    /// True if all items are installed
    fn is_installed(&self, items: &[String]) -> Result<bool> {
        Ok(self.packages_to_install(items, false)?.is_empty())
    }

    /// Combine the results of several `resolve` calls
    ///
    /// The default is the sorted union of all items.
    fn unique(&self, resolved: &[Vec<String>]) -> Vec<String> {
        resolved
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Other dependency keys this spec needs
    ///
    /// Only installers whose package manager cannot track dependencies
    /// itself return anything here.
    fn depends(&self, _install_spec: &RuleValue) -> Vec<String> {
        Vec::new()
    }
}
