// src/installer/package_manager.rs

//! Generic package manager installer
//!
//! Covers the common case of a package manager that installs a list of
//! package names. Accepted install specs:
//!
//! ```yaml
//! apt:
//!   packages: [libboost-dev, libboost-python-dev]
//!   depends: [python]        # only with dependency support enabled
//! apt: "libboost-dev libboost-python-dev"
//! apt: [libboost-dev, libboost-python-dev]
//! ```

use super::Installer;
use crate::error::{Error, Result};
use crate::rules::RuleValue;
use std::collections::HashSet;
use std::fmt;

/// Returns the subset of the given packages that are already installed
pub type DetectFn = Box<dyn Fn(&[String]) -> Vec<String> + Send + Sync>;

/// Installer for package managers driven by a list of package names
pub struct PackageManagerInstaller {
    detect: DetectFn,
    command: Vec<String>,
    non_interactive_args: Vec<String>,
    reinstall_args: Vec<String>,
    supports_depends: bool,
}

impl PackageManagerInstaller {
    /// Create an installer with a detection callback
    pub fn new<F>(detect: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            detect: Box::new(detect),
            command: Vec::new(),
            non_interactive_args: Vec::new(),
            reinstall_args: Vec::new(),
            supports_depends: false,
        }
    }

    /// Base install command, e.g. `["apt-get", "install"]`
    pub fn with_command<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = argv.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments added when prompts must be suppressed, e.g. `["-y"]`
    pub fn with_non_interactive_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_interactive_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments added when reinstalling, e.g. `["--reinstall"]`
    pub fn with_reinstall_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reinstall_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Honor the `depends` field of install specs
    pub fn with_depends(mut self, supports_depends: bool) -> Self {
        self.supports_depends = supports_depends;
        self
    }
}

impl fmt::Debug for PackageManagerInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageManagerInstaller")
            .field("command", &self.command)
            .field("non_interactive_args", &self.non_interactive_args)
            .field("reinstall_args", &self.reinstall_args)
            .field("supports_depends", &self.supports_depends)
            .finish_non_exhaustive()
    }
}

/// Names from a whitespace-separated string or a list of strings
fn names(value: &RuleValue) -> Result<Vec<String>> {
    match value {
        RuleValue::Str(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        RuleValue::List(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    Error::invalid_data(format!("package names must be strings, found {}", item.kind()), None)
                })
            })
            .collect(),
        other => Err(Error::invalid_data(
            format!("invalid install spec: expected string or list, found {}", other.kind()),
            None,
        )),
    }
}

impl Installer for PackageManagerInstaller {
    fn resolve(&self, install_spec: &RuleValue) -> Result<Vec<String>> {
        match install_spec {
            RuleValue::Map(map) => match map.get("packages") {
                Some(packages) => names(packages),
                None => Ok(Vec::new()),
            },
            other => names(other),
        }
    }

    fn packages_to_install(&self, items: &[String], reinstall: bool) -> Result<Vec<String>> {
        if reinstall {
            return Ok(items.to_vec());
        }
        let installed: HashSet<String> = (self.detect)(items).into_iter().collect();
        Ok(items
            .iter()
            .filter(|item| !installed.contains(*item))
            .cloned()
            .collect())
    }

    fn install_command(
        &self,
        items: &[String],
        interactive: bool,
        reinstall: bool,
    ) -> Result<Vec<Vec<String>>> {
        let packages = self.packages_to_install(items, reinstall)?;
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        if self.command.is_empty() {
            return Err(Error::ConfigError(
                "package manager installer has no install command".to_string(),
            ));
        }

        let mut argv = self.command.clone();
        if !interactive {
            argv.extend(self.non_interactive_args.iter().cloned());
        }
        if reinstall {
            argv.extend(self.reinstall_args.iter().cloned());
        }
        argv.extend(packages);
        Ok(vec![argv])
    }

    fn depends(&self, install_spec: &RuleValue) -> Vec<String> {
        if !self.supports_depends {
            return Vec::new();
        }
        install_spec
            .get("depends")
            .and_then(|deps| names(deps).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apt(installed: &'static [&'static str]) -> PackageManagerInstaller {
        PackageManagerInstaller::new(move |pkgs: &[String]| {
            pkgs.iter()
                .filter(|p| installed.contains(&p.as_str()))
                .cloned()
                .collect()
        })
        .with_command(["apt-get", "install"])
        .with_non_interactive_args(["-y"])
        .with_reinstall_args(["--reinstall"])
    }

    #[test]
    fn test_resolve_spec_shapes() {
        let installer = apt(&[]);
        let expected = vec!["a".to_string(), "b".to_string()];

        let spec = RuleValue::map([("packages", RuleValue::strings(["a", "b"]))]);
        assert_eq!(installer.resolve(&spec).unwrap(), expected);

        let spec = RuleValue::map([("packages", RuleValue::from("a  b"))]);
        assert_eq!(installer.resolve(&spec).unwrap(), expected);

        assert_eq!(installer.resolve(&RuleValue::from("a b")).unwrap(), expected);
        assert_eq!(installer.resolve(&RuleValue::strings(["a", "b"])).unwrap(), expected);

        let spec = RuleValue::map([("depends", RuleValue::strings(["x"]))]);
        assert!(installer.resolve(&spec).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_invalid_spec() {
        let installer = apt(&[]);
        assert!(installer.resolve(&RuleValue::Int(1)).is_err());
        assert!(installer.resolve(&RuleValue::List(vec![RuleValue::Bool(true)])).is_err());
    }

    #[test]
    fn test_unique_is_sorted_union() {
        let installer = apt(&[]);
        let merged = installer.unique(&[
            vec!["zlib".to_string(), "boost".to_string()],
            vec!["boost".to_string(), "curl".to_string()],
        ]);
        assert_eq!(merged, vec!["boost", "curl", "zlib"]);
    }

    #[test]
    fn test_packages_to_install() {
        let installer = apt(&["boost"]);
        let items = vec!["boost".to_string(), "zlib".to_string()];
        assert_eq!(installer.packages_to_install(&items, false).unwrap(), vec!["zlib"]);
        assert_eq!(installer.packages_to_install(&items, true).unwrap(), items);
        assert!(!installer.is_installed(&items).unwrap());
        assert!(installer.is_installed(&["boost".to_string()]).unwrap());
    }

    #[test]
    fn test_install_command() {
        let installer = apt(&["boost"]);
        let items = vec!["boost".to_string(), "zlib".to_string()];

        let cmds = installer.install_command(&items, true, false).unwrap();
        assert_eq!(cmds, vec![vec!["apt-get", "install", "zlib"]]);

        let cmds = installer.install_command(&items, false, true).unwrap();
        assert_eq!(
            cmds,
            vec![vec!["apt-get", "install", "-y", "--reinstall", "boost", "zlib"]]
        );

        let cmds = installer.install_command(&["boost".to_string()], false, false).unwrap();
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_install_command_requires_base_command() {
        let installer = PackageManagerInstaller::new(|_: &[String]| Vec::new());
        assert!(installer.install_command(&["x".to_string()], true, false).is_err());
    }

    #[test]
    fn test_depends() {
        let spec = RuleValue::map([
            ("packages", RuleValue::strings(["matplotlib"])),
            ("depends", RuleValue::strings(["pkg-config"])),
        ]);
        assert!(apt(&[]).depends(&spec).is_empty());
        assert_eq!(apt(&[]).with_depends(true).depends(&spec), vec!["pkg-config"]);
        assert!(apt(&[]).with_depends(true).depends(&RuleValue::from("x")).is_empty());
    }
}
