// tests/common/mod.rs

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use sysdep::{CommandExecutor, FixedOs, InstallerContext, MemoryLoader, PackageManagerInstaller, Result};

/// Rules shared by every release
pub const BASE_RULES: &str = r#"
boost:
  ubuntu:
    apt:
      packages: [libboost-all-dev]
    lucid:
      apt:
        packages: [libboost1.40-all-dev]
  fedora: [boost-devel]
zlib:
  ubuntu: [zlib1g-dev]
  fedora: [zlib-devel]
python-yaml:
  ubuntu: python3-yaml
  osx:
    pip:
      packages: [PyYAML]
"#;

/// Release specific rules layered over the base rules
pub const JAMMY_RULES: &str = r#"
eigen:
  ubuntu:
    jammy:
      apt:
        packages: [libeigen3-dev]
python-matplotlib:
  ubuntu:
    pip:
      packages: [matplotlib]
      depends: [pkg-config, python-numpy]
python-numpy:
  ubuntu:
    pip:
      packages: [numpy]
pkg-config:
  ubuntu: [pkg-config]
"#;

pub type Installed = Arc<Mutex<HashSet<String>>>;

/// Loader with a `base` view and a `jammy` view built on it
///
/// Packages:
/// - `navigation`: boost, eigen
/// - `compression`: zlib
/// - `plotting`: python-matplotlib
/// - `broken`: a key no view defines
/// - `standalone`: no view at all
pub fn loader() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    loader
        .add_view_yaml("base", BASE_RULES, vec![], "base.yaml")
        .add_view_yaml("jammy", JAMMY_RULES, vec!["base".to_string()], "jammy.yaml")
        .add_package("navigation", ["boost", "eigen"], Some("jammy"))
        .add_package("compression", ["zlib"], Some("jammy"))
        .add_package("plotting", ["python-matplotlib"], Some("jammy"))
        .add_package("broken", ["no-such-key"], Some("jammy"))
        .add_package("standalone", ["boost"], None);
    loader
}

fn installer(command: &str, installed: &Installed) -> PackageManagerInstaller {
    let installed = Arc::clone(installed);
    PackageManagerInstaller::new(move |pkgs: &[String]| {
        let installed = installed.lock().unwrap();
        pkgs.iter().filter(|p| installed.contains(*p)).cloned().collect()
    })
    .with_command([command, "install"])
    .with_non_interactive_args(["-y"])
    .with_reinstall_args(["--reinstall"])
}

/// Ubuntu jammy with apt as default and pip with dependency support
pub fn ubuntu_context(installed: &Installed) -> InstallerContext {
    let mut ctx = InstallerContext::new(FixedOs::new("ubuntu", "22.04").with_codename("jammy"));
    ctx.set_installer("apt", installer("apt-get", installed));
    ctx.set_installer("pip", installer("pip", installed).with_depends(true));
    ctx.add_os_installer_key("ubuntu", "apt").unwrap();
    ctx.add_os_installer_key("ubuntu", "pip").unwrap();
    ctx.set_default_os_installer_key("ubuntu", "apt").unwrap();
    ctx.set_os_version_type("ubuntu", sysdep::OsVersionType::Codename);
    ctx
}

/// Executor that records commands and marks their packages installed
pub struct RecordingExecutor {
    pub installed: Installed,
    pub commands: Vec<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new(installed: &Installed) -> Self {
        Self {
            installed: Arc::clone(installed),
            commands: Vec::new(),
        }
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&mut self, argv: &[String]) -> Result<bool> {
        self.commands.push(argv.to_vec());
        let mut installed = self.installed.lock().unwrap();
        installed.extend(argv.iter().skip(2).filter(|a| !a.starts_with('-')).cloned());
        Ok(true)
    }
}
