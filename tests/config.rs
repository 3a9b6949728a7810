// tests/config.rs

//! Integration tests for configuration files and the override layer.

mod common;

use common::loader;
use std::fs;
use sysdep::{Config, FixedOs, InstallerContext, Lookup, PackageManagerInstaller};

fn bare_context() -> InstallerContext {
    let mut ctx = InstallerContext::new(FixedOs::new("fedora", "40"));
    ctx.set_installer("apt", PackageManagerInstaller::new(|_: &[String]| Vec::new()));
    ctx.set_installer("dnf", PackageManagerInstaller::new(|_: &[String]| Vec::new()));
    ctx
}

#[test]
fn test_config_drives_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let overrides = dir.path().join("overrides.yaml");
    fs::write(&overrides, "zlib:\n  ubuntu: [zlib-ng-compat-dev]\n").unwrap();

    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            r#"
override_file = "{}"

[os]
name = "ubuntu"
version = "jammy"

[installers.ubuntu]
keys = ["apt"]
default = "apt"

[installers.fedora]
keys = ["dnf"]
default = "dnf"
"#,
            overrides.display()
        ),
    )
    .unwrap();

    let config = Config::load_or_default(Some(&config_path)).unwrap();
    let mut ctx = bare_context();
    config.apply(&mut ctx).unwrap();
    assert_eq!(ctx.os_keys(), vec!["fedora", "ubuntu"]);

    let entry = config.load_override().unwrap().unwrap();
    let mut lookup = Lookup::new(loader()).with_override(entry);

    let zlib = lookup.resolve("zlib", "compression", &ctx).unwrap();
    assert_eq!(zlib.installer_key, "apt");
    assert_eq!(zlib.items, vec!["zlib-ng-compat-dev"]);
}

#[test]
fn test_detected_os_without_override() {
    let config = Config::parse("[installers.fedora]\nkeys = [\"dnf\"]\ndefault = \"dnf\"\n").unwrap();
    let mut ctx = bare_context();
    config.apply(&mut ctx).unwrap();

    let mut lookup = Lookup::new(loader());
    let boost = lookup.resolve("boost", "navigation", &ctx).unwrap();
    assert_eq!(boost.installer_key, "dnf");
    assert_eq!(boost.items, vec!["boost-devel"]);
}

#[test]
fn test_missing_override_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::parse(&format!(
        "override_file = \"{}\"\n",
        dir.path().join("absent.yaml").display()
    ))
    .unwrap();
    assert!(config.load_override().unwrap().is_none());
}

#[test]
fn test_invalid_override_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overrides.yaml");
    fs::write(&path, "- just\n- a list\n").unwrap();

    let config = Config {
        override_file: Some(path),
        ..Config::default()
    };
    assert!(matches!(
        config.load_override(),
        Err(sysdep::Error::InvalidDataError { .. })
    ));
}
