// tests/resolution.rs

//! Integration tests for view merging and key resolution.

mod common;

use common::{Installed, loader, ubuntu_context};
use sysdep::rules::parse_rules;
use sysdep::{Error, Lookup, MemoryLoader, RuleEntry};

#[test]
fn test_resolve_through_layered_views() {
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader());

    let boost = lookup.resolve("boost", "navigation", &ctx).unwrap();
    assert_eq!(boost.installer_key, "apt");
    assert_eq!(boost.items, vec!["libboost-all-dev"]);

    let eigen = lookup.resolve("eigen", "navigation", &ctx).unwrap();
    assert_eq!(eigen.items, vec!["libeigen3-dev"]);

    let yaml = lookup.resolve("python-yaml", "navigation", &ctx).unwrap();
    assert_eq!(yaml.installer_key, "apt");
    assert_eq!(yaml.items, vec!["python3-yaml"]);
}

#[test]
fn test_installer_key_beats_version_key() {
    let installed = Installed::default();
    let mut ctx = ubuntu_context(&installed);
    ctx.set_os_override("ubuntu", "lucid");
    let mut lookup = Lookup::new(loader());

    // `boost` also has a `lucid` entry, but the apt key one level up wins
    let boost = lookup.resolve("boost", "navigation", &ctx).unwrap();
    assert_eq!(boost.items, vec!["libboost-all-dev"]);

    let err = lookup.resolve("eigen", "navigation", &ctx).unwrap_err();
    assert!(err.is_resolution());
}

#[test]
fn test_unsupported_os_is_resolution_error() {
    let installed = Installed::default();
    let mut ctx = ubuntu_context(&installed);
    ctx.set_os_override("freebsd", "14");
    let mut lookup = Lookup::new(loader());

    match lookup.resolve("zlib", "compression", &ctx) {
        Err(Error::ResolutionError(failure)) => {
            assert_eq!(failure.os_name, "freebsd");
            assert!(failure.message.contains("Unsupported OS"));
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
}

#[test]
fn test_batch_fault_isolation() {
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader());

    let bulk = lookup
        .resolve_all(&["compression", "broken", "standalone", "navigation"], &ctx)
        .unwrap();

    assert_eq!(
        bulk.resolutions.get("apt").unwrap(),
        &vec!["libboost-all-dev", "libeigen3-dev", "zlib1g-dev"]
    );
    let failed: Vec<&str> = bulk.errors.keys().map(String::as_str).collect();
    assert_eq!(failed, vec!["broken", "standalone"]);
    assert!(bulk.errors.values().all(Error::is_resolution));
}

#[test]
fn test_secondary_dependencies_are_resolved() {
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader());

    let bulk = lookup.resolve_all(&["plotting"], &ctx).unwrap();
    assert!(bulk.errors.is_empty());
    assert_eq!(bulk.resolutions.get("pip").unwrap(), &vec!["matplotlib", "numpy"]);
    assert_eq!(bulk.resolutions.get("apt").unwrap(), &vec!["pkg-config"]);
}

#[test]
fn test_secondary_dependency_cycle_terminates() {
    let rules = r#"
a:
  ubuntu:
    pip:
      packages: [a]
      depends: [b]
b:
  ubuntu:
    pip:
      packages: [b]
      depends: [a]
"#;
    let mut loader = MemoryLoader::new();
    loader
        .add_view_yaml("cyclic", rules, vec![], "cyclic.yaml")
        .add_package("loop", ["a"], Some("cyclic"));

    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader);

    let bulk = lookup.resolve_all(&["loop"], &ctx).unwrap();
    assert_eq!(bulk.resolutions.get("pip").unwrap(), &vec!["a", "b"]);
}

#[test]
fn test_override_precedence() {
    let overrides = parse_rules(
        "boost:\n  ubuntu: [boost-from-source]\nzlib:\n  ubuntu: [zlib-ng]\n",
        "overrides.yaml",
    )
    .unwrap();
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader()).with_override(RuleEntry::new(overrides, vec![], "overrides.yaml"));

    assert_eq!(
        lookup.resolve("boost", "navigation", &ctx).unwrap().items,
        vec!["boost-from-source"]
    );
    assert_eq!(
        lookup.resolve("zlib", "compression", &ctx).unwrap().items,
        vec!["zlib-ng"]
    );

    // Merging the base layers in either order still ends with the override
    lookup.load_all_views();
    for order in [["base", "jammy"], ["jammy", "base"]] {
        let ids: Vec<String> = order.iter().map(|s| s.to_string()).collect();
        let view = lookup.create_view("custom", &ids).unwrap();
        assert_eq!(view.lookup("zlib").unwrap().origin, "overrides.yaml");
    }
}

#[test]
fn test_conflicting_layers() {
    let mut loader = MemoryLoader::new();
    loader
        .add_view_yaml("base", "zlib:\n  ubuntu: [zlib1g-dev]\n", vec![], "base.yaml")
        .add_view_yaml("same", "zlib:\n  ubuntu: [zlib1g-dev]\n", vec!["base".to_string()], "same.yaml")
        .add_view_yaml("other", "zlib:\n  ubuntu: [zlib-ng]\n", vec!["base".to_string()], "other.yaml")
        .add_package("ok", ["zlib"], Some("same"))
        .add_package("clash", ["zlib"], Some("other"));

    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader);

    assert_eq!(lookup.resolve("zlib", "ok", &ctx).unwrap().items, vec!["zlib1g-dev"]);

    match lookup.resolve("zlib", "clash", &ctx) {
        Err(Error::ConflictError(conflict)) => {
            assert_eq!(conflict.key, "zlib");
            assert!(conflict.to_string().starts_with("Rules for zlib do not match"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    // A conflict aborts the batch rather than being attributed to one package
    assert!(lookup.resolve_all(&["ok", "clash"], &ctx).is_err());
}

#[test]
fn test_where_defined_and_what_needs() {
    let mut lookup = Lookup::new(loader());

    let defined: Vec<String> = lookup
        .views_that_define("eigen")
        .into_iter()
        .map(|(view, _)| view)
        .collect();
    assert_eq!(defined, vec!["jammy"]);

    assert_eq!(lookup.packages_that_need("boost"), vec!["navigation", "standalone"]);
    assert!(lookup.errors().is_empty());
}

#[test]
fn test_database_listing() {
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader());

    let (rows, errors) = lookup.resolve_database("jammy", &ctx, None).unwrap();
    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "boost",
            "eigen",
            "pkg-config",
            "python-matplotlib",
            "python-numpy",
            "python-yaml",
            "zlib"
        ]
    );
    assert!(errors.is_empty());

    let pip_only = vec!["pip".to_string()];
    let (rows, _) = lookup.resolve_database("jammy", &ctx, Some(&pip_only)).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_partially_resolvable_package() {
    let mut loader = loader();
    loader.add_package("mixed", ["zlib", "no-such-key"], Some("jammy"));
    let installed = Installed::default();
    let ctx = ubuntu_context(&installed);
    let mut lookup = Lookup::new(loader);

    let bulk = lookup.resolve_all(&["mixed", "compression"], &ctx).unwrap();
    assert_eq!(bulk.resolutions.get("apt").unwrap(), &vec!["zlib1g-dev"]);
    match bulk.errors.get("mixed") {
        Some(Error::ResolutionError(failure)) => assert_eq!(failure.key, "no-such-key"),
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert!(!bulk.errors.contains_key("compression"));
}
