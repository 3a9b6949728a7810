// src/lib.rs

//! Sysdep: declarative system dependency resolution
//!
//! Maps abstract dependency keys ("boost", "python-yaml") to the concrete
//! packages and installer that provide them on the running platform.
//!
//! # Architecture
//!
//! - Rule store: raw rule data per view, plus the views it builds on
//! - Views: merged rule sets; disagreeing views conflict, the override
//!   layer always wins
//! - Definitions: REP 111 resolution of one key for an OS, version and
//!   installer list
//! - Lookup: cached views and resolutions, bulk resolution with
//!   per-package fault isolation
//! - Graph: installer-declared dependencies ordered dependencies first

pub mod config;
mod error;
pub mod graph;
pub mod install;
pub mod installer;
pub mod loader;
pub mod logging;
pub mod lookup;
pub mod os;
pub mod rules;

pub use config::{Config, OsInstallers};
pub use error::{Error, ResolutionFailure, Result, RuleConflict};
pub use graph::{DependencyGraph, GraphNode, InstallUnit};
pub use install::{CommandExecutor, InstallOptions, InstallPlanner, InstallStep};
pub use installer::{Installer, InstallerContext, PackageManagerInstaller};
pub use loader::{MemoryLoader, RuleLoader};
pub use lookup::{BulkResolution, DatabaseRow, Definition, Lookup, PlatformRule, Resolution, View};
pub use os::{FixedOs, OsDetector, OsOverride, OsVersionType};
pub use rules::{RuleEntry, RuleMap, RuleStore, RuleValue};
