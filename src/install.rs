// src/install.rs

//! Planning and running installs for resolved dependencies
//!
//! The planner works out what is still missing, in which order it must
//! be installed and which commands do that. Commands are handed to a
//! [`CommandExecutor`]; nothing in this crate spawns processes itself.

use crate::error::{Error, Result};
use crate::installer::InstallerContext;
use crate::lookup::Lookup;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Runs install commands on behalf of the planner
pub trait CommandExecutor {
    /// Run one command given as an argument vector
    ///
    /// Returns `Ok(false)` when the command ran but failed.
    fn execute(&mut self, argv: &[String]) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Allow the package manager to prompt
    pub interactive: bool,
    /// Log and return commands without running them
    pub simulate: bool,
    /// Install items even if they are already present
    pub reinstall: bool,
    /// Keep going after a failed install and report all failures at the end
    pub continue_on_error: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            interactive: true,
            simulate: false,
            reinstall: false,
            continue_on_error: false,
        }
    }
}

/// Items one installer still has to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub installer_key: String,
    pub items: Vec<String>,
}

pub struct InstallPlanner<'a> {
    lookup: &'a mut Lookup,
    ctx: &'a InstallerContext,
}

impl<'a> InstallPlanner<'a> {
    pub fn new(lookup: &'a mut Lookup, ctx: &'a InstallerContext) -> Self {
        Self { lookup, ctx }
    }

    /// Resolve packages and keep only what is not installed yet
    ///
    /// With `reinstall` every resolved item is kept. Returns one step per
    /// installer, plus the packages that could not be fully resolved.
    pub fn uninstalled<S: AsRef<str>>(
        &mut self,
        packages: &[S],
        reinstall: bool,
    ) -> Result<(Vec<InstallStep>, IndexMap<String, Error>)> {
        let bulk = self.lookup.resolve_all(packages, self.ctx)?;

        let mut steps = Vec::new();
        for (installer_key, resolved) in bulk.resolutions {
            let installer = self.ctx.installer(&installer_key)?;
            let items = installer.packages_to_install(&resolved, reinstall)?;
            debug!("[{}] uninstalled: {:?}", installer_key, items);
            steps.push(InstallStep { installer_key, items });
        }
        Ok((steps, bulk.errors))
    }

    /// Resolve packages into install steps in dependency order
    ///
    /// Steps whose items are all installed already are left out unless
    /// `reinstall` is set.
    ///
    /// # Errors
    ///
    /// `MissingKeyError` or `CycleError` if installer-declared
    /// dependencies do not form a valid graph.
    pub fn plan<S: AsRef<str>>(
        &mut self,
        packages: &[S],
        reinstall: bool,
    ) -> Result<(Vec<InstallStep>, IndexMap<String, Error>)> {
        let (mut graph, errors) = self.lookup.resolve_graph(packages, self.ctx)?;

        let mut steps = Vec::new();
        for unit in graph.ordered_install_list()? {
            let installer = self.ctx.installer(&unit.installer_key)?;
            let items = installer.packages_to_install(&unit.items, reinstall)?;
            if items.is_empty() {
                continue;
            }
            steps.push(InstallStep {
                installer_key: unit.installer_key,
                items,
            });
        }
        Ok((steps, errors))
    }

    /// Install every step in order
    ///
    /// Returns the commands that were run, or would have been run when
    /// simulating.
    ///
    /// # Errors
    ///
    /// The first `InstallError`, or with `continue_on_error` a
    /// `MultipleInstallsFailed` holding all of them. Other errors abort
    /// immediately.
    pub fn install(
        &self,
        steps: &[InstallStep],
        options: InstallOptions,
        executor: &mut dyn CommandExecutor,
    ) -> Result<Vec<Vec<String>>> {
        let mut commands = Vec::new();
        let mut failures = Vec::new();

        for step in steps {
            debug!("Processing dependencies for installer [{}]", step.installer_key);
            match self.install_resolved(&step.installer_key, &step.installer_key, &step.items, options, executor) {
                Ok(run) => commands.extend(run),
                Err(e @ Error::InstallError { .. }) if options.continue_on_error => {
                    warn!("{}", e);
                    failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        if !failures.is_empty() {
            return Err(Error::MultipleInstallsFailed(failures));
        }
        Ok(commands)
    }

    /// Install items already resolved for an installer
    ///
    /// `key` only names the install in logs and errors. After the commands
    /// succeed the installer must report the items as installed.
    pub fn install_resolved(
        &self,
        key: &str,
        installer_key: &str,
        items: &[String],
        options: InstallOptions,
        executor: &mut dyn CommandExecutor,
    ) -> Result<Vec<Vec<String>>> {
        let installer = self.ctx.installer(installer_key)?;
        let commands = installer.install_command(items, options.interactive, options.reinstall)?;
        if commands.is_empty() {
            debug!("[{}] no packages to install", key);
            return Ok(commands);
        }

        for argv in &commands {
            if options.simulate {
                info!("[{}] would run: {}", key, argv.join(" "));
                continue;
            }
            info!("[{}] running: {}", key, argv.join(" "));
            if !executor.execute(argv)? {
                return Err(Error::InstallError {
                    key: key.to_string(),
                    message: format!("command failed: {}", argv.join(" ")),
                });
            }
        }

        if !options.simulate {
            if !installer.is_installed(items)? {
                return Err(Error::InstallError {
                    key: key.to_string(),
                    message: format!(
                        "presence check failed after installation; resolved packages were {:?}",
                        items
                    ),
                });
            }
            debug!("[{}] successfully installed", key);
        }
        Ok(commands)
    }
}
