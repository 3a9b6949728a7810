// src/lookup/mod.rs

//! Dependency lookup and resolution
//!
//! [`Lookup`] is the session object that ties the pieces together: it
//! loads views into the rule store on demand, merges them into cached
//! [`View`]s, resolves dependency keys for the configured platform and
//! resolves whole sets of packages at once.
//!
//! Caches live on the `Lookup` instance and are never invalidated. Rule
//! store changes made after a view was first built are not reflected in
//! that view. Resolutions are keyed by key, OS, view and the OS's
//! installer keys and default installer; replacing the installer
//! registered under a key does not invalidate them.

mod definition;
mod view;

pub use definition::{Definition, PlatformRule};
pub use view::View;

use crate::error::{Error, Result};
use crate::graph::{DependencyGraph, GraphNode};
use crate::installer::InstallerContext;
use crate::loader::RuleLoader;
use crate::rules::{RuleEntry, RuleStore};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// View id reported for definitions that come from the override layer
pub const OVERRIDE_VIEW: &str = "<override>";

/// A dependency key resolved for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub installer_key: String,
    /// Items for the installer, as returned by its `resolve`
    pub items: Vec<String>,
    /// Further dependency keys declared by the installer
    pub dependencies: Vec<String>,
}

/// Result of resolving a batch of packages
#[derive(Debug, Default)]
pub struct BulkResolution {
    /// Installer key -> consolidated items
    pub resolutions: IndexMap<String, Vec<String>>,
    /// Package name -> why it could not be resolved
    pub errors: IndexMap<String, Error>,
}

/// One row of a resolved view listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRow {
    pub key: String,
    pub installer_key: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolveCacheKey {
    key: String,
    os_name: String,
    os_version: String,
    view: String,
    installer_keys: Vec<String>,
    default_installer: Option<String>,
}

/// Errors that only concern one package of a batch
fn is_isolated(err: &Error) -> bool {
    matches!(err, Error::ResolutionError(_) | Error::NotFoundError(_))
}

fn with_origin(err: Error, origin: &str) -> Error {
    match err {
        Error::InvalidDataError { message, origin: None } => Error::InvalidDataError {
            message,
            origin: Some(origin.to_string()),
        },
        other => other,
    }
}

pub struct Lookup {
    store: RuleStore,
    loader: Box<dyn RuleLoader>,
    override_entry: Option<RuleEntry>,
    view_cache: HashMap<String, Arc<View>>,
    resolve_cache: HashMap<ResolveCacheKey, Resolution>,
    errors: Vec<Error>,
}

impl Lookup {
    pub fn new(loader: impl RuleLoader + 'static) -> Self {
        Self {
            store: RuleStore::new(),
            loader: Box::new(loader),
            override_entry: None,
            view_cache: HashMap::new(),
            resolve_cache: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Add a rule layer that is merged last and overrides every view
    pub fn with_override(mut self, entry: RuleEntry) -> Self {
        self.override_entry = Some(entry);
        self
    }

    pub fn override_entry(&self) -> Option<&RuleEntry> {
        self.override_entry.as_ref()
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RuleStore {
        &mut self.store
    }

    pub fn loader(&self) -> &dyn RuleLoader {
        self.loader.as_ref()
    }

    /// Errors collected by fault-tolerant operations such as
    /// [`Lookup::load_all_views`]; they accumulate across calls
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    pub fn dependency_keys(&self, package: &str) -> Result<Vec<String>> {
        self.loader.dependency_keys(package)
    }

    /// Sorted, de-duplicated dependency keys of several packages
    pub fn keys_for<S: AsRef<str>>(&self, packages: &[S]) -> Result<Vec<String>> {
        let mut keys = BTreeSet::new();
        for package in packages {
            keys.extend(self.loader.dependency_keys(package.as_ref())?);
        }
        Ok(keys.into_iter().collect())
    }

    /// Packages that directly depend on a key
    pub fn packages_that_need(&mut self, key: &str) -> Vec<String> {
        let mut needed_by = Vec::new();
        for package in self.loader.loadable_packages() {
            match self.loader.dependency_keys(&package) {
                Ok(keys) if keys.iter().any(|k| k == key) => needed_by.push(package),
                Ok(_) => {}
                Err(e) => self.errors.push(e),
            }
        }
        needed_by
    }

    /// Load a view and, recursively, the views it depends on
    ///
    /// Already loaded views are skipped. A view whose data is invalid is
    /// marked loaded so it is not retried, and the error is returned.
    pub fn load_view_dependencies(&mut self, view_id: &str) -> Result<()> {
        if self.store.is_loaded(view_id) {
            return Ok(());
        }
        debug!("Loading view [{}]", view_id);
        if let Err(e) = self.loader.load_view(view_id, &mut self.store) {
            if matches!(e, Error::InvalidDataError { .. }) {
                self.store.mark_loaded(view_id);
            }
            return Err(e);
        }

        let depends_on = self.store.get_view_data(view_id)?.depends_on.clone();
        for dep in &depends_on {
            self.load_view_dependencies(dep)?;
        }
        Ok(())
    }

    /// Load every view the loader knows about
    ///
    /// Missing or invalid views are recorded in [`Lookup::errors`].
    pub fn load_all_views(&mut self) {
        for view_id in self.loader.loadable_views() {
            if let Err(e) = self.load_view_dependencies(&view_id) {
                warn!("Failed to load view [{}]: {}", view_id, e);
                self.errors.push(e);
            }
        }
    }

    /// Merge loaded views into a new view
    ///
    /// Entries are merged in the given order; the override layer, if any,
    /// is merged last and replaces conflicting definitions.
    ///
    /// # Errors
    ///
    /// `NotFoundError` for views that are not loaded, `ConflictError` when
    /// two views disagree about a key.
    pub fn create_view(&self, view_id: &str, ordered_view_ids: &[String]) -> Result<View> {
        let mut view = View::new(view_id);
        for id in ordered_view_ids {
            view.merge(self.store.get_view_data(id)?, false)?;
        }
        if let Some(entry) = &self.override_entry {
            view.merge(entry, true)?;
        }
        Ok(view)
    }

    /// The merged view for a view id, built on first use and then cached
    pub fn get_view(&mut self, view_id: &str) -> Result<Arc<View>> {
        if let Some(view) = self.view_cache.get(view_id) {
            return Ok(Arc::clone(view));
        }

        self.load_view_dependencies(view_id)?;
        let mut ordered = vec![view_id.to_string()];
        ordered.extend(self.store.get_view_dependencies(view_id)?);
        debug!("Creating view [{}] from {:?}", view_id, ordered);

        let view = Arc::new(self.create_view(view_id, &ordered)?);
        self.view_cache.insert(view_id.to_string(), Arc::clone(&view));
        Ok(view)
    }

    /// The view a package's keys resolve in, `None` if it has no view
    pub fn view_for_package(&mut self, package: &str) -> Result<Option<Arc<View>>> {
        match self.loader.view_key(package)? {
            Some(view_id) => self.get_view(&view_id).map(Some),
            None => Ok(None),
        }
    }

    /// Views whose own rule data defines a key, with their origins
    ///
    /// Loads every view as a side effect; load failures end up in
    /// [`Lookup::errors`].
    pub fn views_that_define(&mut self, key: &str) -> Vec<(String, String)> {
        self.load_all_views();
        let mut defined_in: Vec<(String, String)> = self
            .store
            .view_names()
            .filter_map(|name| {
                let entry = self.store.get_view_data(name).ok()?;
                entry
                    .data
                    .contains_key(key)
                    .then(|| (name.to_string(), entry.origin.clone()))
            })
            .collect();

        if let Some(entry) = &self.override_entry {
            if entry.data.contains_key(key) {
                defined_in.push((OVERRIDE_VIEW.to_string(), entry.origin.clone()));
            }
        }
        defined_in
    }

    /// Resolve a key in the view of the package that needs it
    ///
    /// # Errors
    ///
    /// `ResolutionError` when the package has no view, the key is not
    /// defined, the OS or installer is unsupported, or the rule has no
    /// entry for this platform. Errors building the view propagate as is.
    pub fn resolve(&mut self, key: &str, package: &str, ctx: &InstallerContext) -> Result<Resolution> {
        let (os_name, os_version) = ctx.os_name_and_version()?;
        let view = self.view_for_package(package)?.ok_or_else(|| {
            Error::resolution(
                key,
                None,
                &os_name,
                &os_version,
                format!("[{}] does not have a view", package),
            )
        })?;
        self.resolve_in_view(key, &view, &os_name, &os_version, ctx)
    }

    fn resolve_in_view(
        &mut self,
        key: &str,
        view: &View,
        os_name: &str,
        os_version: &str,
        ctx: &InstallerContext,
    ) -> Result<Resolution> {
        let definition = view.lookup(key).map_err(|_| {
            Error::resolution(
                key,
                None,
                os_name,
                os_version,
                format!("Cannot locate definition for [{}]", key),
            )
        })?;

        let unsupported_os = |_| {
            Error::resolution(
                key,
                Some(&definition.data),
                os_name,
                os_version,
                format!("Unsupported OS [{}]", os_name),
            )
        };
        let installer_keys = ctx.os_installer_keys(os_name).map_err(unsupported_os)?;
        let default_key = ctx.default_os_installer_key(os_name).map_err(unsupported_os)?;

        let cache_key = ResolveCacheKey {
            key: key.to_string(),
            os_name: os_name.to_string(),
            os_version: os_version.to_string(),
            view: view.name.clone(),
            installer_keys: installer_keys.clone(),
            default_installer: default_key.clone(),
        };
        if let Some(cached) = self.resolve_cache.get(&cache_key) {
            debug!("Resolution cache hit for [{}] in view [{}]", key, view.name);
            return Ok(cached.clone());
        }

        let rule = definition.rule_for_platform(os_name, os_version, &installer_keys, default_key.as_deref())?;
        let installer = ctx.installer(&rule.installer_key).map_err(|_| {
            Error::resolution(
                key,
                Some(&definition.data),
                os_name,
                os_version,
                format!("Unsupported installer [{}]", rule.installer_key),
            )
        })?;

        let items = installer
            .resolve(&rule.install_spec)
            .map_err(|e| with_origin(e, &definition.origin))?;
        let resolution = Resolution {
            installer_key: rule.installer_key,
            items,
            dependencies: installer.depends(&rule.install_spec),
        };
        debug!(
            "Resolved [{}] -> {} {:?}",
            key, resolution.installer_key, resolution.items
        );

        self.resolve_cache.insert(cache_key, resolution.clone());
        Ok(resolution)
    }

    /// Resolve every key a package needs, including installer-declared
    /// dependencies
    ///
    /// Each direct key is resolved together with its installer-declared
    /// dependencies. If any of them fails with an isolated error the whole
    /// chain is dropped, the other keys are kept and the last such error is
    /// returned next to the resolutions. A key already resolved for this
    /// package is not resolved again, so cycles in installer-declared
    /// dependencies terminate.
    fn resolve_package(
        &mut self,
        package: &str,
        ctx: &InstallerContext,
    ) -> Result<(Vec<(String, Resolution)>, Option<Error>)> {
        let keys = self.loader.dependency_keys(package)?;
        debug!("[{}] requires keys {:?}", package, keys);

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let mut failure = None;
        for key in keys {
            match self.resolve_chain(&key, package, ctx, &seen) {
                Ok(chain) => {
                    seen.extend(chain.iter().map(|(k, _)| k.clone()));
                    resolved.extend(chain);
                }
                Err(e) if is_isolated(&e) => {
                    warn!("Unable to resolve [{}] for [{}]: {}", key, package, e);
                    failure = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((resolved, failure))
    }

    fn resolve_chain(
        &mut self,
        key: &str,
        package: &str,
        ctx: &InstallerContext,
        seen: &HashSet<String>,
    ) -> Result<Vec<(String, Resolution)>> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut pending = vec![key.to_string()];
        while let Some(key) = pending.pop() {
            if seen.contains(&key) || !visited.insert(key.clone()) {
                debug!("[{}] already resolved for [{}]", key, package);
                continue;
            }
            let resolution = self.resolve(&key, package, ctx)?;
            pending.extend(resolution.dependencies.iter().cloned());
            chain.push((key, resolution));
        }
        Ok(chain)
    }

    /// Resolve all keys required by a set of packages
    ///
    /// A package that cannot be fully resolved (unknown package, missing key
    /// or no rule for this platform) is recorded in the returned errors; its
    /// resolvable keys are still included and the other packages are
    /// unaffected. Results are consolidated per installer with the
    /// installer's `unique`.
    ///
    /// # Errors
    ///
    /// Invalid rule data, view conflicts and OS detection failures are
    /// not isolated to one package and abort the batch.
    pub fn resolve_all<S: AsRef<str>>(
        &mut self,
        packages: &[S],
        ctx: &InstallerContext,
    ) -> Result<BulkResolution> {
        let mut collected: IndexMap<String, Vec<Vec<String>>> = IndexMap::new();
        let mut errors = IndexMap::new();

        for package in packages {
            let package = package.as_ref();
            match self.resolve_package(package, ctx) {
                Ok((resolved, failure)) => {
                    for (_, resolution) in resolved {
                        collected
                            .entry(resolution.installer_key)
                            .or_default()
                            .push(resolution.items);
                    }
                    if let Some(e) = failure {
                        errors.insert(package.to_string(), e);
                    }
                }
                Err(e) if is_isolated(&e) => {
                    warn!("Unable to resolve [{}]: {}", package, e);
                    errors.insert(package.to_string(), e);
                }
                Err(e) => return Err(e),
            }
        }

        let mut resolutions = IndexMap::new();
        for (installer_key, item_lists) in collected {
            let merged = ctx.installer(&installer_key)?.unique(&item_lists);
            resolutions.insert(installer_key, merged);
        }

        Ok(BulkResolution { resolutions, errors })
    }

    /// Resolve packages into a dependency graph of keys
    ///
    /// Each resolved key becomes a node whose dependencies are its
    /// installer-declared keys. Nodes are added in resolution order; when
    /// two packages resolve the same key the first resolution is kept.
    pub fn resolve_graph<S: AsRef<str>>(
        &mut self,
        packages: &[S],
        ctx: &InstallerContext,
    ) -> Result<(DependencyGraph, IndexMap<String, Error>)> {
        let mut graph = DependencyGraph::new();
        let mut errors = IndexMap::new();

        for package in packages {
            let package = package.as_ref();
            match self.resolve_package(package, ctx) {
                Ok((resolved, failure)) => {
                    for (key, resolution) in resolved {
                        if graph.contains(&key) {
                            continue;
                        }
                        graph.add_node(
                            key,
                            GraphNode::new(resolution.installer_key, resolution.items)
                                .with_dependencies(resolution.dependencies),
                        );
                    }
                    if let Some(e) = failure {
                        errors.insert(package.to_string(), e);
                    }
                }
                Err(e) if is_isolated(&e) => {
                    warn!("Unable to resolve [{}]: {}", package, e);
                    errors.insert(package.to_string(), e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((graph, errors))
    }

    /// Resolve every key of a view, sorted by key
    ///
    /// Keys that cannot be resolved for this platform are returned as
    /// errors. With `installer_filter`, only rows for those installers are
    /// kept.
    pub fn resolve_database(
        &mut self,
        view_id: &str,
        ctx: &InstallerContext,
        installer_filter: Option<&[String]>,
    ) -> Result<(Vec<DatabaseRow>, Vec<Error>)> {
        let (os_name, os_version) = ctx.os_name_and_version()?;
        let view = self.get_view(view_id)?;
        let mut keys: Vec<String> = view.keys().map(str::to_string).collect();
        keys.sort();

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        for key in keys {
            match self.resolve_in_view(&key, &view, &os_name, &os_version, ctx) {
                Ok(resolution) => {
                    let wanted = installer_filter
                        .is_none_or(|filter| filter.iter().any(|k| *k == resolution.installer_key));
                    if wanted {
                        rows.push(DatabaseRow {
                            key,
                            installer_key: resolution.installer_key,
                            items: resolution.items,
                        });
                    }
                }
                Err(e) if is_isolated(&e) => errors.push(e),
                Err(e) => return Err(e),
            }
        }
        Ok((rows, errors))
    }
}
