// src/loader.rs

//! Sources of rule data and package metadata
//!
//! A [`RuleLoader`] knows which views exist, how to put a view's rules
//! into the [`RuleStore`], which dependency keys a package declares and
//! which view a package belongs to. Fetching and caching remote rule
//! files is the loader's business, not the resolver's.

use crate::error::{Error, Result};
use crate::rules::{RuleMap, RuleStore, parse_rules};
use indexmap::IndexMap;
use tracing::debug;

pub trait RuleLoader {
    /// Load one view's rules into the store
    ///
    /// # Errors
    ///
    /// `NotFoundError` if the view does not exist, `InvalidDataError` if
    /// its rules cannot be parsed.
    fn load_view(&self, view_id: &str, store: &mut RuleStore) -> Result<()>;

    /// Every view this loader can load
    fn loadable_views(&self) -> Vec<String>;

    /// Every package this loader knows about
    fn loadable_packages(&self) -> Vec<String>;

    /// Dependency keys a package declares directly
    fn dependency_keys(&self, package: &str) -> Result<Vec<String>>;

    /// The view a package's keys are resolved in, if any
    fn view_key(&self, package: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
enum RuleSource {
    Parsed(RuleMap),
    Yaml(String),
}

#[derive(Debug, Clone)]
struct ViewSource {
    rules: RuleSource,
    depends_on: Vec<String>,
    origin: String,
}

#[derive(Debug, Clone)]
struct PackageSource {
    keys: Vec<String>,
    view: Option<String>,
}

/// Loader over views and packages registered in memory
///
/// YAML sources are parsed when the view is loaded, so a broken file only
/// affects lookups that need it.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    views: IndexMap<String, ViewSource>,
    packages: IndexMap<String, PackageSource>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view with already parsed rules
    pub fn add_view(
        &mut self,
        view_id: impl Into<String>,
        rules: RuleMap,
        depends_on: Vec<String>,
        origin: impl Into<String>,
    ) -> &mut Self {
        self.views.insert(
            view_id.into(),
            ViewSource {
                rules: RuleSource::Parsed(rules),
                depends_on,
                origin: origin.into(),
            },
        );
        self
    }

    /// Register a view whose rules are YAML text
    pub fn add_view_yaml(
        &mut self,
        view_id: impl Into<String>,
        yaml: impl Into<String>,
        depends_on: Vec<String>,
        origin: impl Into<String>,
    ) -> &mut Self {
        self.views.insert(
            view_id.into(),
            ViewSource {
                rules: RuleSource::Yaml(yaml.into()),
                depends_on,
                origin: origin.into(),
            },
        );
        self
    }

    /// Register a package, its dependency keys and its enclosing view
    pub fn add_package<I, S>(&mut self, name: impl Into<String>, keys: I, view: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.insert(
            name.into(),
            PackageSource {
                keys: keys.into_iter().map(Into::into).collect(),
                view: view.map(str::to_string),
            },
        );
        self
    }

    fn package(&self, package: &str) -> Result<&PackageSource> {
        self.packages
            .get(package)
            .ok_or_else(|| Error::NotFoundError(format!("package [{}]", package)))
    }
}

impl RuleLoader for MemoryLoader {
    fn load_view(&self, view_id: &str, store: &mut RuleStore) -> Result<()> {
        let source = self
            .views
            .get(view_id)
            .ok_or_else(|| Error::NotFoundError(format!("view [{}]", view_id)))?;

        let rules = match &source.rules {
            RuleSource::Parsed(rules) => rules.clone(),
            RuleSource::Yaml(text) => parse_rules(text, &source.origin)?,
        };
        debug!("Loaded view [{}] with {} rules", view_id, rules.len());
        store.set_view_data(view_id, rules, source.depends_on.clone(), source.origin.clone());
        Ok(())
    }

    fn loadable_views(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }

    fn loadable_packages(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn dependency_keys(&self, package: &str) -> Result<Vec<String>> {
        Ok(self.package(package)?.keys.clone())
    }

    fn view_key(&self, package: &str) -> Result<Option<String>> {
        Ok(self.package(package)?.view.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_yaml_view() {
        let mut loader = MemoryLoader::new();
        loader.add_view_yaml("base", "boost:\n  ubuntu: libboost-dev\n", vec![], "base.yaml");

        let mut store = RuleStore::new();
        loader.load_view("base", &mut store).unwrap();
        let entry = store.get_view_data("base").unwrap();
        assert_eq!(entry.origin, "base.yaml");
        assert!(entry.data.contains_key("boost"));
    }

    #[test]
    fn test_load_unknown_view() {
        let loader = MemoryLoader::new();
        let mut store = RuleStore::new();
        assert!(matches!(
            loader.load_view("nope", &mut store),
            Err(Error::NotFoundError(_))
        ));
    }

    #[test]
    fn test_load_invalid_yaml_view() {
        let mut loader = MemoryLoader::new();
        loader.add_view_yaml("broken", "- not\n- a mapping\n", vec![], "broken.yaml");
        let mut store = RuleStore::new();
        assert!(matches!(
            loader.load_view("broken", &mut store),
            Err(Error::InvalidDataError { .. })
        ));
        assert!(!store.is_loaded("broken"));
    }

    #[test]
    fn test_packages() {
        let mut loader = MemoryLoader::new();
        loader
            .add_package("nav", ["boost", "eigen"], Some("base"))
            .add_package("standalone", Vec::<String>::new(), None);

        assert_eq!(loader.dependency_keys("nav").unwrap(), vec!["boost", "eigen"]);
        assert_eq!(loader.view_key("nav").unwrap().as_deref(), Some("base"));
        assert_eq!(loader.view_key("standalone").unwrap(), None);
        assert!(loader.dependency_keys("missing").is_err());
        assert_eq!(loader.loadable_packages(), vec!["nav", "standalone"]);
    }
}
