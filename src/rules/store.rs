// src/rules/store.rs

//! In-memory rule database
//!
//! Stores one [`RuleEntry`] per view. An entry is the raw rule data a
//! view contributes plus the other views its rules build on. Entries are
//! replaced wholesale, never edited in place.

use super::RuleMap;
use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};

/// Origin recorded for entries that were created without a backing file
pub const DYNAMIC_ORIGIN: &str = "<dynamic>";

/// Raw rule data and metadata for a single view
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleEntry {
    /// Dependency key -> raw rule
    pub data: RuleMap,
    /// Views this view depends on, in declaration order
    pub depends_on: Vec<String>,
    /// Where the data came from (e.g. a file path)
    pub origin: String,
}

impl RuleEntry {
    pub fn new(data: RuleMap, depends_on: Vec<String>, origin: impl Into<String>) -> Self {
        Self {
            data,
            depends_on,
            origin: origin.into(),
        }
    }
}

/// Rule data for every loaded view
#[derive(Debug, Default)]
pub struct RuleStore {
    entries: IndexMap<String, RuleEntry>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the data for a view, replacing any previous entry
    pub fn set_view_data(
        &mut self,
        view_id: impl Into<String>,
        data: RuleMap,
        depends_on: Vec<String>,
        origin: impl Into<String>,
    ) {
        self.entries
            .insert(view_id.into(), RuleEntry::new(data, depends_on, origin));
    }

    /// Record a view as loaded with no rules
    ///
    /// Used when a view's data could not be parsed so that loading is not
    /// attempted again.
    pub fn mark_loaded(&mut self, view_id: &str) {
        if !self.is_loaded(view_id) {
            self.set_view_data(view_id, RuleMap::new(), Vec::new(), DYNAMIC_ORIGIN);
        }
    }

    pub fn is_loaded(&self, view_id: &str) -> bool {
        self.entries.contains_key(view_id)
    }

    pub fn get_view_data(&self, view_id: &str) -> Result<&RuleEntry> {
        self.entries
            .get(view_id)
            .ok_or_else(|| Error::NotFoundError(format!("view [{}] is not loaded", view_id)))
    }

    /// Transitive closure of a view's dependencies
    ///
    /// Depth-first in declaration order; each view appears once and the
    /// starting view is never included.
    pub fn get_view_dependencies(&self, view_id: &str) -> Result<Vec<String>> {
        let mut seen = IndexSet::new();
        seen.insert(view_id.to_string());
        self.collect_dependencies(view_id, &mut seen)?;
        Ok(seen.into_iter().skip(1).collect())
    }

    fn collect_dependencies(&self, view_id: &str, seen: &mut IndexSet<String>) -> Result<()> {
        let entry = self.get_view_data(view_id)?;
        for dep in &entry.depends_on {
            if seen.insert(dep.clone()) {
                self.collect_dependencies(dep, seen)?;
            }
        }
        Ok(())
    }

    /// Loaded view ids in load order
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
