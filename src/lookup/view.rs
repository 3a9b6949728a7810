// src/lookup/view.rs

//! Merged views over the rule store
//!
//! A view flattens the rule entries of one view and everything it
//! depends on into a single key -> [`Definition`] map that can be queried
//! during resolution.

use super::Definition;
use crate::error::{Error, Result, RuleConflict};
use crate::rules::RuleEntry;
use indexmap::IndexMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: String,
    definitions: IndexMap<String, Definition>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: IndexMap::new(),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<&Definition> {
        self.definitions.get(key).ok_or_else(|| {
            Error::NotFoundError(format!("key [{}] is not defined in view [{}]", key, self.name))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Merge a rule entry into this view
    ///
    /// New keys are inserted. A key that is already present must carry
    /// identical data unless `override_existing` is set, in which case the
    /// incoming definition replaces it.
    ///
    /// # Errors
    ///
    /// `ConflictError` when an existing key has different data and
    /// `override_existing` is false. The view is left unchanged.
    pub fn merge(&mut self, entry: &RuleEntry, override_existing: bool) -> Result<()> {
        if !override_existing {
            // Check everything first so a conflict leaves the view untouched
            for (key, data) in &entry.data {
                if let Some(existing) = self.definitions.get(key) {
                    if existing.data != *data {
                        return Err(Error::ConflictError(Box::new(RuleConflict {
                            key: key.clone(),
                            existing: existing.clone(),
                            incoming: Definition::new(key.clone(), data.clone(), entry.origin.clone()),
                        })));
                    }
                }
            }
        }

        for (key, data) in &entry.data {
            if override_existing || !self.definitions.contains_key(key) {
                self.definitions.insert(
                    key.clone(),
                    Definition::new(key.clone(), data.clone(), entry.origin.clone()),
                );
            }
        }

        debug!(
            "Merged {} rules from [{}] into view [{}] (override: {})",
            entry.data.len(),
            entry.origin,
            self.name,
            override_existing
        );
        Ok(())
    }
}
