// src/graph.rs

//! Dependency graph of resolved keys and install ordering
//!
//! Nodes are keyed by dependency key and keep their insertion order. That
//! order is part of the contract: roots are traversed in insertion order,
//! so when two roots share a dependency the first root places it.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

/// A resolved key in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub installer_key: String,
    pub install_items: Vec<String>,
    /// Keys of other nodes this node needs installed first
    pub dependencies: Vec<String>,
    /// False once [`DependencyGraph::validate`] found a node depending on this one
    pub is_root: bool,
}

impl GraphNode {
    pub fn new(installer_key: impl Into<String>, install_items: Vec<String>) -> Self {
        Self {
            installer_key: installer_key.into(),
            install_items,
            dependencies: Vec::new(),
            is_root: true,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// One entry of the install order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallUnit {
    pub installer_key: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<String, GraphNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node with the same key in place
    pub fn add_node(&mut self, key: impl Into<String>, node: GraphNode) {
        self.nodes.insert(key.into(), node);
    }

    pub fn get_node(&self, key: &str) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check the graph structure and compute roots
    ///
    /// Every dependency must name a node in the graph; named nodes are
    /// marked non-root. Then each node is walked depth first looking for a
    /// key that repeats on the current path.
    ///
    /// # Errors
    ///
    /// `MissingKeyError` naming the dangling dependency, or `CycleError`
    /// naming the key that closes a cycle.
    pub fn validate(&mut self) -> Result<()> {
        let mut dependents = HashSet::new();
        for node in self.nodes.values() {
            for dep in &node.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(Error::MissingKeyError(dep.clone()));
                }
                dependents.insert(dep.clone());
            }
        }
        for (key, node) in self.nodes.iter_mut() {
            node.is_root = !dependents.contains(key);
        }

        // Nodes whose whole subtree is known to be acyclic
        let mut acyclic = HashSet::new();
        for key in self.nodes.keys() {
            let mut path = Vec::new();
            self.detect_cycles(key, &mut path, &mut acyclic)?;
        }
        Ok(())
    }

    fn detect_cycles<'a>(
        &'a self,
        key: &'a str,
        path: &mut Vec<&'a str>,
        acyclic: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if path.contains(&key) {
            return Err(Error::CycleError(key.to_string()));
        }
        if acyclic.contains(key) {
            return Ok(());
        }

        path.push(key);
        if let Some(node) = self.nodes.get(key) {
            for dep in &node.dependencies {
                self.detect_cycles(dep, path, acyclic)?;
            }
        }
        path.pop();
        acyclic.insert(key);
        Ok(())
    }

    /// Install order with dependencies before dependents
    ///
    /// Validates first. Each root is expanded in post order; a unit that
    /// already appeared earlier in the list is dropped.
    pub fn ordered_install_list(&mut self) -> Result<Vec<InstallUnit>> {
        self.validate()?;

        let mut ordered = Vec::new();
        for (key, node) in &self.nodes {
            if node.is_root {
                self.collect_post_order(key, &mut ordered);
            }
        }

        let mut seen = HashSet::new();
        ordered.retain(|unit| seen.insert(unit.clone()));
        Ok(ordered)
    }

    fn collect_post_order(&self, key: &str, ordered: &mut Vec<InstallUnit>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        for dep in &node.dependencies {
            self.collect_post_order(dep, ordered);
        }
        ordered.push(InstallUnit {
            installer_key: node.installer_key.clone(),
            items: node.install_items.clone(),
        });
    }
}
