// src/rules/mod.rs

//! Raw dependency rules and the store that holds them
//!
//! Rule files map a dependency key to a nested value in the REP 111
//! format:
//!
//! ```yaml
//! boost:
//!   ubuntu:
//!     apt:
//!       packages: [libboost-all-dev]
//!     lucid:
//!       apt:
//!         packages: [libboost1.40-all-dev]
//!   osx:
//!     homebrew: boost
//! ```
//!
//! The values are kept as a [`RuleValue`] tree; interpreting them is the
//! job of [`crate::lookup::Definition`].

pub mod store;
pub mod yaml;

pub use store::{RuleEntry, RuleStore};
pub use yaml::{load_rule_file, parse_rules};

use indexmap::IndexMap;
use serde::Serialize;

/// Rule data for one view: dependency key -> raw rule
pub type RuleMap = IndexMap<String, RuleValue>;

/// A raw rule value as parsed from a rule file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RuleValue>),
    Map(RuleMap),
}

impl RuleValue {
    /// Build a map value from `(key, value)` pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RuleValue)>,
    {
        RuleValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list of strings
    pub fn strings<S, I>(items: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        RuleValue::List(items.into_iter().map(|s| RuleValue::Str(s.into())).collect())
    }

    pub fn as_map(&self) -> Option<&RuleMap> {
        match self {
            RuleValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RuleValue]> {
        match self {
            RuleValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            RuleValue::Null => "null",
            RuleValue::Bool(_) => "bool",
            RuleValue::Int(_) => "integer",
            RuleValue::Float(_) => "float",
            RuleValue::Str(_) => "string",
            RuleValue::List(_) => "list",
            RuleValue::Map(_) => "mapping",
        }
    }

    /// Render as block-style YAML for error messages
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Str(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Str(value)
    }
}
