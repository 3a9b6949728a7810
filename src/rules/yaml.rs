// src/rules/yaml.rs

//! YAML rule file parsing
//!
//! Converts YAML documents into plain [`RuleValue`] trees so no YAML
//! specific types reach the rule store.

use super::{RuleMap, RuleValue};
use crate::error::{Error, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse the text of a rule file
///
/// The document must be a mapping of dependency keys. An empty document
/// yields an empty map.
pub fn parse_rules(text: &str, origin: &str) -> Result<RuleMap> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| {
        Error::invalid_data(format!("Invalid YAML: {e}"), Some(origin))
    })?;

    match convert(value, origin)? {
        RuleValue::Null => Ok(RuleMap::new()),
        RuleValue::Map(map) => Ok(map),
        other => Err(Error::invalid_data(
            format!("rule file must be a mapping, found {}", other.kind()),
            Some(origin),
        )),
    }
}

/// Read and parse a rule file from disk
pub fn load_rule_file(path: impl AsRef<Path>) -> Result<RuleMap> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    debug!("Loading rule file {}", origin);
    let text = fs::read_to_string(path)?;
    parse_rules(&text, &origin)
}

fn convert(value: Value, origin: &str) -> Result<RuleValue> {
    Ok(match value {
        Value::Null => RuleValue::Null,
        Value::Bool(b) => RuleValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RuleValue::Int(i),
            None => RuleValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => RuleValue::Str(s),
        Value::Sequence(items) => RuleValue::List(
            items
                .into_iter()
                .map(|item| convert(item, origin))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Mapping(mapping) => {
            let mut map = RuleMap::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(convert_key(key, origin)?, convert(value, origin)?);
            }
            RuleValue::Map(map)
        }
        Value::Tagged(tagged) => convert(tagged.value, origin)?,
    })
}

// OS versions such as `10.04` arrive as numbers
fn convert_key(key: Value, origin: &str) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Tagged(tagged) => convert_key(tagged.value, origin),
        other => Err(Error::invalid_data(
            format!("mapping keys must be scalars, found {other:?}"),
            Some(origin),
        )),
    }
}
