// src/lookup/definition.rs

//! Single dependency definitions and REP 111 platform resolution

use crate::error::{Error, Result};
use crate::rules::{RuleMap, RuleValue};

/// One dependency key's raw rule plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub key: String,
    pub data: RuleValue,
    pub origin: String,
}

/// The installer and install spec selected for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRule {
    pub installer_key: String,
    pub install_spec: RuleValue,
}

impl Definition {
    pub fn new(key: impl Into<String>, data: RuleValue, origin: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data,
            origin: origin.into(),
        }
    }

    /// Select the installer and install spec for an OS name and version
    ///
    /// Follows the REP 111 precedence rules: below the OS name, a key is
    /// first interpreted as an installer key (in the order of
    /// `installer_keys`) and only then as an OS version. Below an OS
    /// version, installer keys are matched once more. When no installer
    /// key matches, `default_installer` owns the result.
    ///
    /// # Errors
    ///
    /// - `ResolutionError` if there is no rule for the OS or version, or no
    ///   installer could be determined
    /// - `InvalidDataError` if the rule has the wrong shape
    pub fn rule_for_platform(
        &self,
        os_name: &str,
        os_version: &str,
        installer_keys: &[String],
        default_installer: Option<&str>,
    ) -> Result<PlatformRule> {
        let key = self.key.as_str();
        let data = self.data.as_map().ok_or_else(|| {
            Error::invalid_data(
                format!("rule for [{}] must be a mapping, found {}", key, self.data.kind()),
                Some(&self.origin),
            )
        })?;

        let os_data = data.get(os_name).ok_or_else(|| {
            Error::resolution(
                key,
                Some(&self.data),
                os_name,
                os_version,
                format!("No definition of [{}] for OS [{}]", key, os_name),
            )
        })?;

        let mut installer_key = default_installer.map(str::to_string);
        let install_spec = match os_data {
            RuleValue::Map(os_map) => match match_installer(os_map, installer_keys) {
                Some((found, spec)) => {
                    installer_key = Some(found.to_string());
                    spec
                }
                None => {
                    // No installer key at this level, so it must be an OS version
                    let version_data = os_map.get(os_version).ok_or_else(|| {
                        Error::resolution(
                            key,
                            Some(&self.data),
                            os_name,
                            os_version,
                            format!("No definition for OS version [{}]", os_version),
                        )
                    })?;
                    match version_data {
                        RuleValue::Map(version_map) => {
                            match match_installer(version_map, installer_keys) {
                                Some((found, spec)) => {
                                    installer_key = Some(found.to_string());
                                    spec
                                }
                                None => version_data,
                            }
                        }
                        _ => version_data,
                    }
                }
            },
            other => other,
        };

        if !matches!(
            install_spec,
            RuleValue::Map(_) | RuleValue::List(_) | RuleValue::Str(_)
        ) {
            return Err(Error::invalid_data(
                format!(
                    "OS definition for [{}:{}] must be a mapping, string, or list, found {}",
                    key,
                    os_name,
                    install_spec.kind()
                ),
                Some(&self.origin),
            ));
        }

        let installer_key = installer_key.ok_or_else(|| {
            Error::resolution(
                key,
                Some(&self.data),
                os_name,
                os_version,
                format!("No installer named for [{}] and OS [{}] has no default installer", key, os_name),
            )
        })?;

        Ok(PlatformRule {
            installer_key,
            install_spec: install_spec.clone(),
        })
    }
}

fn match_installer<'a>(map: &'a RuleMap, installer_keys: &'a [String]) -> Option<(&'a str, &'a RuleValue)> {
    installer_keys
        .iter()
        .find_map(|k| map.get(k).map(|spec| (k.as_str(), spec)))
}
