//! Environment snapshot source
//!
//! Variables are filtered by prefix. The prefix is stripped and `__` maps
//! to `.`, so `BUILDCFG_release__minifyEnabled` becomes
//! `release.minifyEnabled`. Values are taken verbatim.
//!
//! Signing keys only count in a secrets-role snapshot, for example
//! `SIGNING_signing__keyAlias` under `--secrets-env-prefix SIGNING_`. In the
//! config-role snapshot they are a validation error.

use buildcfg_properties::PropertyValue;
use std::collections::BTreeMap;

use super::{LayerOrigin, LayerRole, PropertyLayer, PropertySource};
use crate::error::ResolveError;

/// Default variable prefix
pub const DEFAULT_ENV_PREFIX: &str = "BUILDCFG_";

/// Layer built from a snapshot of environment variables
#[derive(Clone)]
pub struct EnvSource {
    prefix: String,
    rank: u32,
    role: LayerRole,
    vars: Vec<(String, String)>,
}

impl EnvSource {
    /// Snapshot the current process environment
    pub fn from_process(prefix: impl Into<String>, rank: u32) -> Self {
        Self::from_vars(prefix, rank, std::env::vars())
    }

    /// Build from an explicit snapshot
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, rank: u32, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            rank,
            role: LayerRole::Config,
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn role(mut self, role: LayerRole) -> Self {
        self.role = role;
        self
    }
}

impl PropertySource for EnvSource {
    fn load(&self) -> Result<PropertyLayer, ResolveError> {
        let mut values = BTreeMap::new();

        for (name, value) in &self.vars {
            let Some(stripped) = name.strip_prefix(&self.prefix) else {
                continue;
            };
            if stripped.is_empty() {
                continue;
            }
            let key = stripped.replace("__", ".");
            values.insert(key, PropertyValue::String(value.clone()));
        }

        tracing::debug!(layer = %self.name(), keys = values.len(), "captured environment layer");

        Ok(PropertyLayer::new(
            self.name(),
            self.rank,
            self.role,
            LayerOrigin::Environment,
            values,
        ))
    }

    fn name(&self) -> String {
        format!("env:{}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_filter_and_key_mapping() {
        let source = EnvSource::from_vars(
            DEFAULT_ENV_PREFIX,
            9,
            [
                ("BUILDCFG_versionCode", "42"),
                ("BUILDCFG_versionName", " 007 "),
                ("BUILDCFG_release__minifyEnabled", "true"),
                ("PATH", "/usr/bin"),
                ("BUILDCFG_", "ignored"),
            ],
        );

        let layer = source.load().unwrap();

        assert_eq!(layer.len(), 3);
        assert_eq!(layer.name(), "env:BUILDCFG_");
        assert_eq!(layer.rank(), 9);
        assert_eq!(layer.origin(), LayerOrigin::Environment);
        assert_eq!(layer.get("versionCode"), Some(&PropertyValue::from("42")));
        assert_eq!(layer.get("versionName"), Some(&PropertyValue::from(" 007 ")));
        assert_eq!(
            layer.get("release.minifyEnabled").and_then(PropertyValue::as_bool),
            Some(true)
        );
    }

    #[test]
    fn test_secrets_role() {
        let layer = EnvSource::from_vars("SIGNING_", 1, [("SIGNING_signing__keyAlias", "upload")])
            .role(LayerRole::Secrets)
            .load()
            .unwrap();

        assert_eq!(layer.role(), LayerRole::Secrets);
        assert_eq!(layer.get("signing.keyAlias"), Some(&PropertyValue::from("upload")));
    }
}
