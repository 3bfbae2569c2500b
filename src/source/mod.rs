//! Property sources
//!
//! A [`PropertySource`] yields one immutable [`PropertyLayer`]. Three kinds
//! exist:
//! 1. Literal layers (built-in defaults, test fixtures)
//! 2. Property files, required or optional
//! 3. Environment snapshots filtered by prefix
//!
//! Layers carry a precedence rank and a role. `Config` layers are merged and
//! validated; `Secrets` layers are only ever read by the secret resolver.

mod defaults;
mod env;
mod file;

pub use defaults::{BuiltinDefaults, BUILTIN_RANK};
pub use env::{EnvSource, DEFAULT_ENV_PREFIX};
pub use file::FileSource;

use buildcfg_properties::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// What a layer is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Config,
    Secrets,
}

/// Where a layer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    Builtin,
    File,
    Environment,
    Literal,
}

/// One loaded layer of configuration.
///
/// Immutable once built. `Debug` never prints values of secrets layers.
#[derive(Clone)]
pub struct PropertyLayer {
    name: String,
    rank: u32,
    role: LayerRole,
    origin: LayerOrigin,
    path: Option<PathBuf>,
    digest: Option<String>,
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyLayer {
    pub fn new(
        name: impl Into<String>,
        rank: u32,
        role: LayerRole,
        origin: LayerOrigin,
        values: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            name: name.into(),
            rank,
            role,
            origin,
            path: None,
            digest: None,
            values,
        }
    }

    /// Literal config layer built from key/value pairs
    pub fn literal<K, V, I>(name: impl Into<String>, rank: u32, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(name, rank, LayerRole::Config, LayerOrigin::Literal, values)
    }

    /// Same layer with a different role
    pub fn with_role(mut self, role: LayerRole) -> Self {
        self.role = role;
        self
    }

    /// Record the file the layer was read from
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Record the SHA-256 digest of the raw bytes
    pub fn with_digest(mut self, digest: String) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn origin(&self) -> LayerOrigin {
        self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Provenance record for the emitted descriptor.
    ///
    /// Secrets layers never carry a digest.
    pub fn provenance(&self) -> LayerProvenance {
        LayerProvenance {
            name: self.name.clone(),
            rank: self.rank,
            role: self.role,
            origin: self.origin,
            path: self.path.as_ref().map(|p| p.to_string_lossy().to_string()),
            digest: match self.role {
                LayerRole::Config => self.digest.clone(),
                LayerRole::Secrets => None,
            },
            keys: self.values.len(),
        }
    }
}

impl fmt::Debug for PropertyLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PropertyLayer");
        s.field("name", &self.name)
            .field("rank", &self.rank)
            .field("role", &self.role)
            .field("origin", &self.origin)
            .field("path", &self.path)
            .field("digest", &self.digest);
        match self.role {
            LayerRole::Config => s.field("values", &self.values),
            LayerRole::Secrets => s.field("keys", &self.values.keys().collect::<Vec<_>>()),
        };
        s.finish()
    }
}

/// A contributing layer as recorded in the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerProvenance {
    pub name: String,
    pub rank: u32,
    pub role: LayerRole,
    pub origin: LayerOrigin,

    /// File path (None for builtin/env/literal layers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None when not read from a file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Number of keys the layer defined
    pub keys: usize,
}

/// Anything that can produce a layer
pub trait PropertySource {
    /// Load the layer
    fn load(&self) -> Result<PropertyLayer, ResolveError>;

    /// Human-readable name, used for logging and provenance
    fn name(&self) -> String;
}

/// Description of where a layer lives
#[derive(Debug, Clone)]
pub enum Locator {
    /// Property file on disk
    File {
        path: PathBuf,
        optional: bool,
        role: LayerRole,
        rank: u32,
    },
    /// Snapshot of the process environment filtered by prefix
    Environment {
        prefix: String,
        role: LayerRole,
        rank: u32,
    },
    /// Already-materialized layer
    Layer(PropertyLayer),
}

impl Locator {
    /// Required config file
    pub fn file(path: impl Into<PathBuf>, rank: u32) -> Self {
        Locator::File {
            path: path.into(),
            optional: false,
            role: LayerRole::Config,
            rank,
        }
    }

    /// Optional config file; absent means empty
    pub fn optional_file(path: impl Into<PathBuf>, rank: u32) -> Self {
        Locator::File {
            path: path.into(),
            optional: true,
            role: LayerRole::Config,
            rank,
        }
    }

    /// Optional secrets file; absent means empty
    pub fn secrets_file(path: impl Into<PathBuf>, rank: u32) -> Self {
        Locator::File {
            path: path.into(),
            optional: true,
            role: LayerRole::Secrets,
            rank,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::File { path, .. } => write!(f, "{}", path.display()),
            Locator::Environment { prefix, .. } => write!(f, "env:{}", prefix),
            Locator::Layer(layer) => write!(f, "{}", layer.name()),
        }
    }
}

/// Load a single layer from its locator
pub fn load(locator: &Locator) -> Result<PropertyLayer, ResolveError> {
    match locator {
        Locator::File {
            path,
            optional,
            role,
            rank,
        } => FileSource::new(path.clone(), *rank)
            .optional(*optional)
            .role(*role)
            .load(),
        Locator::Environment { prefix, role, rank } => EnvSource::from_process(prefix, *rank)
            .role(*role)
            .load(),
        Locator::Layer(layer) => Ok(layer.clone()),
    }
}
