//! Signing material resolution
//!
//! A [`SecretResolver`] is built for a single resolution run from the
//! secrets layers of that run and dropped afterwards; nothing is cached
//! across runs. Values are never logged, only key names.

use buildcfg_properties::PropertyValue;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;
use crate::resolver::precedence_order;
use crate::schema::RELEASE_SECRET_KEYS;
use crate::source::{LayerRole, PropertyLayer};

/// Text shown in place of secret values
pub const REDACTED: &str = "[REDACTED]";

const SIGNING_PREFIX: &str = "signing.";

/// A password or similar value.
///
/// `Debug` and `Display` print [`REDACTED`]. Serialization writes the real
/// value because the packaging backend needs it; use the emitter's redaction
/// option when output is meant for people.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Which key signs the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningKind {
    Debug,
    Release,
}

/// Reference to signing credentials. Never holds key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningMaterialRef {
    kind: SigningKind,
    key_alias: String,
    key_password: SecretString,
    store_file: PathBuf,
    store_password: SecretString,
}

impl SigningMaterialRef {
    /// Well-known Android debug keystore
    pub fn debug() -> Self {
        Self {
            kind: SigningKind::Debug,
            key_alias: "androiddebugkey".to_string(),
            key_password: SecretString::new("android"),
            store_file: PathBuf::from("~/.android/debug.keystore"),
            store_password: SecretString::new("android"),
        }
    }

    pub fn kind(&self) -> SigningKind {
        self.kind
    }

    pub fn key_alias(&self) -> &str {
        &self.key_alias
    }

    pub fn key_password(&self) -> &SecretString {
        &self.key_password
    }

    pub fn store_file(&self) -> &Path {
        &self.store_file
    }

    pub fn store_password(&self) -> &SecretString {
        &self.store_password
    }
}

/// Per-run resolver over the secrets layers
pub struct SecretResolver<'a> {
    layers: Vec<&'a PropertyLayer>,
}

impl<'a> SecretResolver<'a> {
    /// Build from the run's layers; non-secret layers are ignored
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a PropertyLayer>,
    {
        let secrets = layers
            .into_iter()
            .filter(|l| l.role() == LayerRole::Secrets);
        let mut layers = precedence_order(secrets);
        // highest precedence first for lookups
        layers.reverse();
        Self { layers }
    }

    /// Look up a secret in the highest-precedence layer defining it.
    ///
    /// Within a layer the bare name (`storePassword` for
    /// `signing.storePassword`) is accepted when the full key is absent, so
    /// stock `key.properties` files load unchanged.
    fn lookup(&self, key: &str) -> Option<(&'a PropertyLayer, &'a PropertyValue)> {
        let bare = key.strip_prefix(SIGNING_PREFIX);
        self.layers.iter().find_map(|&layer| {
            layer
                .get(key)
                .or_else(|| bare.and_then(|b| layer.get(b)))
                .map(|v| (layer, v))
        })
    }

    fn require(&self, key: &str) -> Result<(&'a PropertyLayer, String), ResolveError> {
        match self.lookup(key) {
            Some((layer, value)) if !value.is_blank() => Ok((layer, value.to_text())),
            _ => {
                tracing::debug!(key, "required secret absent");
                Err(ResolveError::MissingSecret {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Resolve release signing material.
    ///
    /// `required_keys` are checked in order and the first absent or blank
    /// one is reported. The reference itself is always built from the four
    /// `signing.*` keys. A relative store file is taken relative to the
    /// directory of the layer that supplied it.
    pub fn resolve(&self, required_keys: &[String]) -> Result<SigningMaterialRef, ResolveError> {
        for key in required_keys {
            self.require(key)?;
        }

        let [alias, key_password, store_file, store_password] = RELEASE_SECRET_KEYS;
        let (_, key_alias) = self.require(alias)?;
        let (_, key_password) = self.require(key_password)?;
        let (store_layer, store_file) = self.require(store_file)?;
        let (_, store_password) = self.require(store_password)?;

        let store_file = PathBuf::from(store_file);
        let store_file = match store_layer.path().and_then(Path::parent) {
            Some(dir) if store_file.is_relative() => dir.join(store_file),
            _ => store_file,
        };

        tracing::debug!(keys = ?required_keys, "resolved release signing material");

        Ok(SigningMaterialRef {
            kind: SigningKind::Release,
            key_alias,
            key_password: SecretString::new(key_password),
            store_file,
            store_password: SecretString::new(store_password),
        })
    }
}
