//! Descriptor emission
//!
//! Serializes a [`ResolvedDescriptor`] into the envelope the packaging
//! backend reads. Output depends only on the descriptor: there are no
//! timestamps and every map is sorted, so identical inputs give identical
//! bytes.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::descriptor::ResolvedDescriptor;
use crate::error::ResolveError;
use crate::secrets::REDACTED;

/// Schema version for the descriptor envelope
pub const DESCRIPTOR_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the descriptor envelope
pub const DESCRIPTOR_SCHEMA_ID: &str = "buildcfg/descriptor@1";

/// Key fragments treated as secret when redacting
const SECRET_KEYS: &[&str] = &["password", "secret", "token"];

/// Output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitFormat {
    /// RFC 8785 canonical JSON
    #[default]
    Canonical,
    /// Indented JSON for people
    Pretty,
}

/// Serializes descriptors
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    format: EmitFormat,
    redact_secrets: bool,
}

impl Emitter {
    pub fn new(format: EmitFormat) -> Self {
        Self {
            format,
            redact_secrets: false,
        }
    }

    /// Replace secret values with `[REDACTED]` and list their paths
    pub fn redact_secrets(mut self, redact: bool) -> Self {
        self.redact_secrets = redact;
        self
    }

    /// Serialize a descriptor
    pub fn emit(&self, descriptor: &ResolvedDescriptor) -> Result<Vec<u8>, ResolveError> {
        let mut body = serde_json::to_value(descriptor)?;

        let mut envelope = serde_json::Map::new();
        envelope.insert("schema_version".into(), DESCRIPTOR_SCHEMA_VERSION.into());
        envelope.insert("schema_id".into(), DESCRIPTOR_SCHEMA_ID.into());

        if self.redact_secrets {
            let mut redactions = Vec::new();
            redact_recursive(&mut body, String::new(), &mut redactions);
            envelope.insert("redactions".into(), redactions.into());
        }
        envelope.insert("descriptor".into(), body);

        let envelope = Value::Object(envelope);
        match self.format {
            EmitFormat::Canonical => serde_json_canonicalizer::to_vec(&envelope)
                .map_err(|e| ResolveError::Canonical(e.to_string())),
            EmitFormat::Pretty => {
                let mut bytes = serde_json::to_vec_pretty(&envelope)?;
                bytes.push(b'\n');
                Ok(bytes)
            }
        }
    }
}

/// SHA-256 hex digest of emitted bytes
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String(REDACTED.to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}
