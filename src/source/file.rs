//! Property file source

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::PathBuf;

use super::{LayerOrigin, LayerRole, PropertyLayer, PropertySource};
use crate::error::ResolveError;

/// Layer read from a property file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    rank: u32,
    optional: bool,
    role: LayerRole,
}

impl FileSource {
    /// Required config file at the given rank
    pub fn new(path: impl Into<PathBuf>, rank: u32) -> Self {
        Self {
            path: path.into(),
            rank,
            optional: false,
            role: LayerRole::Config,
        }
    }

    /// Treat a missing file as an empty layer
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn role(mut self, role: LayerRole) -> Self {
        self.role = role;
        self
    }

    fn empty_layer(&self) -> PropertyLayer {
        PropertyLayer::new(
            self.name(),
            self.rank,
            self.role,
            LayerOrigin::File,
            Default::default(),
        )
        .with_path(self.path.clone())
    }
}

impl PropertySource for FileSource {
    fn load(&self) -> Result<PropertyLayer, ResolveError> {
        let location = self.name();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.optional => {
                tracing::debug!(layer = %location, "optional layer absent, using empty layer");
                return Ok(self.empty_layer());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::SourceUnavailable { locator: location });
            }
            Err(e) => return Err(ResolveError::Io(e)),
        };

        let digest = (self.role == LayerRole::Config).then(|| {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        });

        let contents = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            ResolveError::Parse {
                location: location.clone(),
                line: valid.iter().filter(|b| **b == b'\n').count() + 1,
                message: "invalid UTF-8".to_string(),
            }
        })?;

        let props = buildcfg_properties::parse(&contents).map_err(|e| ResolveError::Parse {
            location: location.clone(),
            line: e.line,
            message: e.message,
        })?;

        for dup in props.duplicates() {
            tracing::warn!(
                layer = %location,
                key = %dup.key,
                first_line = dup.first_line,
                line = dup.line,
                "key declared more than once, last declaration wins"
            );
        }

        tracing::debug!(layer = %location, keys = props.len(), digest = ?digest, "loaded layer");

        let layer = PropertyLayer::new(
            location,
            self.rank,
            self.role,
            LayerOrigin::File,
            props.into_values(),
        )
        .with_path(self.path.clone());

        Ok(match digest {
            Some(digest) => layer.with_digest(digest),
            None => layer,
        })
    }

    fn name(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildcfg_properties::PropertyValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "# defaults").unwrap();
        writeln!(temp, "applicationId=com.example.app").unwrap();
        writeln!(temp, "versionCode=1").unwrap();

        let layer = FileSource::new(temp.path(), 1).load().unwrap();

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.rank(), 1);
        assert_eq!(layer.origin(), LayerOrigin::File);
        assert_eq!(layer.get("versionCode"), Some(&PropertyValue::from("1")));
        assert_eq!(layer.digest().map(str::len), Some(64));
        assert_eq!(layer.path(), Some(temp.path()));
    }

    #[test]
    fn test_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.properties");

        let err = FileSource::new(&path, 1).load().unwrap_err();
        assert!(matches!(err, ResolveError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("absent.properties"));
    }

    #[test]
    fn test_missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.properties");

        let layer = FileSource::new(&path, 0)
            .optional(true)
            .role(LayerRole::Secrets)
            .load()
            .unwrap();

        assert!(layer.is_empty());
        assert_eq!(layer.role(), LayerRole::Secrets);
        assert!(layer.digest().is_none());
    }

    #[test]
    fn test_malformed_file_reports_line() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "applicationId=com.example.app").unwrap();
        writeln!(temp, "this line is broken").unwrap();

        let err = FileSource::new(temp.path(), 1).load().unwrap_err();
        match err {
            ResolveError::Parse { location, line, .. } => {
                assert_eq!(line, 2);
                assert_eq!(location, temp.path().to_string_lossy());
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_optional_file_still_fails() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "=oops").unwrap();

        let err = FileSource::new(temp.path(), 1).optional(true).load().unwrap_err();
        assert!(matches!(err, ResolveError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"a=1\nb=\xff\xfe\n").unwrap();

        let err = FileSource::new(temp.path(), 1).load().unwrap_err();
        assert!(matches!(err, ResolveError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_digest_is_stable() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "versionName=1.0").unwrap();

        let a = FileSource::new(temp.path(), 1).load().unwrap();
        let b = FileSource::new(temp.path(), 1).load().unwrap();
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_secrets_file_is_not_fingerprinted() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "keyPassword=000123").unwrap();
        writeln!(temp, "storePassword=True").unwrap();

        let layer = FileSource::new(temp.path(), 0)
            .role(LayerRole::Secrets)
            .load()
            .unwrap();

        assert!(layer.digest().is_none());
        assert_eq!(layer.get("keyPassword"), Some(&PropertyValue::from("000123")));
        assert_eq!(layer.get("storePassword"), Some(&PropertyValue::from("True")));
    }
}
