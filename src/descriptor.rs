//! Resolved build descriptor
//!
//! The final, validated parameter set handed to the packaging backend. It is
//! built once by the resolver and only read afterwards.

use buildcfg_properties::PropertyValue;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{ResolveError, Violation};
use crate::resolver::MergedConfig;
use crate::schema::{FieldType, Schema, FEATURE_PREFIX};
use crate::secrets::SigningMaterialRef;
use crate::source::LayerProvenance;
use crate::variant::Variant;

/// Keys mapped onto typed descriptor fields
const CORE_KEYS: &[&str] = &[
    "applicationId",
    "namespace",
    "versionCode",
    "versionName",
    "minPlatformVersion",
    "targetPlatformVersion",
    "compilePlatformVersion",
    "ndkVersion",
    "jvmTarget",
    "release.minifyEnabled",
    "release.shrinkResources",
    "release.proguardFiles",
];

/// Platform API levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformVersions {
    pub min: i64,
    pub target: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile: Option<i64>,
}

/// Code shrinking options for the build type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTypeOptions {
    pub minify_enabled: bool,
    pub shrink_resources: bool,
    pub proguard_files: Vec<String>,
}

impl BuildTypeOptions {
    /// Debug builds never shrink
    fn debug() -> Self {
        Self {
            minify_enabled: false,
            shrink_resources: false,
            proguard_files: Vec::new(),
        }
    }
}

/// Final build parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDescriptor {
    variant: Variant,
    schema_id: String,
    application_id: String,
    namespace: String,
    version_code: i64,
    version_name: String,
    platform: PlatformVersions,
    #[serde(skip_serializing_if = "Option::is_none")]
    ndk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jvm_target: Option<String>,
    build_type: BuildTypeOptions,
    signing: SigningMaterialRef,
    features: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extras: BTreeMap<String, PropertyValue>,
    sources: Vec<LayerProvenance>,
}

/// Reads typed values out of a validated config, collecting what is missing
struct Reader<'a> {
    merged: &'a MergedConfig,
    violations: Vec<Violation>,
}

impl<'a> Reader<'a> {
    fn text(&mut self, key: &str) -> String {
        match self.merged.get(key) {
            Some(v) => v.to_text(),
            None => {
                self.missing(key);
                String::new()
            }
        }
    }

    fn int(&mut self, key: &str) -> i64 {
        match self.merged.get(key).and_then(PropertyValue::as_i64) {
            Some(i) => i,
            None => {
                self.missing(key);
                0
            }
        }
    }

    fn opt_text(&self, key: &str) -> Option<String> {
        self.merged.get(key).map(PropertyValue::to_text)
    }

    fn opt_int(&self, key: &str) -> Option<i64> {
        self.merged.get(key).and_then(PropertyValue::as_i64)
    }

    fn flag(&self, key: &str) -> bool {
        self.merged
            .get(key)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    fn missing(&mut self, key: &str) {
        self.violations
            .push(Violation::new(key, "required by the build descriptor"));
    }
}

impl ResolvedDescriptor {
    /// Assemble a descriptor from a config that already passed `schema`.
    ///
    /// Schemas other than the built-in one may not declare every key the
    /// descriptor needs; those gaps are reported as violations.
    pub(crate) fn assemble(
        merged: &MergedConfig,
        schema: &Schema,
        variant: Variant,
        signing: SigningMaterialRef,
        sources: Vec<LayerProvenance>,
    ) -> Result<Self, ResolveError> {
        let mut r = Reader {
            merged,
            violations: Vec::new(),
        };

        let application_id = r.text("applicationId");
        let namespace = r
            .opt_text("namespace")
            .unwrap_or_else(|| application_id.clone());
        let version_code = r.int("versionCode");
        let version_name = r.text("versionName");
        let platform = PlatformVersions {
            min: r.int("minPlatformVersion"),
            target: r.int("targetPlatformVersion"),
            compile: r.opt_int("compilePlatformVersion"),
        };

        let build_type = match variant {
            Variant::Debug => BuildTypeOptions::debug(),
            Variant::Release => BuildTypeOptions {
                minify_enabled: r.flag("release.minifyEnabled"),
                shrink_resources: r.flag("release.shrinkResources"),
                proguard_files: r
                    .opt_text("release.proguardFiles")
                    .map(|s| split_list(&s))
                    .unwrap_or_default(),
            },
        };

        let features = merged
            .iter()
            .filter_map(|(key, entry)| {
                let name = key.strip_prefix(FEATURE_PREFIX)?;
                Some((name.to_string(), entry.value.as_bool()?))
            })
            .collect();

        let extras = schema
            .fields
            .iter()
            .filter(|f| !CORE_KEYS.contains(&f.key.as_str()))
            .filter_map(|f| merged.get(&f.key).map(|v| (f.key.clone(), typed(f.ty, v))))
            .collect();

        if !r.violations.is_empty() {
            return Err(ResolveError::Validation(r.violations));
        }

        Ok(Self {
            variant,
            schema_id: schema.qualified_id(),
            application_id,
            namespace,
            version_code,
            version_name,
            platform,
            ndk_version: r.opt_text("ndkVersion"),
            jvm_target: r.opt_text("jvmTarget"),
            build_type,
            signing,
            features,
            extras,
            sources,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn version_code(&self) -> i64 {
        self.version_code
    }

    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    pub fn platform(&self) -> &PlatformVersions {
        &self.platform
    }

    pub fn ndk_version(&self) -> Option<&str> {
        self.ndk_version.as_deref()
    }

    pub fn jvm_target(&self) -> Option<&str> {
        self.jvm_target.as_deref()
    }

    pub fn build_type(&self) -> &BuildTypeOptions {
        &self.build_type
    }

    pub fn signing(&self) -> &SigningMaterialRef {
        &self.signing
    }

    pub fn features(&self) -> &BTreeMap<String, bool> {
        &self.features
    }

    pub fn extras(&self) -> &BTreeMap<String, PropertyValue> {
        &self.extras
    }

    pub fn sources(&self) -> &[LayerProvenance] {
        &self.sources
    }
}

/// Value in its schema type; text stays as written
fn typed(ty: FieldType, value: &PropertyValue) -> PropertyValue {
    let converted = match ty {
        FieldType::Integer => value.as_i64().map(PropertyValue::Integer),
        FieldType::Boolean => value.as_bool().map(PropertyValue::Boolean),
        FieldType::String => None,
    };
    converted.unwrap_or_else(|| PropertyValue::String(value.to_text()))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
