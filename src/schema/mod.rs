//! Configuration schema
//!
//! A schema is an immutable value: field rules, cross-field predicates and
//! the secret keys release signing needs. The built-in table describes an
//! Android application; other schemas can be loaded from TOML.

mod validate;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::ResolveError;
use crate::variant::Variant;

/// Prefix of free-form boolean feature flags
pub const FEATURE_PREFIX: &str = "feature.";

/// Secret keys required to sign a release build
pub const RELEASE_SECRET_KEYS: [&str; 4] = [
    "signing.keyAlias",
    "signing.keyPassword",
    "signing.storeFile",
    "signing.storePassword",
];

const PACKAGE_NAME_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)+$";

const NDK_VERSION_PATTERN: &str = r"^\d+(\.\d+)*$";

/// Compile one of the constant patterns above
fn builtin_pattern(pattern: &'static str) -> Constraint {
    Constraint::Pattern(Pattern::new(pattern).expect("built-in pattern compiles"))
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
        }
    }
}

/// Regular expression compiled once, when the schema is built or parsed.
///
/// Serialized as its source text; two patterns are equal when their source
/// text is.
#[derive(Debug, Clone)]
pub struct Pattern(regex_lite::Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex_lite::Error> {
        regex_lite::Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(|e| {
            serde::de::Error::custom(format!("bad pattern `{}`: {}", source, e))
        })
    }
}

/// Extra constraint on a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive integer range
    Range { min: i64, max: i64 },
    /// Regular expression the text form must match
    Pattern(Pattern),
    /// Allowed text values
    OneOf(Vec<String>),
    /// Text must not be blank
    NonEmpty,
}

/// Rule for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub key: String,

    #[serde(rename = "type")]
    pub ty: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Required only for this variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_for: Option<Variant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl FieldRule {
    pub fn new(key: &str, ty: FieldType) -> Self {
        Self {
            key: key.to_string(),
            ty,
            required: false,
            required_for: None,
            constraint: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn required_for(mut self, variant: Variant) -> Self {
        self.required_for = Some(variant);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn is_required(&self, variant: Variant) -> bool {
        self.required || self.required_for == Some(variant)
    }
}

/// Predicate over several fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrossFieldRule {
    /// Integer `lower` must not exceed integer `upper`
    LessOrEqual { lower: String, upper: String },
    /// When boolean `key` is true, boolean `requires` must be true too
    Requires { key: String, requires: String },
}

impl CrossFieldRule {
    /// Keys the predicate reads
    pub fn keys(&self) -> [&str; 2] {
        match self {
            CrossFieldRule::LessOrEqual { lower, upper } => [lower.as_str(), upper.as_str()],
            CrossFieldRule::Requires { key, requires } => [key.as_str(), requires.as_str()],
        }
    }
}

/// A versioned schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub version: u32,

    #[serde(default)]
    pub secret_keys: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldRule>,

    #[serde(default)]
    pub predicates: Vec<CrossFieldRule>,
}

impl Schema {
    /// Built-in Android application schema
    pub fn builtin() -> Self {
        use Constraint::*;

        let platform = || Range { min: 1, max: 100 };

        Self {
            id: "buildcfg/android-app".to_string(),
            version: 1,
            secret_keys: RELEASE_SECRET_KEYS.iter().map(|k| k.to_string()).collect(),
            fields: vec![
                FieldRule::new("applicationId", FieldType::String)
                    .required()
                    .constraint(builtin_pattern(PACKAGE_NAME_PATTERN)),
                FieldRule::new("namespace", FieldType::String)
                    .constraint(builtin_pattern(PACKAGE_NAME_PATTERN)),
                FieldRule::new("versionCode", FieldType::Integer)
                    .required()
                    .constraint(Range { min: 1, max: 2_100_000_000 }),
                FieldRule::new("versionName", FieldType::String).required().constraint(NonEmpty),
                FieldRule::new("minPlatformVersion", FieldType::Integer)
                    .required()
                    .constraint(platform()),
                FieldRule::new("targetPlatformVersion", FieldType::Integer)
                    .required()
                    .constraint(platform()),
                FieldRule::new("compilePlatformVersion", FieldType::Integer).constraint(platform()),
                FieldRule::new("ndkVersion", FieldType::String)
                    .constraint(builtin_pattern(NDK_VERSION_PATTERN)),
                FieldRule::new("jvmTarget", FieldType::String).constraint(OneOf(vec![
                    "1.8".to_string(),
                    "11".to_string(),
                    "17".to_string(),
                    "21".to_string(),
                ])),
                FieldRule::new("release.minifyEnabled", FieldType::Boolean),
                FieldRule::new("release.shrinkResources", FieldType::Boolean),
                FieldRule::new("release.proguardFiles", FieldType::String),
            ],
            predicates: vec![
                CrossFieldRule::LessOrEqual {
                    lower: "minPlatformVersion".to_string(),
                    upper: "targetPlatformVersion".to_string(),
                },
                CrossFieldRule::LessOrEqual {
                    lower: "targetPlatformVersion".to_string(),
                    upper: "compilePlatformVersion".to_string(),
                },
                CrossFieldRule::Requires {
                    key: "release.shrinkResources".to_string(),
                    requires: "release.minifyEnabled".to_string(),
                },
            ],
        }
    }

    /// `id@version`
    pub fn qualified_id(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    pub fn field(&self, key: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn is_secret_key(&self, key: &str) -> bool {
        self.secret_keys.iter().any(|k| k == key)
    }

    /// Whether the key is declared (fields, secrets or feature flags)
    pub fn is_known_key(&self, key: &str) -> bool {
        key.starts_with(FEATURE_PREFIX) || self.is_secret_key(key) || self.field(key).is_some()
    }

    /// Load a schema from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ResolveError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ResolveError::Schema(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and check a TOML schema
    pub fn from_toml_str(contents: &str) -> Result<Self, ResolveError> {
        let schema: Schema = toml::from_str(contents)
            .map_err(|e| ResolveError::Schema(format!("TOML parse error: {}", e)))?;
        schema.check()?;
        Ok(schema)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ResolveError> {
        toml::to_string_pretty(self)
            .map_err(|e| ResolveError::Schema(format!("TOML serialization error: {}", e)))
    }

    /// Structural checks: unique keys, sane ranges, predicates over declared
    /// fields of the right type. Patterns are compiled while parsing.
    pub fn check(&self) -> Result<(), ResolveError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(ResolveError::Schema(format!("duplicate field `{}`", field.key)));
            }
            if self.is_secret_key(&field.key) {
                return Err(ResolveError::Schema(format!(
                    "`{}` is declared both as a field and as a secret",
                    field.key
                )));
            }
            if let Some(Constraint::Range { min, max }) = &field.constraint {
                if min > max {
                    return Err(ResolveError::Schema(format!(
                        "empty range for `{}`: {} > {}",
                        field.key, min, max
                    )));
                }
            }
        }

        for predicate in &self.predicates {
            let expected = match predicate {
                CrossFieldRule::LessOrEqual { .. } => FieldType::Integer,
                CrossFieldRule::Requires { .. } => FieldType::Boolean,
            };
            for key in predicate.keys() {
                match self.field(key) {
                    None => {
                        return Err(ResolveError::Schema(format!(
                            "predicate references undeclared field `{}`",
                            key
                        )))
                    }
                    Some(f) if f.ty != expected => {
                        return Err(ResolveError::Schema(format!(
                            "predicate needs `{}` to be {}, found {}",
                            key,
                            expected.as_str(),
                            f.ty.as_str()
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_consistent() {
        let schema = Schema::builtin();
        schema.check().unwrap();
        assert_eq!(schema.qualified_id(), "buildcfg/android-app@1");
        assert_eq!(schema.secret_keys.len(), 4);
    }

    #[test]
    fn test_builtin_toml_round_trip() {
        let schema = Schema::builtin();
        let text = schema.to_toml().unwrap();
        let parsed = Schema::from_toml_str(&text).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
id = "acme/app"
version = 2
secret_keys = ["signing.keyAlias"]

[[fields]]
key = "applicationId"
type = "string"
required = true
constraint = { pattern = "^com\\.acme\\." }

[[fields]]
key = "versionCode"
type = "integer"
required = true
constraint = { range = { min = 1, max = 10 } }

[[fields]]
key = "channel"
type = "string"
required_for = "release"
constraint = { one_of = ["beta", "stable"] }

[[fields]]
key = "versionName"
type = "string"
constraint = "non_empty"
"#;
        let schema = Schema::from_toml_str(text).unwrap();

        assert_eq!(schema.qualified_id(), "acme/app@2");
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(
            schema.field("versionCode").unwrap().constraint,
            Some(Constraint::Range { min: 1, max: 10 })
        );
        assert!(schema.field("channel").unwrap().is_required(Variant::Release));
        assert!(!schema.field("channel").unwrap().is_required(Variant::Debug));
        assert_eq!(
            schema.field("versionName").unwrap().constraint,
            Some(Constraint::NonEmpty)
        );
        match &schema.field("applicationId").unwrap().constraint {
            Some(Constraint::Pattern(p)) => {
                assert!(p.is_match("com.acme.app"));
                assert!(!p.is_match("org.other"));
            }
            other => panic!("expected pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_patterns_compiled() {
        let schema = Schema::builtin();
        let Some(Constraint::Pattern(ndk)) = &schema.field("ndkVersion").unwrap().constraint else {
            panic!("ndkVersion has no pattern");
        };
        assert!(ndk.is_match("27.0.12077973"));
        assert_eq!(ndk.as_str(), NDK_VERSION_PATTERN);
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let text = r#"
id = "x"
version = 1
[[fields]]
key = "a"
type = "string"
constraint = { pattern = "(" }
"#;
        let err = Schema::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ResolveError::Schema(_)));
        assert!(err.to_string().contains("bad pattern"));
    }

    #[test]
    fn test_rejects_predicate_on_undeclared_field() {
        let text = r#"
id = "x"
version = 1
[[fields]]
key = "a"
type = "integer"
[[predicates]]
kind = "less_or_equal"
lower = "a"
upper = "b"
"#;
        let err = Schema::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("undeclared field `b`"));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let mut schema = Schema::builtin();
        schema.fields.push(FieldRule::new("versionCode", FieldType::Integer));
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_known_keys() {
        let schema = Schema::builtin();
        assert!(schema.is_known_key("versionCode"));
        assert!(schema.is_known_key("signing.keyAlias"));
        assert!(schema.is_known_key("feature.analytics"));
        assert!(!schema.is_known_key("flutter.sdk"));
    }
}
