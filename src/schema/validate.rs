//! Schema validation
//!
//! Validation is exhaustive: every field rule and every applicable predicate
//! is evaluated and all violations are reported together.

use buildcfg_properties::PropertyValue;
use std::collections::BTreeSet;

use super::{Constraint, CrossFieldRule, FieldRule, FieldType, Schema, FEATURE_PREFIX};
use crate::error::{ResolveError, Violation};
use crate::resolver::MergedConfig;
use crate::variant::Variant;

impl Schema {
    /// Validate a merged config for a variant.
    ///
    /// Cross-field predicates only run when every key they read is present
    /// and passed its own field rule.
    pub fn validate(&self, merged: &MergedConfig, variant: Variant) -> Result<(), ResolveError> {
        let mut violations = Vec::new();
        let mut valid: BTreeSet<&str> = BTreeSet::new();

        for rule in &self.fields {
            match merged.get(&rule.key) {
                None => {
                    if rule.is_required(variant) {
                        violations.push(Violation::new(&rule.key, "required"));
                    }
                }
                Some(value) => match check_field(rule, value) {
                    Ok(()) => {
                        valid.insert(rule.key.as_str());
                    }
                    Err(reason) => violations.push(Violation::new(&rule.key, reason)),
                },
            }
        }

        for (key, entry) in merged.iter() {
            if self.is_secret_key(key) {
                violations.push(Violation::new(
                    key,
                    format!(
                        "secret material must come from a secrets layer (found in `{}`)",
                        entry.layer
                    ),
                ));
            } else if key.starts_with(FEATURE_PREFIX) && entry.value.as_bool().is_none() {
                violations.push(Violation::new(
                    key,
                    format!("feature flag must be boolean, found {}", entry.value.type_name()),
                ));
            }
        }

        for predicate in &self.predicates {
            if predicate.keys().iter().all(|k| valid.contains(k)) {
                if let Err(violation) = check_predicate(predicate, merged) {
                    violations.push(violation);
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::Validation(violations))
        }
    }

    /// Keys present in the merged config that the schema does not declare
    pub fn unknown_keys<'a>(&self, merged: &'a MergedConfig) -> Vec<&'a str> {
        merged.keys().filter(|k| !self.is_known_key(k)).collect()
    }
}

fn check_field(rule: &FieldRule, value: &PropertyValue) -> Result<(), String> {
    match rule.ty {
        FieldType::Integer => {
            let Some(i) = value.as_i64() else {
                return Err(format!("expected integer, found {} `{}`", value.type_name(), value));
            };
            if let Some(Constraint::Range { min, max }) = &rule.constraint {
                if i < *min || i > *max {
                    return Err(format!("{} is outside [{}, {}]", i, min, max));
                }
            }
            check_text_constraint(rule, &i.to_string())
        }
        FieldType::Boolean => {
            if value.as_bool().is_none() {
                return Err(format!("expected boolean, found {} `{}`", value.type_name(), value));
            }
            Ok(())
        }
        FieldType::String => check_text_constraint(rule, &value.to_text()),
    }
}

fn check_text_constraint(rule: &FieldRule, text: &str) -> Result<(), String> {
    match &rule.constraint {
        Some(Constraint::Pattern(pattern)) => {
            if !pattern.is_match(text) {
                return Err(format!("`{}` does not match {}", text, pattern));
            }
        }
        Some(Constraint::OneOf(allowed)) => {
            if !allowed.iter().any(|a| a == text) {
                return Err(format!("`{}` is not one of [{}]", text, allowed.join(", ")));
            }
        }
        Some(Constraint::NonEmpty) => {
            if text.trim().is_empty() {
                return Err("must not be empty".to_string());
            }
        }
        Some(Constraint::Range { .. }) if rule.ty != FieldType::Integer => {
            return Err("range constraint applies to integers only".to_string());
        }
        Some(Constraint::Range { .. }) | None => {}
    }
    Ok(())
}

fn check_predicate(predicate: &CrossFieldRule, merged: &MergedConfig) -> Result<(), Violation> {
    match predicate {
        CrossFieldRule::LessOrEqual { lower, upper } => {
            let lo = merged.get(lower).and_then(PropertyValue::as_i64);
            let hi = merged.get(upper).and_then(PropertyValue::as_i64);
            match (lo, hi) {
                (Some(lo), Some(hi)) if lo > hi => Err(Violation::new(
                    lower,
                    format!("{} must not exceed {} ({})", lo, upper, hi),
                )),
                _ => Ok(()),
            }
        }
        CrossFieldRule::Requires { key, requires } => {
            let on = merged.get(key).and_then(PropertyValue::as_bool);
            let needed = merged.get(requires).and_then(PropertyValue::as_bool);
            match (on, needed) {
                (Some(true), Some(false)) => Err(Violation::new(
                    key,
                    format!("requires {} = true", requires),
                )),
                _ => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::merge_layers;
    use crate::source::PropertyLayer;

    fn merged(entries: &[(&str, PropertyValue)]) -> MergedConfig {
        let layer = PropertyLayer::literal("test", 0, entries.iter().cloned());
        merge_layers([&layer])
    }

    fn valid_entries() -> Vec<(&'static str, PropertyValue)> {
        vec![
            ("applicationId", "com.example.app".into()),
            ("versionCode", PropertyValue::Integer(1)),
            ("versionName", "1.0".into()),
            ("minPlatformVersion", PropertyValue::Integer(21)),
            ("targetPlatformVersion", PropertyValue::Integer(33)),
        ]
    }

    fn violations(result: Result<(), ResolveError>) -> Vec<Violation> {
        result.unwrap_err().violations().to_vec()
    }

    #[test]
    fn test_valid_config() {
        let schema = Schema::builtin();
        assert!(schema.validate(&merged(&valid_entries()), Variant::Debug).is_ok());
    }

    #[test]
    fn test_two_missing_keys_two_violations() {
        let schema = Schema::builtin();
        let entries: Vec<_> = valid_entries()
            .into_iter()
            .filter(|(k, _)| *k != "applicationId" && *k != "versionName")
            .collect();

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 2);
        assert_eq!(v[0], Violation::new("applicationId", "required"));
        assert_eq!(v[1], Violation::new("versionName", "required"));
    }

    #[test]
    fn test_integer_from_text() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[1] = ("versionCode", "2".into());
        assert!(schema.validate(&merged(&entries), Variant::Debug).is_ok());
    }

    #[test]
    fn test_type_and_range_errors_collected() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[1] = ("versionCode", "two".into());
        entries.push(("compilePlatformVersion", PropertyValue::Integer(500)));
        entries.push(("release.minifyEnabled", "maybe".into()));

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        let keys: Vec<_> = v.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["versionCode", "compilePlatformVersion", "release.minifyEnabled"]);
        assert!(v[0].reason.contains("expected integer"));
        assert!(v[1].reason.contains("outside [1, 100]"));
    }

    #[test]
    fn test_pattern_and_one_of() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[0] = ("applicationId", "not a package".into());
        entries.push(("jvmTarget", "9".into()));
        entries.push(("ndkVersion", "27.0.12077973".into()));

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].key, "applicationId");
        assert_eq!(v[1].key, "jvmTarget");
    }

    #[test]
    fn test_jvm_target_accepts_integer_text() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries.push(("jvmTarget", PropertyValue::Integer(17)));
        assert!(schema.validate(&merged(&entries), Variant::Debug).is_ok());
    }

    #[test]
    fn test_blank_version_name() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[2] = ("versionName", "".into());

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v, vec![Violation::new("versionName", "must not be empty")]);
    }

    #[test]
    fn test_cross_field_less_or_equal() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[3] = ("minPlatformVersion", PropertyValue::Integer(34));

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "minPlatformVersion");
        assert!(v[0].reason.contains("must not exceed targetPlatformVersion"));
    }

    #[test]
    fn test_cross_field_skipped_when_input_invalid() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries[3] = ("minPlatformVersion", PropertyValue::Integer(500));

        // only the range violation, no predicate violation on top
        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 1);
        assert!(v[0].reason.contains("outside"));
    }

    #[test]
    fn test_cross_field_skipped_when_optional_absent() {
        let schema = Schema::builtin();
        // compilePlatformVersion absent: target <= compile is not evaluated
        assert!(schema.validate(&merged(&valid_entries()), Variant::Release).is_ok());
    }

    #[test]
    fn test_shrink_requires_minify() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries.push(("release.shrinkResources", PropertyValue::Boolean(true)));
        entries.push(("release.minifyEnabled", PropertyValue::Boolean(false)));

        let v = violations(schema.validate(&merged(&entries), Variant::Release));
        assert_eq!(
            v,
            vec![Violation::new(
                "release.shrinkResources",
                "requires release.minifyEnabled = true"
            )]
        );
    }

    #[test]
    fn test_secret_in_config_layer_rejected() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries.push(("signing.storePassword", "hunter2".into()));

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "signing.storePassword");
        assert!(!v[0].reason.contains("hunter2"));
    }

    #[test]
    fn test_feature_flags_must_be_boolean() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries.push(("feature.analytics", PropertyValue::Boolean(true)));
        entries.push(("feature.beta", "sometimes".into()));

        let v = violations(schema.validate(&merged(&entries), Variant::Debug));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].key, "feature.beta");
    }

    #[test]
    fn test_required_for_variant() {
        let mut schema = Schema::builtin();
        schema.fields.push(
            FieldRule::new("playTrack", FieldType::String).required_for(Variant::Release),
        );

        let entries = valid_entries();
        assert!(schema.validate(&merged(&entries), Variant::Debug).is_ok());
        let v = violations(schema.validate(&merged(&entries), Variant::Release));
        assert_eq!(v, vec![Violation::new("playTrack", "required")]);
    }

    #[test]
    fn test_unknown_keys() {
        let schema = Schema::builtin();
        let mut entries = valid_entries();
        entries.push(("flutter.sdk", "/opt/flutter".into()));
        entries.push(("feature.x", PropertyValue::Boolean(true)));

        let m = merged(&entries);
        assert_eq!(schema.unknown_keys(&m), vec!["flutter.sdk"]);
    }
}
