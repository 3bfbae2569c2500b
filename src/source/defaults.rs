//! Built-in defaults (lowest precedence layer)
//!
//! Values every Android application build starts from unless a layer
//! overrides them.

use buildcfg_properties::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{LayerOrigin, LayerRole, PropertyLayer, PropertySource};
use crate::error::ResolveError;

/// Rank of the built-in layer
pub const BUILTIN_RANK: u32 = 0;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// JVM bytecode target (default: "11")
    pub jvm_target: String,

    /// Run code shrinking for release builds (default: false)
    pub minify_enabled: bool,

    /// Strip unused resources for release builds (default: false)
    pub shrink_resources: bool,

    /// Proguard rule files for release builds
    pub proguard_files: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            jvm_target: "11".to_string(),
            minify_enabled: false,
            shrink_resources: false,
            proguard_files: vec![
                "proguard-android-optimize.txt".to_string(),
                "proguard-rules.pro".to_string(),
            ],
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a layer for merging
    pub fn to_layer(&self) -> PropertyLayer {
        let mut values = BTreeMap::new();
        values.insert(
            "jvmTarget".to_string(),
            PropertyValue::String(self.jvm_target.clone()),
        );
        values.insert(
            "release.minifyEnabled".to_string(),
            PropertyValue::Boolean(self.minify_enabled),
        );
        values.insert(
            "release.shrinkResources".to_string(),
            PropertyValue::Boolean(self.shrink_resources),
        );
        values.insert(
            "release.proguardFiles".to_string(),
            PropertyValue::String(self.proguard_files.join(",")),
        );

        PropertyLayer::new(
            self.name(),
            BUILTIN_RANK,
            LayerRole::Config,
            LayerOrigin::Builtin,
            values,
        )
    }
}

impl PropertySource for BuiltinDefaults {
    fn load(&self) -> Result<PropertyLayer, ResolveError> {
        Ok(self.to_layer())
    }

    fn name(&self) -> String {
        "builtin".to_string()
    }
}
