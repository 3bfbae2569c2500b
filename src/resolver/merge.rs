//! Layer merge logic
//!
//! Layers are overlaid in ascending rank. Values are scalars, so the merge
//! is a plain per-key override: the last layer to define a key wins, and the
//! winning layer is recorded. Layers of equal rank keep their load order.

use buildcfg_properties::PropertyValue;
use std::collections::BTreeMap;

use crate::source::PropertyLayer;

/// A merged value and the layer it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntry {
    pub value: PropertyValue,
    pub layer: String,
}

/// Result of overlaying config layers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedConfig {
    entries: BTreeMap<String, MergedEntry>,
}

impl MergedConfig {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&MergedEntry> {
        self.entries.get(key)
    }

    /// Name of the layer that supplied `key`
    pub fn winner(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.layer.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MergedEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Overlay one layer onto a merged config
pub fn overlay(mut base: MergedConfig, layer: &PropertyLayer) -> MergedConfig {
    for (key, value) in layer.iter() {
        base.entries.insert(
            key.to_string(),
            MergedEntry {
                value: value.clone(),
                layer: layer.name().to_string(),
            },
        );
    }
    base
}

/// Order layers for merging: ascending rank, load order within a rank
pub fn precedence_order<'a, I>(layers: I) -> Vec<&'a PropertyLayer>
where
    I: IntoIterator<Item = &'a PropertyLayer>,
{
    let mut ordered: Vec<&PropertyLayer> = layers.into_iter().collect();
    // sort_by_key is stable
    ordered.sort_by_key(|layer| layer.rank());
    ordered
}

/// Merge layers (lowest precedence first after ordering)
pub fn merge_layers<'a, I>(layers: I) -> MergedConfig
where
    I: IntoIterator<Item = &'a PropertyLayer>,
{
    precedence_order(layers)
        .into_iter()
        .fold(MergedConfig::default(), overlay)
}
