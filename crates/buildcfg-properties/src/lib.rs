//! Flat `key=value` property files.
//!
//! The format is the one used by Android `*.properties` files such as
//! `key.properties` and `local.properties`: one entry per line, `#` or `!`
//! comments, `=` or `:` as separator, backslash escapes and `\` line
//! continuations as in `java.util.Properties`. Values are kept as text (see
//! [`PropertyValue`]) and the last declaration of a key wins.

mod parser;
mod value;

pub use parser::parse;
pub use value::PropertyValue;

use std::collections::BTreeMap;

/// A single parsed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: PropertyValue,
    /// 1-based line the winning declaration came from.
    pub line: usize,
}

/// A key declared more than once in the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub key: String,
    pub first_line: usize,
    pub line: usize,
}

/// Parsed contents of one property file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, Entry>,
    duplicates: Vec<Duplicate>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing (and recording) any earlier declaration.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue, line: usize) {
        let key = key.into();
        if let Some(previous) = self.entries.get(&key) {
            self.duplicates.push(Duplicate {
                key: key.clone(),
                first_line: previous.line,
                line,
            });
        }
        self.entries.insert(key, Entry { value, line });
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop line information, keeping only key -> value.
    pub fn into_values(self) -> BTreeMap<String, PropertyValue> {
        self.entries.into_iter().map(|(k, e)| (k, e.value)).collect()
    }
}

/// Error produced for malformed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}
