//! Typed property values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A property value.
///
/// Everything read from a file or the environment is a `String` holding the
/// text exactly as written (after unescaping), so `000123` stays `000123`.
/// Typed views ([`as_i64`](Self::as_i64), [`as_bool`](Self::as_bool)) coerce
/// on demand. The typed variants exist for in-memory layers and for
/// descriptor values whose schema type is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl PropertyValue {
    /// Name of the held type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Boolean(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::String(_) => "string",
        }
    }

    /// Text form; the original text for values read from a source.
    pub fn to_text(&self) -> String {
        match self {
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::String(s) => s.clone(),
        }
    }

    /// Integer view, coercing from text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::String(s) => s.trim().parse().ok(),
            PropertyValue::Boolean(_) => None,
        }
    }

    /// Boolean view, coercing from text.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// True for strings that are empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        matches!(self, PropertyValue::String(s) if s.trim().is_empty())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_preserved() {
        for raw in ["000123", "0042", "True", "+5", "1.0", "27.0.12077973"] {
            assert_eq!(PropertyValue::from(raw).to_text(), raw);
        }
    }

    #[test]
    fn test_coercions() {
        assert_eq!(PropertyValue::from("12").as_i64(), Some(12));
        assert_eq!(PropertyValue::from("007").as_i64(), Some(7));
        assert_eq!(PropertyValue::from("+5").as_i64(), Some(5));
        assert_eq!(PropertyValue::from("99999999999999999999999").as_i64(), None);
        assert_eq!(PropertyValue::from("True").as_bool(), Some(true));
        assert_eq!(PropertyValue::Integer(1).as_bool(), None);
        assert_eq!(PropertyValue::Integer(11).to_text(), "11");
        assert!(PropertyValue::from("  ").is_blank());
    }

    #[test]
    fn test_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            PropertyValue::Boolean(true),
            PropertyValue::Integer(2),
            PropertyValue::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[true,2,"x"]"#);
    }
}
