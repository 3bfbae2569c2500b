//! Build variants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named build profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Debug,
    Release,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
        }
    }

    /// Whether the variant must be signed with release material
    pub fn requires_release_signing(&self) -> bool {
        matches!(self, Variant::Release)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Variant::Debug),
            "release" => Ok(Variant::Release),
            other => Err(format!("unknown variant `{}` (expected debug or release)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("debug".parse::<Variant>(), Ok(Variant::Debug));
        assert_eq!("Release".parse::<Variant>(), Ok(Variant::Release));
        assert!("profile".parse::<Variant>().is_err());
    }

    #[test]
    fn test_release_signing() {
        assert!(Variant::Release.requires_release_signing());
        assert!(!Variant::Debug.requires_release_signing());
    }
}
