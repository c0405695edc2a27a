//! Validated identifier types used throughout the Plexus crates
//!
//! All identifiers follow the parse-don't-validate pattern: constructors
//! return `Result` instead of panicking on invalid input, and each identifier
//! is a distinct newtype so a `UnitName` can never be passed where a
//! `KeyName` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{IdentifierRules, ValidationError};

/// Validated store key name.
///
/// Keys identify entries in the shared store. They allow dots and colons so
/// callers can build namespaced keys like `session:abc:result`, which is also
/// what scoped store views produce when they prefix keys.
///
/// # Example
///
/// ```rust
/// use plexus_core::KeyName;
///
/// let key = KeyName::parse("ns:result").unwrap();
/// assert_eq!(key.as_str(), "ns:result");
/// assert!(KeyName::parse("no spaces allowed").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyName(String);

impl KeyName {
    /// Parse and validate a key name from a string.
    pub fn parse(key: impl AsRef<str>) -> Result<Self, ValidationError> {
        IdentifierRules::KEY_NAME.validate(key.as_ref()).map(Self)
    }

    /// Get the key name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Create a key name without validation (for testing only).
    #[doc(hidden)]
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for KeyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for KeyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyName::parse(s)
    }
}

impl TryFrom<String> for KeyName {
    type Error = ValidationError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        KeyName::parse(&key)
    }
}

impl From<KeyName> for String {
    fn from(key: KeyName) -> String {
        key.0
    }
}

/// Validated unit name.
///
/// Units are the runnable components driven by the coordinator. Names are
/// stricter than key names (no dots or colons) because they double as lookup
/// identifiers in the unit registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitName(String);

impl UnitName {
    /// Parse and validate a unit name from a string.
    pub fn parse(name: impl AsRef<str>) -> Result<Self, ValidationError> {
        IdentifierRules::UNIT_NAME.validate(name.as_ref()).map(Self)
    }

    /// Get the unit name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a unit name without validation (for testing only).
    #[doc(hidden)]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UnitName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for UnitName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitName::parse(s)
    }
}

impl TryFrom<String> for UnitName {
    type Error = ValidationError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        UnitName::parse(&name)
    }
}

impl From<UnitName> for String {
    fn from(name: UnitName) -> String {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_name_round_trips_through_serde() {
        let key = KeyName::parse("session:abc").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        let back: KeyName = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn invalid_key_name_fails_deserialization() {
        let result: Result<KeyName, _> = serde_json::from_str("\"bad key\"");
        assert!(result.is_err());
    }

    #[test]
    fn unit_name_rejects_namespace_characters() {
        assert!(UnitName::parse("writer").is_ok());
        assert!(UnitName::parse("ns:writer").is_err());
    }
}
