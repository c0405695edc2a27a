//! Shared validation utilities for identifiers across the codebase
//!
//! This module provides consistent validation logic for the string-based
//! identifiers used by the store and the run loop (store keys, unit names).

/// Validation rules for string identifiers
#[derive(Debug, Clone, Copy)]
pub struct IdentifierRules {
    /// Maximum allowed length in characters
    pub max_length: usize,
    /// Whether to allow dots (.) in the identifier
    pub allow_dots: bool,
    /// Whether to allow colons (:) in the identifier
    pub allow_colons: bool,
    /// Whether to trim whitespace before validation
    pub trim_whitespace: bool,
}

impl IdentifierRules {
    /// Standard rules for store key names
    ///
    /// - Max length: 128 characters
    /// - Allows: alphanumeric, `_`, `-`, `.`, `:`
    /// - Disallows: spaces and other special characters
    ///
    /// The additional characters (`.` and `:`) enable namespacing patterns
    /// like `user.settings` or `session:abc:result`.
    pub const KEY_NAME: Self = Self {
        max_length: 128,
        allow_dots: true,
        allow_colons: true,
        trim_whitespace: true,
    };

    /// Standard rules for unit names
    ///
    /// - Max length: 64 characters
    /// - Allows: alphanumeric, `_`, `-`
    /// - Disallows: `.`, `:`, spaces, and other special characters
    pub const UNIT_NAME: Self = Self {
        max_length: 64,
        allow_dots: false,
        allow_colons: false,
        trim_whitespace: true,
    };

    /// Validate a string against these rules
    ///
    /// # Parameters
    ///
    /// * `input` - The string to validate
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The validated string (trimmed if `trim_whitespace` is set)
    /// * `Err(ValidationError)` - Description of validation failure
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        let processed = if self.trim_whitespace {
            input.trim()
        } else {
            input
        };

        if processed.is_empty() {
            return Err(ValidationError::Empty);
        }

        if processed.len() > self.max_length {
            return Err(ValidationError::TooLong {
                length: processed.len(),
                max: self.max_length,
            });
        }

        for ch in processed.chars() {
            let is_valid = ch.is_alphanumeric()
                || ch == '_'
                || ch == '-'
                || (ch == '.' && self.allow_dots)
                || (ch == ':' && self.allow_colons);

            if !is_valid {
                return Err(ValidationError::InvalidChar {
                    char: ch,
                    input: processed.to_string(),
                });
            }
        }

        Ok(processed.to_string())
    }
}

/// Errors that can occur during identifier validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is empty or whitespace-only
    Empty,
    /// Identifier exceeds maximum allowed length
    TooLong {
        /// Actual length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },
    /// Identifier contains an invalid character
    InvalidChar {
        /// The invalid character
        char: char,
        /// The full input string
        input: String,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "Identifier cannot be empty"),
            ValidationError::TooLong { length, max } => {
                write!(f, "Identifier too long: {} characters (max {})", length, max)
            }
            ValidationError::InvalidChar { char, input } => {
                write!(
                    f,
                    "Identifier '{}' contains invalid character '{}'",
                    input, char
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_rules() {
        let rules = IdentifierRules::KEY_NAME;

        assert!(rules.validate("user_context").is_ok());
        assert!(rules.validate("cache.session").is_ok());
        assert!(rules.validate("ns:a").is_ok());
        assert!(rules.validate("cache:session:user").is_ok());

        assert!(matches!(rules.validate(""), Err(ValidationError::Empty)));
        assert!(matches!(rules.validate("   "), Err(ValidationError::Empty)));
        assert!(matches!(
            rules.validate("key with spaces"),
            Err(ValidationError::InvalidChar { .. })
        ));

        let long_key = "a".repeat(129);
        assert!(matches!(
            rules.validate(&long_key),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_unit_name_rules() {
        let rules = IdentifierRules::UNIT_NAME;

        assert!(rules.validate("summarizer").is_ok());
        assert!(rules.validate("unit_name").is_ok());
        assert!(rules.validate("unit-2").is_ok());

        assert!(matches!(
            rules.validate("unit:name"),
            Err(ValidationError::InvalidChar { char: ':', .. })
        ));
        assert!(matches!(
            rules.validate("unit.name"),
            Err(ValidationError::InvalidChar { char: '.', .. })
        ));

        let long_name = "a".repeat(65);
        assert!(matches!(
            rules.validate(&long_name),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_trimming() {
        let result = IdentifierRules::UNIT_NAME.validate("  planner  ").unwrap();
        assert_eq!(result, "planner");
    }
}
