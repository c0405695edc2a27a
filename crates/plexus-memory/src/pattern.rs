//! Glob patterns for key subscriptions
//!
//! Subscriptions can match keys by glob: `*` matches any run of characters
//! (including none), `?` matches exactly one. A pattern is compiled once into
//! a fully anchored regex, so `ns:*` matches `ns:a` but never `other:ns:x`.

use plexus_core::{KeyName, StoreError};
use regex::Regex;

/// A compiled, fully anchored key-matching pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    matcher: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern into an anchored matcher.
    ///
    /// # Example
    ///
    /// ```rust
    /// use plexus_memory::KeyPattern;
    /// use plexus_core::KeyName;
    ///
    /// let pattern = KeyPattern::compile("ns:*").unwrap();
    /// assert!(pattern.matches(&KeyName::parse("ns:a").unwrap()));
    /// assert!(!pattern.matches(&KeyName::parse("other").unwrap()));
    /// ```
    pub fn compile(glob: &str) -> Result<Self, StoreError> {
        let mut regex = String::with_capacity(glob.len() + 2);
        regex.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                other => regex.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex.push('$');

        let matcher = Regex::new(&regex).map_err(|e| StoreError::InvalidPattern {
            pattern: glob.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: glob.to_string(),
            matcher,
        })
    }

    /// Whether `key` matches this pattern.
    pub fn matches(&self, key: &KeyName) -> bool {
        self.matcher.is_match(key.as_str())
    }

    /// The original glob source.
    pub fn source(&self) -> &str {
        &self.source
    }
}
