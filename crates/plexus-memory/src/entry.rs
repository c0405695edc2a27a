//! Store entry bookkeeping

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single key's value plus bookkeeping.
///
/// The most recent write always wins; `created_at` survives overwrites while
/// `updated_at` tracks the latest one. `access_count` counts reads, including
/// blocking reads satisfied immediately from the table.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value.
    pub value: Value,
    /// When the key was first written.
    pub created_at: DateTime<Utc>,
    /// When the key was last written.
    pub updated_at: DateTime<Utc>,
    /// How many times the key has been read.
    pub access_count: u64,
}

impl Entry {
    pub(crate) fn new(value: Value) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            updated_at: now,
            access_count: 0,
        }
    }

    /// Replace the value, keeping `created_at` and the access count.
    pub(crate) fn overwrite(&mut self, value: Value) {
        self.value = value;
        self.updated_at = Utc::now();
    }
}
