//! Change notification events

use chrono::{DateTime, Utc};
use plexus_core::KeyName;
use serde::Serialize;
use serde_json::Value;

/// A committed write, as seen by subscribers.
///
/// Events are delivered only to subscribers; blocking readers receive the raw
/// value. `previous` is `None` for the first write to a key.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    /// The key that was written.
    pub key: KeyName,
    /// The value that was written.
    pub value: Value,
    /// The value that was replaced, absent on first write.
    pub previous: Option<Value>,
    /// Identifier of the writer, when one was supplied.
    pub writer: Option<String>,
    /// When the write was committed.
    pub timestamp: DateTime<Utc>,
}
