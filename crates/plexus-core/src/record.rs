//! Execution records and run context
//!
//! A [`UnitRecord`] is the immutable outcome of one unit execution. The run
//! history kept by the store's reserved state is an append-only, ordered list
//! of these records; they are never reordered or mutated after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::identifiers::UnitName;

/// Ambient run context: a JSON object handed to every unit.
///
/// Units must tolerate partial context; nothing guarantees a given key is
/// present. Merging unit-specific overlays into this map follows the
/// deep-merge semantics in `plexus-runtime`.
pub type Context = serde_json::Map<String, Value>;

/// Immutable outcome of one unit execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Unique record id.
    pub id: Uuid,
    /// Name of the unit that produced this record.
    pub unit_name: UnitName,
    /// The unit's output payload.
    pub output: Value,
    /// Why the unit stopped, when it reported a reason.
    pub stop_reason: Option<String>,
    /// Completion timestamp.
    pub created_at: DateTime<Utc>,
}

impl UnitRecord {
    /// Create a record for `unit_name` with the given output.
    pub fn new(unit_name: UnitName, output: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_name,
            output,
            stop_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a stop reason to the record.
    pub fn with_stop_reason(mut self, reason: impl Into<String>) -> Self {
        self.stop_reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_serialize_round_trip() {
        let record = UnitRecord::new(UnitName::new_unchecked("writer"), json!({"text": "hi"}))
            .with_stop_reason("complete");

        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: UnitRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn each_record_gets_a_fresh_id() {
        let a = UnitRecord::new(UnitName::new_unchecked("a"), json!(null));
        let b = UnitRecord::new(UnitName::new_unchecked("a"), json!(null));
        assert_ne!(a.id, b.id);
    }
}
