//! Context merging and the task adapter
//!
//! [`deep_merge`] combines two JSON values with override-wins semantics:
//! objects merge recursively, everything else (arrays included) is replaced
//! wholesale. Arrays are never concatenated.
//!
//! [`TaskUnit`] wraps a unit with its own context overlay, deep-merging the
//! overlay into the ambient context before delegating.

use std::sync::Arc;

use plexus_core::{Context, UnitError, UnitName, UnitRecord};
use plexus_memory::ReactiveStore;
use serde_json::Value;

use crate::unit::Unit;

/// Recursively merge `overlay` into `base`, returning the merged value.
///
/// At every level `overlay` wins for a given key. When both sides hold an
/// object for the same key the objects merge recursively; in every other
/// pairing the overlay value replaces the base value wholesale. In
/// particular, two arrays do not concatenate: the overlay array replaces the
/// base array.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

fn merge_contexts(base: &Context, overlay: &Context) -> Context {
    match deep_merge(
        &Value::Object(base.clone()),
        &Value::Object(overlay.clone()),
    ) {
        Value::Object(merged) => merged,
        // Merging two objects always yields an object.
        _ => unreachable!(),
    }
}

/// A unit bundled with its own context overlay.
///
/// When run, the overlay is deep-merged into the run's ambient context
/// (overlay wins) and the merged context is handed to the inner unit.
pub struct TaskUnit {
    name: UnitName,
    inner: Arc<dyn Unit>,
    overlay: Context,
}

impl TaskUnit {
    /// Wrap `inner` with `overlay`, keeping the inner unit's name.
    pub fn new(inner: Arc<dyn Unit>, overlay: Context) -> Self {
        Self {
            name: inner.name().clone(),
            inner,
            overlay,
        }
    }

    /// Use a distinct registry name for this task.
    pub fn with_name(mut self, name: UnitName) -> Self {
        self.name = name;
        self
    }
}

impl Unit for TaskUnit {
    fn name(&self) -> &UnitName {
        &self.name
    }

    fn run(&self, context: &Context, store: &ReactiveStore) -> Result<UnitRecord, UnitError> {
        let merged = merge_contexts(context, &self.overlay);
        self.inner.run(&merged, store)
    }
}
