//! The unit contract and registry
//!
//! A unit is a runnable component (an LLM-driven agent in the source domain)
//! that the coordinator invokes with the ambient context and a handle to the
//! shared store. Units may block on another unit's future write through
//! `ReactiveStore::await_key`; nothing else in the core suspends.

use std::collections::HashMap;
use std::sync::Arc;

use plexus_core::{Context, UnitError, UnitName, UnitRecord};
use plexus_memory::ReactiveStore;

/// A runnable unit of work.
///
/// Implementations must tolerate partial context and must not assume
/// exclusive access to the store: other units (and subscriber callbacks) may
/// read and write it concurrently.
pub trait Unit: Send + Sync {
    /// The unit's registry name.
    fn name(&self) -> &UnitName;

    /// Execute the unit. Blocking store reads are the only sanctioned way
    /// to wait for other units' output.
    fn run(&self, context: &Context, store: &ReactiveStore) -> Result<UnitRecord, UnitError>;
}

/// Name-indexed table of registered units.
#[derive(Default)]
pub struct UnitRegistry {
    units: HashMap<UnitName, Arc<dyn Unit>>,
}

impl UnitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under its own name, replacing any previous unit with
    /// that name.
    pub fn register(&mut self, unit: Arc<dyn Unit>) {
        self.units.insert(unit.name().clone(), unit);
    }

    /// Look up a unit by name.
    pub fn get(&self, name: &UnitName) -> Option<Arc<dyn Unit>> {
        self.units.get(name).cloned()
    }

    /// Whether a unit with `name` is registered.
    pub fn contains(&self, name: &UnitName) -> bool {
        self.units.contains_key(name)
    }

    /// Registered unit names, in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &UnitName> {
        self.units.keys()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoUnit {
        name: UnitName,
    }

    impl Unit for EchoUnit {
        fn name(&self) -> &UnitName {
            &self.name
        }

        fn run(&self, context: &Context, _store: &ReactiveStore) -> Result<UnitRecord, UnitError> {
            Ok(UnitRecord::new(
                self.name.clone(),
                json!({ "context_keys": context.len() }),
            ))
        }
    }

    #[test]
    fn register_and_look_up() {
        let mut registry = UnitRegistry::new();
        let name = UnitName::new_unchecked("echo");
        registry.register(Arc::new(EchoUnit { name: name.clone() }));

        assert!(registry.contains(&name));
        assert!(registry.get(&name).is_some());
        assert!(registry.get(&UnitName::new_unchecked("missing")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistering_replaces() {
        let mut registry = UnitRegistry::new();
        let name = UnitName::new_unchecked("echo");
        registry.register(Arc::new(EchoUnit { name: name.clone() }));
        registry.register(Arc::new(EchoUnit { name: name.clone() }));
        assert_eq!(registry.len(), 1);
    }
}
