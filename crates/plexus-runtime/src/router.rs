//! Routing: deciding which units run next
//!
//! A [`Router`] is a side-effect-free decision function. The coordinator
//! gives it a read-only [`RouterArgs`] view and gets back a
//! [`RouterDecision`]: either nothing (the run is done) or a list of unit
//! references to enqueue. References by name are resolved against the
//! registry; unknown names are compacted out rather than failing the run.

use std::fmt;
use std::sync::Arc;

use plexus_core::{Context, UnitName, UnitRecord};
use tracing::debug;

use crate::unit::{Unit, UnitRegistry};

/// Read-only view the router decides from.
#[derive(Clone, Copy)]
pub struct RouterArgs<'a> {
    /// How many units have completed in this run so far.
    pub call_count: usize,
    /// Names of the units still queued for this run, in execution order.
    pub stack: &'a [UnitName],
    /// The record of the unit that just completed, absent on the first call.
    pub last_record: Option<&'a UnitRecord>,
    /// The run's ambient context.
    pub context: &'a Context,
}

/// A reference to a unit, by registry name or directly by instance.
#[derive(Clone)]
pub enum UnitRef {
    /// Look the unit up in the registry; silently dropped if absent.
    Name(UnitName),
    /// Use this instance directly, registered or not.
    Instance(Arc<dyn Unit>),
}

impl fmt::Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRef::Name(name) => write!(f, "UnitRef::Name({name})"),
            UnitRef::Instance(unit) => write!(f, "UnitRef::Instance({})", unit.name()),
        }
    }
}

impl From<UnitName> for UnitRef {
    fn from(name: UnitName) -> Self {
        UnitRef::Name(name)
    }
}

impl From<Arc<dyn Unit>> for UnitRef {
    fn from(unit: Arc<dyn Unit>) -> Self {
        UnitRef::Instance(unit)
    }
}

/// What the router decided.
#[derive(Debug, Clone)]
pub enum RouterDecision {
    /// No more work; the run completes.
    Done,
    /// Enqueue these references, in order.
    Next(Vec<UnitRef>),
}

impl RouterDecision {
    /// Decision naming a single registered unit.
    pub fn unit(name: UnitName) -> Self {
        RouterDecision::Next(vec![UnitRef::Name(name)])
    }

    /// Decision carrying a single unit instance.
    pub fn instance(unit: Arc<dyn Unit>) -> Self {
        RouterDecision::Next(vec![UnitRef::Instance(unit)])
    }
}

/// Pluggable decision function consulted by the coordinator.
pub trait Router: Send + Sync {
    /// Decide which unit(s) to run next. Must be side-effect free.
    fn route(&self, args: RouterArgs<'_>) -> RouterDecision;
}

impl<F> Router for F
where
    F: Fn(RouterArgs<'_>) -> RouterDecision + Send + Sync,
{
    fn route(&self, args: RouterArgs<'_>) -> RouterDecision {
        self(args)
    }
}

/// A single unit standing in for a router: it runs exactly once, at
/// `call_count == 0`, and the run terminates immediately afterwards.
pub struct SingleUnitRouter {
    unit: Arc<dyn Unit>,
}

impl SingleUnitRouter {
    /// Wrap `unit` as a one-shot router.
    pub fn new(unit: Arc<dyn Unit>) -> Self {
        Self { unit }
    }
}

impl Router for SingleUnitRouter {
    fn route(&self, args: RouterArgs<'_>) -> RouterDecision {
        if args.call_count == 0 {
            RouterDecision::instance(Arc::clone(&self.unit))
        } else {
            RouterDecision::Done
        }
    }
}

/// Resolve a decision into concrete units.
///
/// Names are looked up in the registry; a name with no registered unit is
/// dropped from the result rather than treated as an error (callers rely on
/// this leniency), with a debug log so the drop is observable. Instances
/// pass through untouched.
pub fn resolve_decision(decision: RouterDecision, registry: &UnitRegistry) -> Vec<Arc<dyn Unit>> {
    match decision {
        RouterDecision::Done => Vec::new(),
        RouterDecision::Next(refs) => refs
            .into_iter()
            .filter_map(|unit_ref| match unit_ref {
                UnitRef::Name(name) => {
                    let unit = registry.get(&name);
                    if unit.is_none() {
                        debug!(unit = %name, "router returned unknown unit name; dropping");
                    }
                    unit
                }
                UnitRef::Instance(unit) => Some(unit),
            })
            .collect(),
    }
}
