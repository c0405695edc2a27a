//! # Plexus Runtime
//!
//! The coordination run loop: a [`Coordinator`] repeatedly consults a
//! pluggable [`Router`] for which [`Unit`]s to run next, executes them one at
//! a time with shared access to the reactive store, and appends each outcome
//! to an ordered, append-only record history until the router has nothing
//! left or the iteration cap is hit.

pub mod config;
pub mod coordinator;
pub mod persist;
pub mod router;
pub mod task;
pub mod unit;

pub use config::RunConfig;
pub use coordinator::{Coordinator, RunState};
pub use persist::{InMemoryRunStore, RunStore};
pub use router::{Router, RouterArgs, RouterDecision, SingleUnitRouter, UnitRef, resolve_decision};
pub use task::{TaskUnit, deep_merge};
pub use unit::{Unit, UnitRegistry};
