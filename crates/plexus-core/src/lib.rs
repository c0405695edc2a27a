//! # Plexus Core
//!
//! Core types and primitives for the Plexus coordination runtime.
//! This crate provides the validated identifiers, the one-shot broadcast
//! rendezvous primitive, the execution record types, and the error types
//! shared by the reactive store and the run loop.

pub mod error;
pub mod identifiers;
pub mod record;
pub mod validation;
pub mod waiter;

pub use error::{RunError, RunResult, StoreError, StoreResult, UnitError};
pub use identifiers::{KeyName, UnitName};
pub use record::{Context, UnitRecord};
pub use validation::{IdentifierRules, ValidationError};
pub use waiter::{WaitOutcome, Waiter};
