//! Error types for store and run-loop operations
//!
//! Errors are organized per domain: [`StoreError`] for the reactive store,
//! [`UnitError`] for failures inside a unit execution, and [`RunError`] for
//! the coordinator's run loop and its persistence boundary.

use std::time::Duration;

use thiserror::Error;

use crate::identifiers::{KeyName, UnitName};

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// A blocking read expired with the key still unset.
    ///
    /// Propagates to the calling unit, which decides whether to retry, fall
    /// back, or fail.
    #[error("timed out after {waited:?} waiting for key '{key}'")]
    AwaitTimeout { key: KeyName, waited: Duration },

    /// A reserved key was addressed through the plain key/value plane.
    ///
    /// Reserved state is always present and only reachable through its typed
    /// accessors; deleting or overwriting it by name is rejected and the
    /// store is left unchanged.
    #[error("'{key}' is a reserved key and cannot be modified directly")]
    ReservedKey { key: KeyName },

    /// A derived key (for example a scoped `prefix:key`) failed validation.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A glob pattern could not be compiled into a matcher.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The store mutex was poisoned by a panicking thread.
    #[error("store lock poisoned during {operation}")]
    Poisoned { operation: &'static str },
}

/// Errors produced by a unit execution.
#[derive(Debug, Error)]
pub enum UnitError {
    /// A store operation inside the unit failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The unit itself reported a failure.
    #[error("unit '{unit}' failed: {reason}")]
    Failed { unit: UnitName, reason: String },
}

/// Errors produced by the coordinator's run loop.
#[derive(Debug, Error)]
pub enum RunError {
    /// A unit execution raised; the run transitioned to its failed state.
    #[error("unit '{unit}' aborted the run: {source}")]
    Unit {
        unit: UnitName,
        #[source]
        source: UnitError,
    },

    /// A store operation performed by the run loop itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A persistence hook failed at a run boundary.
    #[error("persistence {operation} failed: {reason}")]
    Persistence { operation: String, reason: String },

    /// The coordinator was asked to run from a state other than pending.
    #[error("cannot start a run from state '{state}'; a coordinator drives exactly one run")]
    InvalidState { state: String },
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for run-loop operations.
pub type RunResult<T> = Result<T, RunError>;
