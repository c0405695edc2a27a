//! Reserved store state
//!
//! A small fixed set of keys carries run bookkeeping rather than application
//! data: the ambient context bag, the accumulated record history, pre-loaded
//! conversation history, and the session identifier. This state is held as
//! explicit typed fields instead of entries in the key/value table, is always
//! present, cannot be deleted, and its writes bypass waiters and pub/sub.

use plexus_core::{Context, KeyName, UnitRecord};

/// The reserved key names.
///
/// Addressing one of these through the plain key/value operations (`set`,
/// `delete`) is rejected with [`plexus_core::StoreError::ReservedKey`]; the
/// typed accessors on the store are the only way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedKey {
    /// The run's ambient context bag.
    Context,
    /// The accumulated, append-only record history.
    Results,
    /// Conversation history pre-loaded at run start.
    History,
    /// The session/thread identifier.
    SessionId,
}

impl ReservedKey {
    /// All reserved keys.
    pub const ALL: [ReservedKey; 4] = [
        ReservedKey::Context,
        ReservedKey::Results,
        ReservedKey::History,
        ReservedKey::SessionId,
    ];

    /// The key name this reserved slot shadows.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservedKey::Context => "context",
            ReservedKey::Results => "results",
            ReservedKey::History => "history",
            ReservedKey::SessionId => "session_id",
        }
    }

    /// Whether `key` names a reserved slot.
    pub fn shadows(key: &KeyName) -> bool {
        Self::ALL.iter().any(|r| r.as_str() == key.as_str())
    }
}

/// Typed storage behind the reserved keys.
#[derive(Debug, Default)]
pub(crate) struct ReservedState {
    pub(crate) context: Context,
    pub(crate) records: Vec<UnitRecord>,
    pub(crate) history: Vec<UnitRecord>,
    pub(crate) session_id: Option<String>,
}
