//! Change subscriptions

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use plexus_core::KeyName;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::ChangeEvent;
use crate::pattern::KeyPattern;

/// Unique identifier for a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked with each matching [`ChangeEvent`].
///
/// Callbacks run off the writer thread, behind an error boundary: a panic is
/// logged and swallowed so one misbehaving subscriber cannot disrupt the
/// writer or other subscribers.
pub(crate) type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync + 'static>;

/// What a subscription matches on.
pub(crate) enum SubscriptionFilter {
    /// Exact-key set membership.
    Keys(HashSet<KeyName>),
    /// Compiled glob pattern.
    Pattern(KeyPattern),
}

pub(crate) struct Subscription {
    pub(crate) filter: SubscriptionFilter,
    pub(crate) callback: ChangeCallback,
}

impl Subscription {
    pub(crate) fn matches(&self, key: &KeyName) -> bool {
        match &self.filter {
            SubscriptionFilter::Keys(keys) => keys.contains(key),
            SubscriptionFilter::Pattern(pattern) => pattern.matches(key),
        }
    }
}
