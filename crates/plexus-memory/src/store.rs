//! The reactive shared store
//!
//! [`ReactiveStore`] is the one structure in the runtime that is accessed
//! concurrently: each running unit holds a handle, and the dispatch pool
//! reads from it indirectly through captured events. All mutating operations
//! acquire a single mutex over the backing table, the waiter registry, and
//! the subscription registry; waiter wakeup and subscriber dispatch happen
//! after that lock is released.
//!
//! The blocking-read protocol closes the missed-wakeup race: a reader
//! re-checks key presence under the store lock before registering a
//! [`Waiter`], so a write that lands between an unlocked check and the
//! registration can never be missed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use plexus_core::{Context, KeyName, StoreError, StoreResult, UnitRecord, WaitOutcome, Waiter};
use serde_json::Value;
use tracing::trace;

use crate::dispatch::Dispatcher;
use crate::entry::Entry;
use crate::event::ChangeEvent;
use crate::pattern::KeyPattern;
use crate::reserved::{ReservedKey, ReservedState};
use crate::scoped::ScopedStore;
use crate::subscription::{ChangeCallback, Subscription, SubscriptionFilter, SubscriptionId};

/// How long a blocking read is willing to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until the key is written, however long that takes.
    Forever,
    /// Block at most this long, then fail with
    /// [`StoreError::AwaitTimeout`].
    Timeout(Duration),
}

impl Wait {
    fn timeout(self) -> Option<Duration> {
        match self {
            Wait::Forever => None,
            Wait::Timeout(duration) => Some(duration),
        }
    }
}

struct StoreInner {
    entries: HashMap<KeyName, Entry>,
    waiters: HashMap<KeyName, Vec<Arc<Waiter>>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    reserved: ReservedState,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            waiters: HashMap::new(),
            subscriptions: HashMap::new(),
            reserved: ReservedState::default(),
        }
    }
}

/// Thread-safe reactive key/value store with blocking reads and async
/// change notification.
///
/// Cloning is cheap and produces another handle to the same store.
///
/// # Example
///
/// ```rust
/// use plexus_core::KeyName;
/// use plexus_memory::ReactiveStore;
/// use serde_json::json;
///
/// let store = ReactiveStore::new();
/// let key = KeyName::parse("greeting").unwrap();
/// store.set(key.clone(), json!("hello")).unwrap();
/// assert_eq!(store.get(&key).unwrap(), Some(json!("hello")));
/// ```
#[derive(Clone)]
pub struct ReactiveStore {
    inner: Arc<Mutex<StoreInner>>,
    dispatcher: Arc<Dispatcher>,
}

impl Default for ReactiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveStore {
    /// Default number of dispatch worker threads.
    pub const DEFAULT_DISPATCH_WORKERS: usize = 2;

    /// Create a store with the default dispatch pool.
    pub fn new() -> Self {
        Self::with_dispatch_workers(Self::DEFAULT_DISPATCH_WORKERS)
    }

    /// Create a store with `workers` dispatch threads (minimum one).
    pub fn with_dispatch_workers(workers: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::new())),
            dispatcher: Arc::new(Dispatcher::new(workers)),
        }
    }

    fn lock(&self, operation: &'static str) -> StoreResult<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Poisoned { operation })
    }

    /// Write `value` under `key`, wake all waiters registered for the key,
    /// and notify matching subscribers asynchronously.
    ///
    /// Returns the written value. The waiter registry for the key is empty
    /// when this returns.
    pub fn set(&self, key: KeyName, value: Value) -> StoreResult<Value> {
        self.set_as(key, value, None)
    }

    /// Like [`ReactiveStore::set`], attributing the write to `writer` in the
    /// resulting change events.
    pub fn set_as(
        &self,
        key: KeyName,
        value: Value,
        writer: Option<&str>,
    ) -> StoreResult<Value> {
        if ReservedKey::shadows(&key) {
            return Err(StoreError::ReservedKey { key });
        }

        let (woken, notifications, event) = {
            let mut inner = self.lock("set")?;

            let previous = match inner.entries.get_mut(&key) {
                Some(entry) => {
                    let previous = entry.value.clone();
                    entry.overwrite(value.clone());
                    Some(previous)
                }
                None => {
                    inner.entries.insert(key.clone(), Entry::new(value.clone()));
                    None
                }
            };

            let woken = inner.waiters.remove(&key).unwrap_or_default();

            let event = ChangeEvent {
                key: key.clone(),
                value: value.clone(),
                previous,
                writer: writer.map(str::to_string),
                timestamp: chrono::Utc::now(),
            };

            let notifications: Vec<(SubscriptionId, ChangeCallback)> = inner
                .subscriptions
                .iter()
                .filter(|(_, sub)| sub.matches(&key))
                .map(|(id, sub)| (*id, Arc::clone(&sub.callback)))
                .collect();

            (woken, notifications, event)
        };

        // Lock released: wake blocked readers, then hand events to the pool.
        trace!(key = %key, waiters = woken.len(), subscribers = notifications.len(), "committed write");
        for waiter in woken {
            waiter.signal(value.clone());
        }
        for (id, callback) in notifications {
            self.dispatcher.dispatch(id, callback, event.clone());
        }

        Ok(value)
    }

    /// Non-blocking read. Absence is `None`, not an error.
    pub fn get(&self, key: &KeyName) -> StoreResult<Option<Value>> {
        let mut inner = self.lock("get")?;
        Ok(inner.entries.get_mut(key).map(|entry| {
            entry.access_count += 1;
            entry.value.clone()
        }))
    }

    /// Blocking read: return the key's value, waiting for a concurrent
    /// writer if the key is still unset.
    ///
    /// The presence check and waiter registration happen under the same lock
    /// a writer takes, so a write can never slip between them unnoticed. On
    /// timeout the waiter is deregistered before the error is returned, so
    /// nothing leaks and a later write will not deliver to an abandoned
    /// reader.
    pub fn await_key(&self, key: &KeyName, wait: Wait) -> StoreResult<Value> {
        let waiter = {
            let mut inner = self.lock("await_key")?;
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.access_count += 1;
                return Ok(entry.value.clone());
            }
            let waiter = Arc::new(Waiter::new());
            inner
                .waiters
                .entry(key.clone())
                .or_default()
                .push(Arc::clone(&waiter));
            waiter
        };

        match waiter.wait(wait.timeout()) {
            WaitOutcome::Delivered(value) => Ok(value),
            WaitOutcome::TimedOut => {
                let mut inner = self.lock("await_key")?;
                if let Some(registered) = inner.waiters.get_mut(key) {
                    registered.retain(|other| !Arc::ptr_eq(other, &waiter));
                    if registered.is_empty() {
                        inner.waiters.remove(key);
                    }
                }
                Err(StoreError::AwaitTimeout {
                    key: key.clone(),
                    waited: wait.timeout().unwrap_or_default(),
                })
            }
        }
    }

    /// Blocking read over several keys.
    ///
    /// Keys are waited independently and conjunctively: the call returns only
    /// once every key has a value, and with [`Wait::Timeout`] each missing
    /// key gets its own full budget. The first expired key aborts the call.
    pub fn await_keys(
        &self,
        keys: &[KeyName],
        wait: Wait,
    ) -> StoreResult<HashMap<KeyName, Value>> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            let value = self.await_key(key, wait)?;
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    /// Remove `key` and return its value. Reserved keys cannot be deleted.
    pub fn delete(&self, key: &KeyName) -> StoreResult<Option<Value>> {
        if ReservedKey::shadows(key) {
            return Err(StoreError::ReservedKey { key: key.clone() });
        }
        let mut inner = self.lock("delete")?;
        Ok(inner.entries.remove(key).map(|entry| entry.value))
    }

    /// Drop every non-reserved entry. Reserved state and subscriptions
    /// survive; registered waiters stay registered, still waiting on future
    /// writes.
    pub fn clear(&self) -> StoreResult<()> {
        let mut inner = self.lock("clear")?;
        inner.entries.clear();
        Ok(())
    }

    /// Number of non-reserved entries.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock("len")?.entries.len())
    }

    /// Whether the plain key/value table is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock("is_empty")?.entries.is_empty())
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &KeyName) -> StoreResult<bool> {
        Ok(self.lock("contains")?.entries.contains_key(key))
    }

    /// Snapshot of the current key set.
    pub fn keys(&self) -> StoreResult<Vec<KeyName>> {
        Ok(self.lock("keys")?.entries.keys().cloned().collect())
    }

    /// Copy of a key's bookkeeping entry, if present.
    pub fn entry(&self, key: &KeyName) -> StoreResult<Option<Entry>> {
        Ok(self.lock("entry")?.entries.get(key).cloned())
    }

    // ---- subscriptions ----------------------------------------------------

    /// Subscribe a callback to writes on an exact set of keys.
    pub fn subscribe<I>(
        &self,
        keys: I,
        callback: impl Fn(ChangeEvent) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId>
    where
        I: IntoIterator<Item = KeyName>,
    {
        self.register(
            SubscriptionFilter::Keys(keys.into_iter().collect()),
            Arc::new(callback),
        )
    }

    /// Subscribe a callback to every key matching a glob pattern
    /// (`*` = any run of characters, `?` = exactly one).
    pub fn subscribe_pattern(
        &self,
        glob: &str,
        callback: impl Fn(ChangeEvent) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        let pattern = KeyPattern::compile(glob)?;
        self.register(SubscriptionFilter::Pattern(pattern), Arc::new(callback))
    }

    fn register(
        &self,
        filter: SubscriptionFilter,
        callback: ChangeCallback,
    ) -> StoreResult<SubscriptionId> {
        let id = SubscriptionId::generate();
        let mut inner = self.lock("subscribe")?;
        inner
            .subscriptions
            .insert(id, Subscription { filter, callback });
        Ok(id)
    }

    /// Remove a subscription. Returns whether it existed. Events already
    /// handed to the dispatch pool are still delivered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<bool> {
        let mut inner = self.lock("unsubscribe")?;
        Ok(inner.subscriptions.remove(&id).is_some())
    }

    /// Remove `keys` from every exact-key subscription, dropping
    /// subscriptions whose key set becomes empty. Pattern subscriptions are
    /// untouched.
    pub fn unsubscribe_keys(&self, keys: &[KeyName]) -> StoreResult<()> {
        let removal: HashSet<&KeyName> = keys.iter().collect();
        let mut inner = self.lock("unsubscribe_keys")?;
        inner.subscriptions.retain(|_, sub| match &mut sub.filter {
            SubscriptionFilter::Keys(set) => {
                set.retain(|key| !removal.contains(key));
                !set.is_empty()
            }
            SubscriptionFilter::Pattern(_) => true,
        });
        Ok(())
    }

    // ---- scoped views -----------------------------------------------------

    /// A view of this store in which every key is transparently prefixed
    /// with `prefix:`.
    pub fn scoped(&self, prefix: &str) -> StoreResult<ScopedStore> {
        ScopedStore::new(self.clone(), prefix)
    }

    // ---- snapshot ---------------------------------------------------------

    /// JSON snapshot of the plain key/value table. Reserved state, waiters,
    /// and subscriptions are not part of the snapshot.
    pub fn snapshot(&self) -> StoreResult<String> {
        let inner = self.lock("snapshot")?;
        let table: HashMap<&str, &Value> = inner
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), &entry.value))
            .collect();
        serde_json::to_string(&table).map_err(|e| StoreError::InvalidKey {
            key: String::new(),
            reason: format!("snapshot serialization failed: {e}"),
        })
    }

    /// Replace the plain key/value table from a snapshot produced by
    /// [`ReactiveStore::snapshot`].
    pub fn restore(&self, snapshot: &str) -> StoreResult<()> {
        let table: HashMap<String, Value> =
            serde_json::from_str(snapshot).map_err(|e| StoreError::InvalidKey {
                key: String::new(),
                reason: format!("snapshot parsing failed: {e}"),
            })?;

        let mut entries = HashMap::with_capacity(table.len());
        for (raw, value) in table {
            let key = KeyName::parse(&raw).map_err(|e| StoreError::InvalidKey {
                key: raw.clone(),
                reason: e.to_string(),
            })?;
            entries.insert(key, Entry::new(value));
        }

        let mut inner = self.lock("restore")?;
        inner.entries = entries;
        Ok(())
    }

    // ---- reserved state ---------------------------------------------------
    //
    // Bookkeeping writes: no waiter wakeup, no subscriber notification.

    /// Copy of the ambient context bag.
    pub fn context(&self) -> StoreResult<Context> {
        Ok(self.lock("context")?.reserved.context.clone())
    }

    /// Replace the ambient context bag.
    pub fn set_context(&self, context: Context) -> StoreResult<()> {
        self.lock("set_context")?.reserved.context = context;
        Ok(())
    }

    /// Merge `overlay` into the ambient context bag, top-level key by key,
    /// with the overlay winning on collision.
    pub fn merge_context(&self, overlay: Context) -> StoreResult<()> {
        let mut inner = self.lock("merge_context")?;
        for (key, value) in overlay {
            inner.reserved.context.insert(key, value);
        }
        Ok(())
    }

    /// Append one record to the run history. The history is append-only and
    /// ordered by completion.
    pub fn push_record(&self, record: UnitRecord) -> StoreResult<()> {
        self.lock("push_record")?.reserved.records.push(record);
        Ok(())
    }

    /// Copy of the full record history.
    pub fn records(&self) -> StoreResult<Vec<UnitRecord>> {
        Ok(self.lock("records")?.reserved.records.clone())
    }

    /// Current record history length.
    pub fn records_len(&self) -> StoreResult<usize> {
        Ok(self.lock("records_len")?.reserved.records.len())
    }

    /// Records appended at or after `from` (a baseline index captured
    /// earlier with [`ReactiveStore::records_len`]).
    pub fn records_from(&self, from: usize) -> StoreResult<Vec<UnitRecord>> {
        let inner = self.lock("records_from")?;
        Ok(inner
            .reserved
            .records
            .get(from..)
            .map(<[UnitRecord]>::to_vec)
            .unwrap_or_default())
    }

    /// Pre-loaded conversation history.
    pub fn history(&self) -> StoreResult<Vec<UnitRecord>> {
        Ok(self.lock("history")?.reserved.history.clone())
    }

    /// Replace the pre-loaded conversation history.
    pub fn set_history(&self, history: Vec<UnitRecord>) -> StoreResult<()> {
        self.lock("set_history")?.reserved.history = history;
        Ok(())
    }

    /// The session/thread identifier, if one has been assigned.
    pub fn session_id(&self) -> StoreResult<Option<String>> {
        Ok(self.lock("session_id")?.reserved.session_id.clone())
    }

    /// Assign the session/thread identifier.
    pub fn set_session_id(&self, session_id: impl Into<String>) -> StoreResult<()> {
        self.lock("set_session_id")?.reserved.session_id = Some(session_id.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::UnitName;
    use serde_json::json;

    fn key(s: &str) -> KeyName {
        KeyName::new_unchecked(s)
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = ReactiveStore::new();
        store.set(key("k"), json!({"n": 1})).unwrap();
        assert_eq!(store.get(&key("k")).unwrap(), Some(json!({"n": 1})));
    }

    #[test]
    fn get_missing_key_is_none_not_error() {
        let store = ReactiveStore::new();
        assert_eq!(store.get(&key("absent")).unwrap(), None);
    }

    #[test]
    fn most_recent_write_wins() {
        let store = ReactiveStore::new();
        store.set(key("k"), json!(1)).unwrap();
        store.set(key("k"), json!(2)).unwrap();
        assert_eq!(store.get(&key("k")).unwrap(), Some(json!(2)));
    }

    #[test]
    fn entry_bookkeeping_tracks_access_and_updates() {
        let store = ReactiveStore::new();
        store.set(key("k"), json!(1)).unwrap();
        let created = store.entry(&key("k")).unwrap().unwrap().created_at;

        store.get(&key("k")).unwrap();
        store.get(&key("k")).unwrap();
        store.set(key("k"), json!(2)).unwrap();

        let entry = store.entry(&key("k")).unwrap().unwrap();
        assert_eq!(entry.access_count, 2);
        assert_eq!(entry.created_at, created);
        assert!(entry.updated_at >= created);
    }

    #[test]
    fn delete_returns_removed_value() {
        let store = ReactiveStore::new();
        store.set(key("k"), json!("v")).unwrap();
        assert_eq!(store.delete(&key("k")).unwrap(), Some(json!("v")));
        assert_eq!(store.get(&key("k")).unwrap(), None);
        assert_eq!(store.delete(&key("k")).unwrap(), None);
    }

    #[test]
    fn reserved_keys_are_rejected_on_both_planes() {
        let store = ReactiveStore::new();
        assert!(matches!(
            store.delete(&key("results")),
            Err(StoreError::ReservedKey { .. })
        ));
        assert!(matches!(
            store.set(key("context"), json!({})),
            Err(StoreError::ReservedKey { .. })
        ));
        // The store is unchanged either way.
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn clear_drops_entries_but_keeps_reserved_state() {
        let store = ReactiveStore::new();
        store.set(key("a"), json!(1)).unwrap();
        store
            .push_record(UnitRecord::new(UnitName::new_unchecked("u"), json!(null)))
            .unwrap();

        store.clear().unwrap();

        assert!(store.is_empty().unwrap());
        assert_eq!(store.records_len().unwrap(), 1);
    }

    #[test]
    fn await_key_returns_immediately_when_present() {
        let store = ReactiveStore::new();
        store.set(key("k"), json!("v")).unwrap();
        let value = store
            .await_key(&key("k"), Wait::Timeout(Duration::from_millis(10)))
            .unwrap();
        assert_eq!(value, json!("v"));
    }

    #[test]
    fn await_key_timeout_raises_and_deregisters() {
        let store = ReactiveStore::new();
        let result = store.await_key(&key("never"), Wait::Timeout(Duration::from_millis(50)));
        assert!(matches!(result, Err(StoreError::AwaitTimeout { .. })));

        // The abandoned waiter is gone; a late write must not crash and must
        // not deliver anywhere.
        store.set(key("never"), json!("late")).unwrap();
        assert_eq!(store.get(&key("never")).unwrap(), Some(json!("late")));
    }

    #[test]
    fn merge_context_overwrites_per_top_level_key() {
        let store = ReactiveStore::new();
        let mut base = Context::new();
        base.insert("keep".to_string(), json!(1));
        base.insert("swap".to_string(), json!("old"));
        store.set_context(base).unwrap();

        let mut overlay = Context::new();
        overlay.insert("swap".to_string(), json!("new"));
        overlay.insert("add".to_string(), json!(true));
        store.merge_context(overlay).unwrap();

        let context = store.context().unwrap();
        assert_eq!(context.get("keep"), Some(&json!(1)));
        assert_eq!(context.get("swap"), Some(&json!("new")));
        assert_eq!(context.get("add"), Some(&json!(true)));
    }

    #[test]
    fn records_from_baseline() {
        let store = ReactiveStore::new();
        let record = |n: &str| UnitRecord::new(UnitName::new_unchecked(n), json!(null));
        store.push_record(record("a")).unwrap();

        let baseline = store.records_len().unwrap();
        store.push_record(record("b")).unwrap();
        store.push_record(record("c")).unwrap();

        let appended = store.records_from(baseline).unwrap();
        let names: Vec<_> = appended.iter().map(|r| r.unit_name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
        assert!(store.records_from(99).unwrap().is_empty());
    }

    #[test]
    fn snapshot_restore_round_trips_entries() {
        let store = ReactiveStore::new();
        store.set(key("a"), json!(1)).unwrap();
        store.set(key("b"), json!({"x": true})).unwrap();

        let snapshot = store.snapshot().unwrap();
        let other = ReactiveStore::new();
        other.restore(&snapshot).unwrap();

        assert_eq!(other.get(&key("a")).unwrap(), Some(json!(1)));
        assert_eq!(other.get(&key("b")).unwrap(), Some(json!({"x": true})));
    }

    #[test]
    fn unsubscribe_keys_prunes_exact_subscriptions() {
        let store = ReactiveStore::new();
        let id = store.subscribe([key("a"), key("b")], |_| {}).unwrap();
        store.unsubscribe_keys(&[key("a")]).unwrap();
        // Still subscribed through "b".
        assert!(store.unsubscribe(id).unwrap());

        let id = store.subscribe([key("a")], |_| {}).unwrap();
        store.unsubscribe_keys(&[key("a")]).unwrap();
        // Key set emptied, subscription dropped eagerly.
        assert!(!store.unsubscribe(id).unwrap());
    }
}
