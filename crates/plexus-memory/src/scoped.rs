//! Scoped store views
//!
//! A [`ScopedStore`] wraps a shared [`ReactiveStore`] handle and prefixes
//! every key with `prefix:`, giving callers namespace isolation without a
//! separate table. Blocking reads, subscriptions, and writes all go through
//! the same underlying store, so a scoped reader can still rendezvous with an
//! unscoped writer that uses the full key.

use std::collections::HashMap;

use plexus_core::{KeyName, StoreError, StoreResult};
use serde_json::Value;

use crate::event::ChangeEvent;
use crate::store::{ReactiveStore, Wait};
use crate::subscription::SubscriptionId;

/// A prefix-transparent view over a shared store.
#[derive(Clone)]
pub struct ScopedStore {
    store: ReactiveStore,
    prefix: String,
}

impl ScopedStore {
    pub(crate) fn new(store: ReactiveStore, prefix: &str) -> StoreResult<Self> {
        let prefix = KeyName::parse(prefix)
            .map_err(|e| StoreError::InvalidKey {
                key: prefix.to_string(),
                reason: e.to_string(),
            })?
            .into_string();
        Ok(Self { store, prefix })
    }

    /// The namespace prefix of this view.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying unscoped store.
    pub fn inner(&self) -> &ReactiveStore {
        &self.store
    }

    /// A nested view; prefixes compose as `outer:inner:key`.
    pub fn scoped(&self, prefix: &str) -> StoreResult<ScopedStore> {
        self.store.scoped(&format!("{}:{}", self.prefix, prefix))
    }

    fn wrap_key(&self, key: &KeyName) -> StoreResult<KeyName> {
        let wrapped = format!("{}:{}", self.prefix, key.as_str());
        KeyName::parse(&wrapped).map_err(|e| StoreError::InvalidKey {
            key: wrapped,
            reason: e.to_string(),
        })
    }

    /// Write under the prefixed key. See [`ReactiveStore::set`].
    pub fn set(&self, key: KeyName, value: Value) -> StoreResult<Value> {
        self.store.set(self.wrap_key(&key)?, value)
    }

    /// Non-blocking read of the prefixed key.
    pub fn get(&self, key: &KeyName) -> StoreResult<Option<Value>> {
        self.store.get(&self.wrap_key(key)?)
    }

    /// Blocking read of the prefixed key. See [`ReactiveStore::await_key`].
    pub fn await_key(&self, key: &KeyName, wait: Wait) -> StoreResult<Value> {
        self.store.await_key(&self.wrap_key(key)?, wait)
    }

    /// Blocking read over several prefixed keys. The returned map is keyed
    /// by the caller's unprefixed keys.
    pub fn await_keys(
        &self,
        keys: &[KeyName],
        wait: Wait,
    ) -> StoreResult<HashMap<KeyName, Value>> {
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            values.insert(key.clone(), self.await_key(key, wait)?);
        }
        Ok(values)
    }

    /// Delete the prefixed key.
    pub fn delete(&self, key: &KeyName) -> StoreResult<Option<Value>> {
        self.store.delete(&self.wrap_key(key)?)
    }

    /// Whether the prefixed key holds a value.
    pub fn contains(&self, key: &KeyName) -> StoreResult<bool> {
        self.store.contains(&self.wrap_key(key)?)
    }

    /// Subscribe to writes on an exact set of prefixed keys. Delivered
    /// events carry the full prefixed key.
    pub fn subscribe<I>(
        &self,
        keys: I,
        callback: impl Fn(ChangeEvent) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId>
    where
        I: IntoIterator<Item = KeyName>,
    {
        let wrapped: Vec<KeyName> = keys
            .into_iter()
            .map(|key| self.wrap_key(&key))
            .collect::<StoreResult<_>>()?;
        self.store.subscribe(wrapped, callback)
    }

    /// Subscribe to every key in this namespace matching `glob`.
    pub fn subscribe_pattern(
        &self,
        glob: &str,
        callback: impl Fn(ChangeEvent) + Send + Sync + 'static,
    ) -> StoreResult<SubscriptionId> {
        self.store
            .subscribe_pattern(&format!("{}:{}", self.prefix, glob), callback)
    }

    /// Remove a subscription created through this (or any) view.
    pub fn unsubscribe(&self, id: SubscriptionId) -> StoreResult<bool> {
        self.store.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(s: &str) -> KeyName {
        KeyName::new_unchecked(s)
    }

    #[test]
    fn scoped_keys_are_prefixed_transparently() {
        let store = ReactiveStore::new();
        let scope = store.scoped("tenant").unwrap();

        scope.set(key("value"), json!(1)).unwrap();

        assert_eq!(scope.get(&key("value")).unwrap(), Some(json!(1)));
        assert_eq!(store.get(&key("tenant:value")).unwrap(), Some(json!(1)));
        assert_eq!(store.get(&key("value")).unwrap(), None);
    }

    #[test]
    fn nested_scopes_compose() {
        let store = ReactiveStore::new();
        let inner = store.scoped("a").unwrap().scoped("b").unwrap();

        inner.set(key("k"), json!("v")).unwrap();
        assert_eq!(store.get(&key("a:b:k")).unwrap(), Some(json!("v")));
        assert_eq!(inner.prefix(), "a:b");
    }

    #[test]
    fn scoped_reader_meets_unscoped_writer() {
        let store = ReactiveStore::new();
        let scope = store.scoped("ns").unwrap();

        let handle = {
            let scope = scope.clone();
            std::thread::spawn(move || scope.await_key(&key("k"), Wait::Forever))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        store.set(key("ns:k"), json!("shared")).unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), json!("shared"));
    }

    #[test]
    fn invalid_prefix_is_rejected() {
        let store = ReactiveStore::new();
        assert!(matches!(
            store.scoped("bad prefix"),
            Err(StoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn overlong_wrapped_key_is_rejected() {
        let store = ReactiveStore::new();
        let scope = store.scoped("p").unwrap();
        let long = KeyName::new_unchecked("a".repeat(128));
        assert!(matches!(
            scope.get(&long),
            Err(StoreError::InvalidKey { .. })
        ));
    }
}
