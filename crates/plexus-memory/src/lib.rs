//! # Plexus Memory
//!
//! Reactive shared memory for the Plexus coordination runtime.
//!
//! The centerpiece is [`ReactiveStore`]: a thread-safe key/value table that
//! supports non-blocking reads, race-free blocking reads (a reader can wait
//! for a value another unit will eventually write), and asynchronous change
//! notification to exact-key and glob-pattern subscribers. Scoped views
//! ([`ScopedStore`]) prefix keys transparently for namespace isolation.
//!
//! Concurrency contract: a single mutex protects the backing table, the
//! waiter registry, and the subscription registry. Waiter wakeup and
//! subscriber dispatch always happen *after* that lock is released, so a slow
//! or reentrant callback can neither block other writers nor deadlock the
//! store.

mod dispatch;
mod entry;
mod event;
mod pattern;
mod reserved;
mod scoped;
mod store;
mod subscription;

pub use entry::Entry;
pub use event::ChangeEvent;
pub use pattern::KeyPattern;
pub use reserved::ReservedKey;
pub use scoped::ScopedStore;
pub use store::{ReactiveStore, Wait};
pub use subscription::SubscriptionId;
