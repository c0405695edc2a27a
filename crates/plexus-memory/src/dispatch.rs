//! Asynchronous subscriber dispatch
//!
//! A small fixed pool of worker threads delivers [`ChangeEvent`]s to
//! subscriber callbacks. Writers never run callbacks themselves and never
//! block on a slow subscriber; they only enqueue.
//!
//! Events for one subscription are routed to a single lane (chosen by hashing
//! the subscription id), so a given subscriber observes its events in write
//! order even though different subscribers may be served in parallel.

use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Sender, channel};
use std::thread::JoinHandle;

use tracing::warn;

use crate::event::ChangeEvent;
use crate::subscription::{ChangeCallback, SubscriptionId};

struct Job {
    subscription: SubscriptionId,
    callback: ChangeCallback,
    event: ChangeEvent,
}

pub(crate) struct Dispatcher {
    lanes: Vec<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn `workers` lane threads (at least one).
    pub(crate) fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let mut lanes = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let (tx, rx) = channel::<Job>();
            let handle = std::thread::Builder::new()
                .name(format!("plexus-dispatch-{index}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let key = job.event.key.clone();
                        let outcome = catch_unwind(AssertUnwindSafe(|| (job.callback)(job.event)));
                        if outcome.is_err() {
                            warn!(
                                subscription = %job.subscription,
                                key = %key,
                                "subscriber callback panicked; event dropped for this subscriber"
                            );
                        }
                    }
                })
                .expect("failed to spawn dispatch worker");
            lanes.push(tx);
            handles.push(handle);
        }

        Self {
            lanes,
            workers: handles,
        }
    }

    /// Enqueue one event for one subscription. Never blocks.
    pub(crate) fn dispatch(
        &self,
        subscription: SubscriptionId,
        callback: ChangeCallback,
        event: ChangeEvent,
    ) {
        let lane = self.lane_for(subscription);
        // Send fails only while shutting down; pending events are dropped then.
        let _ = self.lanes[lane].send(Job {
            subscription,
            callback,
            event,
        });
    }

    fn lane_for(&self, subscription: SubscriptionId) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        subscription.hash(&mut hasher);
        (hasher.finish() as usize) % self.lanes.len()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the lanes lets each worker drain its queue and exit.
        self.lanes.clear();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use plexus_core::KeyName;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn event(key: &str, value: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            key: KeyName::new_unchecked(key),
            value,
            previous: None,
            writer: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn events_for_one_subscription_stay_ordered() {
        let dispatcher = Dispatcher::new(4);
        let (tx, rx) = channel();
        let callback: ChangeCallback = Arc::new(move |event: ChangeEvent| {
            tx.send(event.value).unwrap();
        });
        let id = SubscriptionId::generate();

        for i in 0..16 {
            dispatcher.dispatch(id, Arc::clone(&callback), event("counter", json!(i)));
        }

        for i in 0..16 {
            let value = rx.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(value, json!(i));
        }
    }

    #[test]
    fn panicking_callback_does_not_poison_the_lane() {
        let dispatcher = Dispatcher::new(1);
        let panicking: ChangeCallback = Arc::new(|_| panic!("boom"));
        let (tx, rx) = channel();
        let healthy: ChangeCallback = Arc::new(move |event: ChangeEvent| {
            tx.send(event.value).unwrap();
        });

        dispatcher.dispatch(SubscriptionId::generate(), panicking, event("k", json!(1)));
        dispatcher.dispatch(SubscriptionId::generate(), healthy, event("k", json!(2)));

        let value = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(value, json!(2));
    }

    #[test]
    fn drop_drains_pending_events() {
        let (tx, rx) = channel();
        {
            let dispatcher = Dispatcher::new(2);
            let callback: ChangeCallback = Arc::new(move |event: ChangeEvent| {
                tx.send(event.value).unwrap();
            });
            let id = SubscriptionId::generate();
            for i in 0..8 {
                dispatcher.dispatch(id, Arc::clone(&callback), event("k", json!(i)));
            }
        }
        // Dispatcher is gone; every queued event must have been delivered.
        assert_eq!(rx.iter().count(), 8);
    }
}
