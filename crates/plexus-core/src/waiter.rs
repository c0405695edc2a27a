//! One-shot broadcast rendezvous primitive
//!
//! A [`Waiter`] lets any number of threads block until a single value is
//! delivered via [`Waiter::signal`]. Every thread already blocked in
//! [`Waiter::wait`] receives a clone of the same value (broadcast wake, not
//! single-wake). A waiter is single-use: once signaled it stays signaled and
//! later `wait` calls return the delivered value immediately.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Outcome of a [`Waiter::wait`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The waiter was signaled and this is the delivered value.
    Delivered(Value),
    /// The timeout elapsed before any signal arrived.
    ///
    /// The caller owns cleanup: whatever registry holds this waiter must be
    /// told to drop it, otherwise the registration leaks. A signal that races
    /// with an expiring timeout may be lost for that particular caller; that
    /// is accepted behavior.
    TimedOut,
}

#[derive(Debug, Default)]
struct WaiterState {
    delivered: bool,
    value: Option<Value>,
}

/// One-shot, broadcast-capable blocking rendezvous.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use plexus_core::{WaitOutcome, Waiter};
///
/// let waiter = Arc::new(Waiter::new());
/// let handle = {
///     let waiter = Arc::clone(&waiter);
///     std::thread::spawn(move || waiter.wait(None))
/// };
/// waiter.signal(serde_json::json!("ready"));
/// assert_eq!(
///     handle.join().unwrap(),
///     WaitOutcome::Delivered(serde_json::json!("ready"))
/// );
/// ```
#[derive(Debug, Default)]
pub struct Waiter {
    state: Mutex<WaiterState>,
    cond: Condvar,
}

impl Waiter {
    /// Create a new, unsignaled waiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the waiter is signaled, or until `timeout` elapses.
    ///
    /// With `None` this blocks indefinitely. With a timeout, the deadline is
    /// measured from entry; spurious condition-variable wakeups re-check the
    /// remaining budget instead of restarting it.
    pub fn wait(&self, timeout: Option<Duration>) -> WaitOutcome {
        let mut state = self.lock_state();

        match timeout {
            None => {
                while !state.delivered {
                    state = self
                        .cond
                        .wait(state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !state.delivered {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return WaitOutcome::TimedOut;
                    }
                    state = self
                        .cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0;
                }
            }
        }

        WaitOutcome::Delivered(state.value.clone().unwrap_or(Value::Null))
    }

    /// Deliver `value` and wake every thread blocked in [`Waiter::wait`].
    ///
    /// The first delivered value wins; signaling an already-signaled waiter
    /// is a no-op so every waiter observes one consistent value.
    pub fn signal(&self, value: Value) {
        let mut state = self.lock_state();
        if state.delivered {
            return;
        }
        state.delivered = true;
        state.value = Some(value);
        self.cond.notify_all();
    }

    /// Whether a value has already been delivered.
    pub fn is_signaled(&self) -> bool {
        self.lock_state().delivered
    }

    fn lock_state(&self) -> MutexGuard<'_, WaiterState> {
        // State is a flag plus a value, so a panic while holding the lock
        // cannot leave it torn; recover from poisoning instead of spreading
        // Results through every wait path.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_returns_signaled_value() {
        let waiter = Arc::new(Waiter::new());
        let handle = {
            let waiter = Arc::clone(&waiter);
            thread::spawn(move || waiter.wait(None))
        };

        // Give the waiter a moment to block before signaling.
        thread::sleep(Duration::from_millis(20));
        waiter.signal(json!(42));

        assert_eq!(handle.join().unwrap(), WaitOutcome::Delivered(json!(42)));
    }

    #[test]
    fn broadcast_wakes_every_waiter() {
        let waiter = Arc::new(Waiter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let waiter = Arc::clone(&waiter);
                thread::spawn(move || waiter.wait(None))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        waiter.signal(json!("done"));

        for handle in handles {
            assert_eq!(
                handle.join().unwrap(),
                WaitOutcome::Delivered(json!("done"))
            );
        }
    }

    #[test]
    fn timeout_elapses_without_signal() {
        let waiter = Waiter::new();
        let outcome = waiter.wait(Some(Duration::from_millis(30)));
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(!waiter.is_signaled());
    }

    #[test]
    fn second_signal_keeps_first_value() {
        let waiter = Waiter::new();
        waiter.signal(json!("first"));
        waiter.signal(json!("second"));
        assert!(waiter.is_signaled());
        assert_eq!(waiter.wait(None), WaitOutcome::Delivered(json!("first")));
    }

    #[test]
    fn wait_after_signal_returns_immediately() {
        let waiter = Waiter::new();
        waiter.signal(json!(true));
        assert_eq!(
            waiter.wait(Some(Duration::from_millis(1))),
            WaitOutcome::Delivered(json!(true))
        );
    }
}
