//! Cooperative shutdown signal
//!
//! Worker threads check the signal between units of work and wake from timed
//! waits when it fires. The signal is clonable; any holder may trigger it.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    triggered: Mutex<bool>,
    condvar: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal shutdown and wake all waiters. Idempotent.
    pub fn trigger(&self) {
        let mut triggered = self
            .inner
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *triggered = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self
            .inner
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`, returning early if the signal fires.
    ///
    /// Returns true when shutdown was triggered, false when the full timeout
    /// elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self
            .inner
            .triggered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while !*triggered {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .condvar
                .wait_timeout(triggered, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            triggered = guard;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untriggered_wait_times_out() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(!shutdown.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_trigger_wakes_waiter() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();

        let handle = std::thread::spawn(move || waiter.wait_timeout(Duration::from_secs(10)));

        shutdown.trigger();
        assert!(handle.join().unwrap());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.wait_timeout(Duration::ZERO));
    }
}
