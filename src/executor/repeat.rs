//! Repeat directive and the cancellation token that bounds open-ended repeats.

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Replay request returned by the `repeat` capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatDirective {
    /// Wait before each replay.
    pub rest: Duration,
    /// Number of replays; `None` repeats until cancelled.
    pub times: Option<u64>,
}

impl RepeatDirective {
    pub fn new(rest: Duration, times: Option<u64>) -> Self {
        Self { rest, times }
    }

    /// Build from a rest given in seconds. Negative, non-finite and
    /// out-of-range values are rejected.
    pub fn from_secs(rest: f64, times: Option<u64>) -> Result<Self, String> {
        Duration::try_from_secs_f64(rest)
            .map(|rest| Self::new(rest, times))
            .map_err(|e| format!("rest must be a non-negative number of seconds, got {}: {}", rest, e))
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

/// Shared flag that stops open-ended repeats and wakes any rest wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.inner.cancelled.lock() = true;
        self.inner.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Clear a previous cancellation so the next run can proceed.
    pub fn reset(&self) {
        *self.inner.cancelled.lock() = false;
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` when the
    /// wait ended because of cancellation.
    pub fn wait(&self, duration: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        // Past the representable range only cancellation can end the wait.
        let Some(deadline) = Instant::now().checked_add(duration) else {
            while !*cancelled {
                self.inner.signal.wait(&mut cancelled);
            }
            return false;
        };
        while !*cancelled {
            if self
                .inner
                .signal
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                return !*cancelled;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rest_seconds_validated() {
        let directive = RepeatDirective::from_secs(0.25, Some(1)).unwrap();
        assert_eq!(directive.rest, Duration::from_millis(250));
        assert!(RepeatDirective::from_secs(-3.0, None).is_err());
        assert!(RepeatDirective::from_secs(1e20, None).is_err());
        assert!(RepeatDirective::from_secs(f64::NAN, None).is_err());
    }

    #[test]
    fn test_unbounded_wait_ends_on_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        assert!(!token.wait(Duration::MAX));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_elapses_without_cancel() {
        let token = CancelToken::new();
        assert!(token.wait(Duration::from_millis(10)));
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let started = Instant::now();
        assert!(!token.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();

        token.reset();
        assert!(!token.is_cancelled());
    }
}
