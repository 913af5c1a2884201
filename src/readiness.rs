use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(3000);

/// One-shot, bounded-wait signal used to align UI-loop bring-up with the
/// invoking command context. Single writer, single reader. Calling `signal`
/// a second time is a no-op; a wait that times out never observes a signal
/// that arrives afterwards.
#[derive(Clone)]
pub struct ReadinessGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self { inner: Arc::new(GateInner { signaled: Mutex::new(false), condvar: Condvar::new() }) }
    }

    pub fn signal(&self) {
        let mut signaled = match self.inner.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *signaled {
            eprintln!("[gate] duplicate signal ignored");
            return;
        }
        *signaled = true;
        self.inner.condvar.notify_all();
    }

    /// Blocks until signaled or `timeout` elapses. Returns whether the
    /// signal was observed before the deadline. A timed-out wait is
    /// terminal for this call; no retry happens here.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = match self.inner.signaled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = match self.inner.condvar.wait_timeout(signaled, deadline - now) {
                Ok(pair) => pair,
                Err(poisoned) => {
                    let pair = poisoned.into_inner();
                    (pair.0, pair.1)
                }
            };
            signaled = guard;
            if result.timed_out() && !*signaled {
                return false;
            }
        }
        true
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
