use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How a thread waits for the other side of the handshake.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WaitStrategy {
    /// Sleep on a condition variable, re-checking at least once per poll interval.
    #[default]
    Condvar,

    /// Sleep for the poll interval and re-check; for callback threads that
    /// must not block on arbitrary primitives.
    Poll,
}

impl WaitStrategy {
    /// Parses `"condvar"` or `"poll"` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "condvar" => Some(Self::Condvar),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }
}

/// Wake-up channel between the host thread and the render thread.
///
/// State lives in atomics owned by the caller; the signal only carries
/// "something changed". Notifiers take the mutex before notifying and waiters
/// evaluate their predicate while holding it, so a wake-up cannot slip in
/// between the check and the wait.
#[derive(Debug)]
pub struct Signal {
    strategy: WaitStrategy,
    interval: Duration,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Signal {
    pub fn new(strategy: WaitStrategy, interval: Duration) -> Self {
        Self {
            strategy,
            interval: interval.max(Duration::from_millis(1)),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    pub fn strategy(&self) -> WaitStrategy {
        self.strategy
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wakes every waiter so it re-evaluates its predicate.
    pub fn notify(&self) {
        if self.strategy == WaitStrategy::Condvar {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.cond.notify_all();
        }
    }

    /// Blocks until `ready` returns true or `timeout` elapses.
    ///
    /// Returns whether `ready` was observed true. `None` waits forever.
    pub fn wait_until(&self, timeout: Option<Duration>, mut ready: impl FnMut() -> bool) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let remaining = |deadline: Option<Instant>| -> Option<Duration> {
            match deadline {
                None => Some(self.interval),
                Some(d) => {
                    let left = d.saturating_duration_since(Instant::now());
                    (!left.is_zero()).then(|| left.min(self.interval))
                }
            }
        };

        match self.strategy {
            WaitStrategy::Poll => loop {
                if ready() {
                    return true;
                }
                let Some(step) = remaining(deadline) else {
                    return false;
                };
                std::thread::sleep(step);
            },

            WaitStrategy::Condvar => {
                let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    if ready() {
                        return true;
                    }
                    let Some(step) = remaining(deadline) else {
                        return false;
                    };
                    guard = match self.cond.wait_timeout(guard, step) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    };
                }
            }
        }
    }
}
