use std::thread;
use std::time::{Duration, Instant};

/// Time source for report timestamps, filter gaps and the worker threads.
///
/// Tests swap in `test_clock::TestClock` so smoothing gaps and tick loops run
/// without real sleeps.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::{Clock, Duration, Instant};

    /// Manually driven clock for deterministic filter and decoder tests.
    ///
    /// `sleep` advances time instead of blocking. Clones share one offset, so
    /// a clone handed to a filter moves together with the one kept by the test.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset_us: Arc<AtomicU64>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset_us: Arc::new(AtomicU64::new(0)),
            }
        }

        pub fn advance(&self, d: Duration) {
            let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
            let _ = self
                .offset_us
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                    Some(cur.saturating_add(us))
                });
        }

        pub fn advance_ms(&self, ms: u64) {
            self.advance(Duration::from_millis(ms));
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + Duration::from_micros(self.offset_us.load(Ordering::Acquire))
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}
