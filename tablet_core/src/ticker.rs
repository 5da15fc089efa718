//! Scheduler for the timed filter chain.
//!
//! One thread ticks the chain at the configured interval and keeps only the
//! newest output for the consumer. Interval changes requested from any thread
//! are applied between ticks.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use tablet_traits::clock::Clock;

use crate::filter::TimedFilterChain;
use crate::state::PointerState;
use crate::util::{interval_from_ms, interval_ms};

fn as_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX).max(1)
}

pub struct Ticker {
    rx: xch::Receiver<PointerState>,
    interval_us: Arc<AtomicU64>,
    ticks: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<C: Clock + Send + Sync + 'static>(
        mut chain: TimedFilterChain,
        interval: Duration,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(1);
        let stale = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let interval_us = Arc::new(AtomicU64::new(as_micros(interval)));
        let interval_clone = interval_us.clone();
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = ticks.clone();

        let join_handle = std::thread::spawn(move || {
            let mut current_us = as_micros(interval_from_ms(chain.interval_ms()));
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Ticker thread received shutdown signal");
                    break;
                }

                let requested_us = interval_clone.load(Ordering::Relaxed);
                if requested_us != current_us {
                    chain.on_tick_interval_changed(interval_ms(Duration::from_micros(requested_us)));
                    current_us = requested_us;
                }

                if let Some(out) = chain.on_tick() {
                    // Latest value wins: replace an unread output.
                    // `stale` keeps the channel connected, so only Full can occur.
                    if let Err(xch::TrySendError::Full(out)) = tx.try_send(out) {
                        let _ = stale.try_recv();
                        let _ = tx.try_send(out);
                    }
                }
                ticks_clone.fetch_add(1, Ordering::Relaxed);

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(Duration::from_micros(current_us));
            }
            tracing::trace!("Ticker thread exiting cleanly");
        });

        Self {
            rx,
            interval_us,
            ticks,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest chain output not yet taken.
    pub fn latest(&self) -> Option<PointerState> {
        self.rx.try_iter().last()
    }

    /// Request a new tick interval; applied before the next tick.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_us
            .store(as_micros(interval), Ordering::Relaxed);
    }

    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us.load(Ordering::Relaxed))
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Ticker thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "Ticker thread panicked during shutdown");
                }
            }
        }
    }
}
