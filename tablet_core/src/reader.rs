//! Background report reading.
//!
//! Spawns a thread that owns the `Tablet`, decodes every report, runs the
//! report filter chain on valid states and publishes them to the timed chain.
//!
//! Each `ReportReader` spawns exactly one thread, shut down when the reader
//! is dropped: the shutdown flag is set and the session closed so a blocked
//! read returns.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tablet_traits::{CloseSignal, DeviceSession};

use crate::decoder::ReportStatus;
use crate::error::TabletError;
use crate::filter::{ReportFilterChain, TargetPublisher};
use crate::measurement::MeasurementSink;
use crate::tablet::Tablet;

/// Consecutive failed reads after which the device is treated as lost.
/// hidapi reports an unplug as a generic error, not a disconnect.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// First retry delay after a failed read; doubles up to `MAX_RETRY_DELAY`.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(2);
const MAX_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Per-outcome report counters, updated by the read thread.
#[derive(Debug, Default)]
pub struct ReaderStats {
    valid: AtomicU64,
    invalid: AtomicU64,
    position_invalid: AtomicU64,
    ignored: AtomicU64,
    transport_failures: AtomicU64,
}

/// Point-in-time copy of `ReaderStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderCounts {
    pub valid: u64,
    pub invalid: u64,
    pub position_invalid: u64,
    pub ignored: u64,
    pub transport_failures: u64,
}

impl ReaderStats {
    fn record(&self, status: &ReportStatus) {
        let counter = match status {
            ReportStatus::Valid(_) => &self.valid,
            ReportStatus::Invalid => &self.invalid,
            ReportStatus::PositionInvalid => &self.position_invalid,
            ReportStatus::Ignore => &self.ignored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReaderCounts {
        ReaderCounts {
            valid: self.valid.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            position_invalid: self.position_invalid.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}

pub struct ReportReader {
    stats: Arc<ReaderStats>,
    close: CloseSignal,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ReportReader {
    /// Spawn the read thread. `sink`, when given, receives positions while it
    /// reports itself active (measurement mode).
    pub fn spawn<S: DeviceSession + 'static>(
        mut tablet: Tablet<S>,
        mut report_chain: ReportFilterChain,
        publisher: TargetPublisher,
        mut sink: Option<Box<dyn MeasurementSink + Send>>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let stats = Arc::new(ReaderStats::default());
        let stats_clone = stats.clone();
        let close = tablet.close_signal();

        let join_handle = std::thread::spawn(move || {
            let clock = tablet.clock().clone();
            let mut failures = 0u32;
            let mut retry_delay = INITIAL_RETRY_DELAY;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Reader thread received shutdown signal");
                    break;
                }

                let sink_ref = sink.as_deref_mut().map(|s| s as &mut dyn MeasurementSink);
                match tablet.read_position(sink_ref) {
                    Ok(status) => {
                        failures = 0;
                        retry_delay = INITIAL_RETRY_DELAY;
                        stats_clone.record(&status);
                        if let ReportStatus::Valid(state) = status {
                            let out = report_chain.on_report(state);
                            // If publish fails, the tick side is gone; exit gracefully
                            if !publisher.publish(out) {
                                tracing::debug!("Reader consumer disconnected, exiting thread");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        let lost = e
                            .downcast_ref::<TabletError>()
                            .is_some_and(TabletError::is_device_lost);
                        if lost || !tablet.is_open() {
                            tracing::debug!(tablet = %tablet.name(), error = %e, "device lost, reader exiting");
                            break;
                        }
                        stats_clone
                            .transport_failures
                            .fetch_add(1, Ordering::Relaxed);
                        failures += 1;
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            tracing::warn!(
                                tablet = %tablet.name(),
                                failures,
                                error = %e,
                                "repeated read failures, treating device as lost"
                            );
                            break;
                        }
                        tracing::warn!(tablet = %tablet.name(), failures, error = %e, "tablet read failed");
                        clock.sleep(retry_delay);
                        retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                    }
                }
            }
            tracing::trace!("Reader thread exiting cleanly");
        });

        Self {
            stats,
            close,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn stats(&self) -> ReaderCounts {
        self.stats.snapshot()
    }

    /// True once the thread exited (device lost or consumer gone).
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }
}

impl Drop for ReportReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Unblock a read waiting for the next report.
        self.close.close();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Reader thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "Reader thread panicked during shutdown");
                }
            }
        }
    }
}
