//! Device sessions for tablets.
//!
//! `SimulatedSession` is fed reports through a channel and stands in for the
//! USB/HID transports in tests, replay runs and fuzzing. With the `hardware`
//! feature, `hid::HidSession` talks to a real device through `hidapi`.
pub mod error;
#[cfg(feature = "hardware")]
pub mod hid;
pub mod util;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use tablet_traits::{CloseSignal, DeviceSession, SessionError, SessionKind};

use crate::error::HwError;

/// Pipe id the USB transport reads reports from.
pub const DEFAULT_USB_PIPE_ID: u8 = 0x81;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Producer side of a simulated session: every pushed buffer is one report.
#[derive(Debug, Clone)]
pub struct ReportFeed {
    tx: xch::Sender<Vec<u8>>,
}

impl ReportFeed {
    /// Queue a report. Returns false once the session is gone.
    pub fn push(&self, report: impl Into<Vec<u8>>) -> bool {
        self.tx.send(report.into()).is_ok()
    }
}

/// Simulated tablet transport.
///
/// Reads block until a report is pushed through the matching `ReportFeed`, the
/// feed is dropped (disconnect) or the session is closed.
pub struct SimulatedSession {
    kind: SessionKind,
    rx: xch::Receiver<Vec<u8>>,
    close: CloseSignal,
    reading: AtomicBool,
    reads: AtomicUsize,
    strings: HashMap<u8, String>,
    writes: Mutex<Vec<Vec<u8>>>,
    features: Mutex<Vec<Vec<u8>>>,
    string_requests: Mutex<Vec<u8>>,
}

impl SimulatedSession {
    pub fn new(kind: SessionKind) -> (Self, ReportFeed) {
        let (tx, rx) = xch::unbounded();
        let session = Self {
            kind,
            rx,
            close: CloseSignal::new(),
            reading: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            strings: HashMap::new(),
            writes: Mutex::new(Vec::new()),
            features: Mutex::new(Vec::new()),
            string_requests: Mutex::new(Vec::new()),
        };
        tracing::debug!(?kind, "simulated session open");
        (session, ReportFeed { tx })
    }

    pub fn usb(pipe_id: u8) -> (Self, ReportFeed) {
        Self::new(SessionKind::Usb { pipe_id })
    }

    pub fn hid(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> (Self, ReportFeed) {
        Self::new(SessionKind::Hid {
            vendor_id,
            product_id,
            usage_page,
            usage,
        })
    }

    /// A session whose open failed: permanently closed, every operation fails.
    pub fn failed(kind: SessionKind) -> Self {
        let (session, _feed) = Self::new(kind);
        session.close.close();
        session
    }

    /// Register a string descriptor returned by `string_request(id)`.
    pub fn with_string(mut self, id: u8, value: impl Into<String>) -> Self {
        self.strings.insert(id, value.into());
        self
    }

    /// Output reports written so far.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Feature reports sent so far.
    pub fn features(&self) -> Vec<Vec<u8>> {
        self.features.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// String descriptor ids requested so far, in order.
    pub fn string_requests(&self) -> Vec<u8> {
        self.string_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of completed reads.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), HwError> {
        if self.close.is_closed() {
            Err(HwError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Clears the in-flight flag when a read returns, on every path.
struct ReadingGuard<'a>(&'a AtomicBool);

impl<'a> ReadingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ReadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DeviceSession for SimulatedSession {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    fn is_open(&self) -> bool {
        !self.close.is_closed()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, SessionError> {
        self.ensure_open()?;
        let _guard = ReadingGuard::enter(&self.reading);
        let report = util::wait_for_report(&self.rx, || self.close.is_closed(), POLL_INTERVAL)?;
        let n = report.len().min(buf.len());
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), report.get(..n)) {
            dst.copy_from_slice(src);
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(len = n, "simulated read");
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SessionError> {
        self.ensure_open()?;
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(buf.to_vec());
        Ok(buf.len())
    }

    fn set_feature(&self, buf: &[u8]) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.features
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(buf.to_vec());
        Ok(())
    }

    fn string_request(&self, id: u8) -> Result<Vec<u8>, SessionError> {
        self.ensure_open()?;
        self.string_requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
        Ok(self
            .strings
            .get(&id)
            .map(|s| util::encode_string_descriptor(s))
            .unwrap_or_default())
    }

    fn is_reading(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}
