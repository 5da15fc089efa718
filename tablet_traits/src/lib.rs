pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type SessionError = Box<dyn std::error::Error + Send + Sync>;

/// Transport a session was opened over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// USB interrupt/bulk pipe. String requests go over the control endpoint.
    Usb { pipe_id: u8 },
    /// HID interface. String requests share the path used by reads.
    Hid {
        vendor_id: u16,
        product_id: u16,
        usage_page: u16,
        usage: u16,
    },
}

impl SessionKind {
    #[inline]
    pub fn is_hid(&self) -> bool {
        matches!(self, SessionKind::Hid { .. })
    }
}

/// Shared close flag for a session.
///
/// Cloned out of the session so another thread can close it while a read is
/// blocked; the read must then return an error instead of hanging.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal(Arc<AtomicBool>);

impl CloseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that starts out closed (session failed to open).
    pub fn closed() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn close(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Blocking device transport owned by an open tablet.
///
/// Methods take `&self` so the session can be shared behind an `Arc` between
/// the read thread and a control thread. Implementations must not serialize
/// `string_request` against `read`: callers rely on `is_reading` to fail fast.
pub trait DeviceSession: Send + Sync {
    fn kind(&self) -> SessionKind;

    /// False once the session failed to open or was closed. Never flips back.
    fn is_open(&self) -> bool;

    /// Read one report into `buf`, returning the number of bytes transferred.
    fn read(&self, buf: &mut [u8]) -> Result<usize, SessionError>;

    fn write(&self, buf: &[u8]) -> Result<usize, SessionError>;

    fn set_feature(&self, buf: &[u8]) -> Result<(), SessionError>;

    /// Raw string descriptor bytes (interleaved, UTF-16 style).
    fn string_request(&self, id: u8) -> Result<Vec<u8>, SessionError>;

    /// True while a `read` is in flight.
    fn is_reading(&self) -> bool;

    fn close_signal(&self) -> CloseSignal;

    fn close(&self) {
        self.close_signal().close();
    }
}

impl<S: DeviceSession + ?Sized> DeviceSession for Arc<S> {
    fn kind(&self) -> SessionKind {
        (**self).kind()
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn read(&self, buf: &mut [u8]) -> Result<usize, SessionError> {
        (**self).read(buf)
    }
    fn write(&self, buf: &[u8]) -> Result<usize, SessionError> {
        (**self).write(buf)
    }
    fn set_feature(&self, buf: &[u8]) -> Result<(), SessionError> {
        (**self).set_feature(buf)
    }
    fn string_request(&self, id: u8) -> Result<Vec<u8>, SessionError> {
        (**self).string_request(id)
    }
    fn is_reading(&self) -> bool {
        (**self).is_reading()
    }
    fn close_signal(&self) -> CloseSignal {
        (**self).close_signal()
    }
}

impl<S: DeviceSession + ?Sized> DeviceSession for Box<S> {
    fn kind(&self) -> SessionKind {
        (**self).kind()
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn read(&self, buf: &mut [u8]) -> Result<usize, SessionError> {
        (**self).read(buf)
    }
    fn write(&self, buf: &[u8]) -> Result<usize, SessionError> {
        (**self).write(buf)
    }
    fn set_feature(&self, buf: &[u8]) -> Result<(), SessionError> {
        (**self).set_feature(buf)
    }
    fn string_request(&self, id: u8) -> Result<Vec<u8>, SessionError> {
        (**self).string_request(id)
    }
    fn is_reading(&self) -> bool {
        (**self).is_reading()
    }
    fn close_signal(&self) -> CloseSignal {
        (**self).close_signal()
    }
}
