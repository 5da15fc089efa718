//! Test and helper mocks for tablet_core

use tablet_traits::{CloseSignal, DeviceSession, SessionError, SessionKind};

/// A USB session with nothing attached: reads fail, writes are swallowed.
/// Useful for driving `Tablet` helpers that never read, such as `init`
/// against a device that only takes output reports.
#[derive(Debug, Default)]
pub struct NoopSession {
    close: CloseSignal,
}

impl DeviceSession for NoopSession {
    fn kind(&self) -> SessionKind {
        SessionKind::Usb { pipe_id: 0x81 }
    }

    fn is_open(&self) -> bool {
        !self.close.is_closed()
    }

    fn read(&self, _buf: &mut [u8]) -> Result<usize, SessionError> {
        Err(Box::new(std::io::Error::other("noop session")))
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SessionError> {
        Ok(buf.len())
    }

    fn set_feature(&self, _buf: &[u8]) -> Result<(), SessionError> {
        Ok(())
    }

    fn string_request(&self, _id: u8) -> Result<Vec<u8>, SessionError> {
        Ok(Vec::new())
    }

    fn is_reading(&self) -> bool {
        false
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}
