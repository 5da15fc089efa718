use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use hidapi::{HidApi, HidDevice};
use tablet_traits::{CloseSignal, DeviceSession, SessionError, SessionKind};
use tracing::{debug, trace, warn};

use crate::error::{HwError, Result};
use crate::util::encode_string_descriptor;

/// Per-attempt read timeout; reads loop on it so a close is noticed.
const READ_TIMEOUT_MS: i32 = 50;

/// HID tablet session backed by `hidapi`.
///
/// A usage page or usage of 0 matches any interface of the device.
pub struct HidSession {
    kind: SessionKind,
    device: Option<Mutex<HidDevice>>,
    close: CloseSignal,
    reading: AtomicBool,
}

impl HidSession {
    /// Open the first interface matching the ids. On failure the session is
    /// returned permanently closed.
    pub fn open(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> Self {
        let kind = SessionKind::Hid {
            vendor_id,
            product_id,
            usage_page,
            usage,
        };
        match open_device(vendor_id, product_id, usage_page, usage) {
            Ok(device) => {
                debug!(vendor_id, product_id, usage_page, usage, "hid device open");
                Self {
                    kind,
                    device: Some(Mutex::new(device)),
                    close: CloseSignal::new(),
                    reading: AtomicBool::new(false),
                }
            }
            Err(e) => {
                warn!(error = %e, vendor_id, product_id, "hid open failed");
                Self {
                    kind,
                    device: None,
                    close: CloseSignal::closed(),
                    reading: AtomicBool::new(false),
                }
            }
        }
    }

    fn with_device<T>(&self, f: impl FnOnce(&HidDevice) -> Result<T>) -> Result<T> {
        if self.close.is_closed() {
            return Err(HwError::Closed);
        }
        let device = self.device.as_ref().ok_or(HwError::Closed)?;
        let guard = device.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }
}

fn open_device(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> Result<HidDevice> {
    let api = HidApi::new().map_err(|e| HwError::Hid(e.to_string()))?;
    let info = api
        .device_list()
        .find(|d| {
            d.vendor_id() == vendor_id
                && d.product_id() == product_id
                && (usage_page == 0 || d.usage_page() == usage_page)
                && (usage == 0 || d.usage() == usage)
        })
        .ok_or(HwError::NotFound)?;
    info.open_device(&api)
        .map_err(|e| HwError::Hid(e.to_string()))
}

impl DeviceSession for HidSession {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    fn is_open(&self) -> bool {
        self.device.is_some() && !self.close.is_closed()
    }

    fn read(&self, buf: &mut [u8]) -> std::result::Result<usize, SessionError> {
        self.reading.store(true, Ordering::Release);
        let result = loop {
            let attempt = self.with_device(|d| {
                d.read_timeout(buf, READ_TIMEOUT_MS)
                    .map_err(|e| HwError::Hid(e.to_string()))
            });
            match attempt {
                Ok(0) => continue,
                other => break other,
            }
        };
        self.reading.store(false, Ordering::Release);
        let n = result?;
        trace!(len = n, "hid read");
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> std::result::Result<usize, SessionError> {
        Ok(self.with_device(|d| d.write(buf).map_err(|e| HwError::Hid(e.to_string())))?)
    }

    fn set_feature(&self, buf: &[u8]) -> std::result::Result<(), SessionError> {
        Ok(self.with_device(|d| {
            d.send_feature_report(buf)
                .map_err(|e| HwError::Hid(e.to_string()))
        })?)
    }

    fn string_request(&self, id: u8) -> std::result::Result<Vec<u8>, SessionError> {
        let value = self.with_device(|d| {
            d.get_indexed_string(i32::from(id))
                .map_err(|e| HwError::Hid(e.to_string()))
        })?;
        Ok(value
            .map(|s| encode_string_descriptor(&s))
            .unwrap_or_default())
    }

    fn is_reading(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}
