use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{HwError, Result};

/// Wait until a report arrives on `rx`, or `closed` reports true.
/// Polls in small intervals so a close from another thread is noticed promptly.
pub fn wait_for_report(
    rx: &Receiver<Vec<u8>>,
    mut closed: impl FnMut() -> bool,
    poll_interval: Duration,
) -> Result<Vec<u8>> {
    loop {
        if closed() {
            return Err(HwError::Closed);
        }
        match rx.recv_timeout(poll_interval) {
            Ok(report) => return Ok(report),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(HwError::Disconnected),
        }
    }
}

/// Encode `s` the way a device returns a string descriptor: UTF-16LE code units.
pub fn encode_string_descriptor(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
