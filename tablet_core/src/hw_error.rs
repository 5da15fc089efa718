//! Maps `Box<dyn Error>` from the session boundary to typed `TabletError`.
//!
//! `DeviceSession` returns `Box<dyn Error + Send + Sync>` so any transport can
//! plug in; this module narrows those to our enum, with a feature-gated path
//! for `tablet_hardware::HwError` downcasting.

use crate::error::TabletError;

/// Map a session error to a typed `TabletError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TabletError {
    #[cfg(feature = "hardware-errors")]
    {
        use tablet_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Closed => TabletError::Closed,
                HwError::Disconnected | HwError::NotFound => TabletError::Disconnected,
                HwError::Busy => TabletError::DeviceBusy,
                HwError::Timeout => TabletError::Timeout,
                other => TabletError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") {
        TabletError::Timeout
    } else if lower.contains("disconnect") {
        TabletError::Disconnected
    } else if lower.contains("closed") {
        TabletError::Closed
    } else {
        TabletError::Transport(s)
    }
}
