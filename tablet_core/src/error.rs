use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TabletError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    #[error("device busy: HID string request while a read is in flight")]
    DeviceBusy,
    #[error("session closed")]
    Closed,
    #[error("device disconnected")]
    Disconnected,
    #[error("timeout waiting for device")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
}

impl TabletError {
    /// The session cannot deliver any more reports.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, TabletError::Closed | TabletError::Disconnected)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing device session")]
    MissingSession,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
