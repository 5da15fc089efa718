use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("session closed")]
    Closed,
    #[error("device disconnected")]
    Disconnected,
    #[error("device busy: read in flight")]
    Busy,
    #[error("device not found")]
    NotFound,
    #[error("transfer timeout")]
    Timeout,
    #[error("hid error: {0}")]
    Hid(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
