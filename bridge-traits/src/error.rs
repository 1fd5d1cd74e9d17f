use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Engine handle is not live: {0}")]
    InvalidHandle(String),

    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Media could not be decoded: {0}")]
    Decode(String),

    #[error("Engine busy: {0}")]
    Busy(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when retrying the same call later may succeed.
    ///
    /// Engines report transitional rejections (a `play` racing a buffer
    /// refill, a seek issued mid-decode) as transient; dead handles, missing
    /// devices and I/O faults are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::Busy(_)
                | BridgeError::OperationFailed(_)
                | BridgeError::Decode(_)
                | BridgeError::SourceUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
