use crate::adapter::TagIoError;
use tagcore::convert::ConvertError;
use thiserror::Error;

/// Error taxonomy surfaced across the engine's public boundary. Errors are
/// returned, never panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NfcError {
    #[error("operation not permitted in the current context")]
    Security,
    #[error("operation not supported")]
    NotSupported,
    #[error("the NFC adapter is disabled")]
    DeviceDisabled,
    #[error("message failed validation or transcoding")]
    InvalidMessage,
    #[error("no matching pending operation or watcher")]
    NotFound,
    #[error("the operation was cancelled")]
    OperationCancelled,
    #[error("the operation timed out")]
    TimerExpired,
    #[error("tag input/output failed")]
    IoError,
}

impl From<TagIoError> for NfcError {
    fn from(_: TagIoError) -> Self {
        NfcError::IoError
    }
}

impl From<ConvertError> for NfcError {
    fn from(_: ConvertError) -> Self {
        NfcError::InvalidMessage
    }
}
