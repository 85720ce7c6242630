//! Top-level error type, wrapping each subsystem's own error and adding
//! the categorisation helpers a caller needs to decide whether to retry
//! (§7, mirroring the teacher's `ClientError`).

use thiserror::Error;

/// Broad category a [`CoreError`] falls into, for callers that want to
/// branch on recovery strategy without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Registration/network hiccups; a retry with backoff is reasonable.
    Transient,
    /// Credentials or configuration are wrong; retrying without a
    /// change will not help.
    Permanent,
    /// The caller asked for an operation the current state doesn't
    /// support; not really an "error" so much as a rejected request.
    InvalidRequest,
    /// Something the process cannot recover from by itself.
    Fatal,
}

/// The facade's unified error type. Each variant wraps a subsystem
/// crate's own error rather than re-deriving its message.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("account error: {0}")]
    Account(#[from] corephone_account::AccountError),

    #[error("call error: {0}")]
    Call(#[from] corephone_call::CallError),

    #[error("codec error: {0}")]
    Codec(#[from] corephone_codec::CodecError),

    #[error("ICE error: {0}")]
    Ice(#[from] corephone_ice::IceError),

    #[error("UPnP error: {0}")]
    Upnp(#[from] corephone_upnp::UpnpError),

    /// The PID lock, arena creation, or some other one-time startup
    /// resource could not be acquired.
    #[error("fatal startup error: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Broad recovery category for this error (§7's policy column,
    /// collapsed to four buckets).
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Account(e) => {
                if e.is_recoverable() {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            CoreError::Call(e) => {
                if e.is_recoverable() {
                    ErrorCategory::InvalidRequest
                } else {
                    ErrorCategory::Permanent
                }
            }
            CoreError::Codec(_) => ErrorCategory::InvalidRequest,
            CoreError::Ice(_) => ErrorCategory::Transient,
            CoreError::Upnp(_) => ErrorCategory::Transient,
            CoreError::Fatal(_) => ErrorCategory::Fatal,
        }
    }

    /// Whether a caller can reasonably retry the operation that
    /// produced this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Fatal | ErrorCategory::Permanent)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
