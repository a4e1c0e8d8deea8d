use foundation::handles::NativeHandle;
use thiserror::Error;

/// Failure of a single imperative call into a live surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("surface has been destroyed")]
    Destroyed,
    #[error("unknown native handle {0:?}")]
    UnknownHandle(NativeHandle),
    #[error("surface rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
}

/// Library or network failure while acquiring the surface.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("surface failed to load: {message}")]
pub struct SurfaceInitError {
    pub message: String,
}

impl SurfaceInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
