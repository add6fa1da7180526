use crate::backend::BackendError;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}

impl SurfaceErrorAction {
    /// `Ok(None)` (skip the frame) for recoverable actions.
    pub(crate) fn into_acquire<T>(self) -> Result<Option<T>, BackendError> {
        match self {
            Self::Reconfigured | Self::SkipFrame => Ok(None),
            Self::Fatal => Err(BackendError::OutOfMemory),
        }
    }
}
