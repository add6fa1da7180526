/// Errors reported by backend implementations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A command buffer was driven out of its begin/record/end order.
    #[error("command buffer `{label}` is {actual}, expected {expected}")]
    InvalidState {
        label: String,
        actual: &'static str,
        expected: &'static str,
    },

    /// The device ran out of memory. Rendering cannot continue.
    #[error("GPU out of memory")]
    OutOfMemory,

    /// The surface cannot be read back (missing `COPY_SRC` support or no frame held).
    #[error("surface readback unavailable: {0}")]
    ReadbackUnavailable(&'static str),

    /// Mapping or copying readback data failed.
    #[error("surface readback failed: {0}")]
    Readback(String),
}

impl BackendError {
    /// Returns `true` when rendering cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfMemory)
    }
}
