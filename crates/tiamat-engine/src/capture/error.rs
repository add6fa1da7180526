#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("surface readback failed: {0}")]
    Readback(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("writing screenshot failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("screenshot request dropped before a frame was captured")]
    Cancelled,

    #[error("encode task failed: {0}")]
    Task(String),
}
