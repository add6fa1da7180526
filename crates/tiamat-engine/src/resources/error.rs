#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource `{0}` is not registered")]
    NotRegistered(String),

    #[error("resource `{name}` does not hold a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("factory for resource `{name}` failed: {error:#}")]
    Factory { name: String, error: anyhow::Error },
}
