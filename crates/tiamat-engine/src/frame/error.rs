use crate::backend::BackendError;
use crate::draw::CommandListGroup;
use crate::error::DrawError;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("command-list group {group:?} faulted: {source}")]
    Dispatch {
        group: CommandListGroup,
        #[source]
        source: DrawError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("window thread faulted: {0}")]
    Window(String),
}

impl FrameError {
    /// Fatal errors stop the render loop.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Dispatch { source, .. } => source.is_fatal(),
            Self::Backend(err) => err.is_fatal(),
            Self::Window(_) => true,
        }
    }
}
