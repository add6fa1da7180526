//! Scheduler error taxonomy.
//!
//! Three classes:
//! - invariant violations (ownership, wrong manager, missing targets, unknown
//!   group): programming errors, never retried, [`DrawError::is_fatal`] is `true`
//! - per-operation faults (hook errors, panics, not-ready draws): captured
//!   first-wins per dispatch cycle and returned from `wait_for_end`
//! - backend and resource errors, wrapped as they surface

use std::any::Any;

use crate::backend::BackendError;
use crate::draw::{CommandListGroup, DrawOpKey, ManagerId, OwnerHandle};
use crate::resources::ResourceError;

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("draw operation is already owned by {current:?}")]
    AlreadyOwned { current: OwnerHandle },

    #[error("draw operation has no owner; add it to a manager first")]
    NotOwned,

    #[error("draw operation {key:?} belongs to manager {expected:?}, not {actual:?}")]
    WrongManager {
        key: DrawOpKey,
        expected: ManagerId,
        actual: ManagerId,
    },

    #[error("draw operation {0:?} is already registered")]
    AlreadyRegistered(DrawOpKey),

    #[error("draw operation {0:?} is not registered or was disposed")]
    NotReady(DrawOpKey),

    #[error("no draw operation {0:?} in this manager")]
    UnknownOperation(DrawOpKey),

    #[error("command-list group {group:?} out of range (manager has {count} groups)")]
    UnknownGroup { group: CommandListGroup, count: usize },

    #[error("dispatch `{label}` started with operations but without render targets")]
    MissingTargets { label: String },

    #[error("dispatch `{label}` admission gate closed")]
    GateClosed { label: String },

    #[error("draw hook failed: {0:#}")]
    Hook(anyhow::Error),

    #[error("draw task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl DrawError {
    /// Wraps an error returned by a draw/registration hook.
    pub fn hook(err: anyhow::Error) -> Self {
        Self::Hook(err)
    }

    /// Returns `true` for invariant violations and unrecoverable backend errors.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AlreadyOwned { .. }
            | Self::NotOwned
            | Self::WrongManager { .. }
            | Self::AlreadyRegistered(_)
            | Self::UnknownGroup { .. }
            | Self::MissingTargets { .. }
            | Self::GateClosed { .. } => true,
            Self::Backend(err) => err.is_fatal(),
            Self::NotReady(_)
            | Self::UnknownOperation(_)
            | Self::Hook(_)
            | Self::Panicked(_)
            | Self::Resource(_) => false,
        }
    }

    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Panicked(panic_message(err.into_panic()))
        } else {
            Self::Panicked("task cancelled".to_string())
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violations_are_fatal() {
        assert!(DrawError::NotOwned.is_fatal());
        assert!(DrawError::MissingTargets { label: "g0".into() }.is_fatal());
        assert!(
            DrawError::UnknownGroup {
                group: CommandListGroup(3),
                count: 1
            }
            .is_fatal()
        );
    }

    #[test]
    fn per_operation_faults_are_not_fatal() {
        assert!(!DrawError::hook(anyhow::anyhow!("boom")).is_fatal());
        assert!(!DrawError::Panicked("boom".into()).is_fatal());
        assert!(!DrawError::Backend(BackendError::Readback("x".into())).is_fatal());
        assert!(DrawError::Backend(BackendError::OutOfMemory).is_fatal());
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7u32)), "non-string panic payload");
    }
}
