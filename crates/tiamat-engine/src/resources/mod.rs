//! Shared backend resources.
//!
//! A [`ResourceCache`] is a name-keyed store of lazily created, optionally
//! disposable values shared by every draw operation of one manager (pipelines,
//! layouts, shared index buffers, ...).

mod cache;
mod error;

pub use cache::ResourceCache;
pub use error::ResourceError;

/// A value that owns GPU memory which must be released explicitly.
///
/// `dispose` runs exactly once per cached instance, when the cache is cleared or
/// the entry removed. Callers must hold the manager-wide drawing lock exclusively
/// when triggering it (`DrawManager::clear_resources`).
pub trait Disposable: Send + Sync + 'static {
    fn dispose(&self);
}
