use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::sync::{lock, read, write};

use super::{Disposable, ResourceError};

type AnyValue = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ResourceCache) -> anyhow::Result<Cached> + Send + Sync>;

struct Cached {
    value: AnyValue,
    dispose: Option<fn(&(dyn Any + Send + Sync))>,
}

impl Cached {
    fn plain<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            dispose: None,
        }
    }

    fn disposable<T: Disposable>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            dispose: Some(dispose_erased::<T>),
        }
    }

    fn release(self) {
        if let Some(dispose) = self.dispose {
            dispose(&*self.value);
        }
    }
}

fn dispose_erased<T: Disposable>(value: &(dyn Any + Send + Sync)) {
    if let Some(v) = value.downcast_ref::<T>() {
        v.dispose();
    }
}

/// One registration: the factory plus the instance it produced this cycle.
///
/// `slot` is held while the factory runs, so concurrent first accesses wait for
/// the single factory call instead of racing it.
struct Entry {
    factory: Factory,
    slot: Mutex<Option<Cached>>,
}

impl Entry {
    fn new(factory: Factory) -> Arc<Self> {
        Arc::new(Self {
            factory,
            slot: Mutex::new(None),
        })
    }
}

/// Name-keyed, lazily populated, disposable resource store.
///
/// - each factory runs at most once per clear cycle, even under concurrent access
/// - [`clear`](Self::clear) disposes instances but keeps registrations
/// - [`remove_resource`](Self::remove_resource) disposes and forgets the entry
///
/// Factories receive the cache itself so one resource can be built from another.
/// A factory must not request its own name (the entry is locked while it runs).
#[derive(Default)]
pub struct ResourceCache {
    entries: RwLock<HashMap<String, Arc<Entry>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a lazy factory under `name`.
    ///
    /// Returns `false` (and keeps the existing registration) if `name` is taken.
    pub fn register_resource<T, F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&ResourceCache) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.insert_factory(
            name.into(),
            Arc::new(move |c: &ResourceCache| factory(c).map(Cached::plain)),
        )
    }

    /// Like [`register_resource`](Self::register_resource) for values disposed on clear.
    pub fn register_disposable<T, F>(&self, name: impl Into<String>, factory: F) -> bool
    where
        T: Disposable,
        F: Fn(&ResourceCache) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.insert_factory(
            name.into(),
            Arc::new(move |c: &ResourceCache| factory(c).map(Cached::disposable)),
        )
    }

    /// Returns the instance registered under `name`, creating it on first access.
    pub fn get_resource<T>(&self, name: &str) -> Result<Arc<T>, ResourceError>
    where
        T: Send + Sync + 'static,
    {
        let entry = read(&self.entries)
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotRegistered(name.to_string()))?;
        self.materialize::<T>(name, &entry)
    }

    /// Returns the instance under `name`, registering `factory` first if absent.
    pub fn get_or_add_resource<T, F>(&self, name: &str, factory: F) -> Result<Arc<T>, ResourceError>
    where
        T: Send + Sync + 'static,
        F: Fn(&ResourceCache) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let entry = self.entry_or_insert(name, || -> Factory {
            Arc::new(move |c: &ResourceCache| factory(c).map(Cached::plain))
        });
        self.materialize::<T>(name, &entry)
    }

    /// Disposable counterpart of [`get_or_add_resource`](Self::get_or_add_resource).
    pub fn get_or_add_disposable<T, F>(&self, name: &str, factory: F) -> Result<Arc<T>, ResourceError>
    where
        T: Disposable,
        F: Fn(&ResourceCache) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let entry = self.entry_or_insert(name, || -> Factory {
            Arc::new(move |c: &ResourceCache| factory(c).map(Cached::disposable))
        });
        self.materialize::<T>(name, &entry)
    }

    /// Returns the instance under `name`, deriving it from the resource `owner`.
    ///
    /// The owner is resolved (and created if needed) each time the derived value is
    /// built. The derived value holds no borrow of the owner: clearing or removing
    /// one does not touch the other.
    pub fn get_or_add_owned<O, T, F>(
        &self,
        name: &str,
        owner: &str,
        factory: F,
    ) -> Result<Arc<T>, ResourceError>
    where
        O: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&O) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let owner = owner.to_string();
        let entry = self.entry_or_insert(name, || -> Factory {
            Arc::new(move |c: &ResourceCache| {
                let owner = c.get_resource::<O>(&owner)?;
                factory(&owner).map(Cached::plain)
            })
        });
        self.materialize::<T>(name, &entry)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        read(&self.entries).contains_key(name)
    }

    /// Returns `true` if `name` currently holds a materialized instance.
    pub fn is_materialized(&self, name: &str) -> bool {
        let entry = read(&self.entries).get(name).cloned();
        entry.is_some_and(|e| lock(&e.slot).is_some())
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disposes the instance under `name` (if any) and forgets the registration.
    pub fn remove_resource(&self, name: &str) -> bool {
        let Some(entry) = write(&self.entries).remove(name) else {
            return false;
        };
        if let Some(cached) = lock(&entry.slot).take() {
            cached.release();
        }
        log::trace!("resource `{name}` removed");
        true
    }

    /// Disposes every materialized instance. Registrations survive; the next
    /// access re-runs the factory.
    pub fn clear(&self) {
        let entries: Vec<(String, Arc<Entry>)> = read(&self.entries)
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();

        let mut released = 0usize;
        for (name, entry) in entries {
            if let Some(cached) = lock(&entry.slot).take() {
                cached.release();
                released += 1;
                log::trace!("resource `{name}` released");
            }
        }
        log::debug!("resource cache cleared ({released} instances released)");
    }

    fn insert_factory(&self, name: String, factory: Factory) -> bool {
        let mut entries = write(&self.entries);
        if entries.contains_key(&name) {
            return false;
        }
        entries.insert(name, Entry::new(factory));
        true
    }

    fn entry_or_insert(&self, name: &str, factory: impl FnOnce() -> Factory) -> Arc<Entry> {
        if let Some(entry) = read(&self.entries).get(name) {
            return Arc::clone(entry);
        }
        let mut entries = write(&self.entries);
        Arc::clone(
            entries
                .entry(name.to_string())
                .or_insert_with(|| Entry::new(factory())),
        )
    }

    fn materialize<T>(&self, name: &str, entry: &Entry) -> Result<Arc<T>, ResourceError>
    where
        T: Send + Sync + 'static,
    {
        let value = {
            let mut slot = lock(&entry.slot);
            match slot.as_ref() {
                Some(cached) => Arc::clone(&cached.value),
                None => {
                    let cached = (entry.factory)(self).map_err(|error| ResourceError::Factory {
                        name: name.to_string(),
                        error,
                    })?;
                    let value = Arc::clone(&cached.value);
                    *slot = Some(cached);
                    log::trace!("resource `{name}` materialized");
                    value
                }
            }
        };

        value.downcast::<T>().map_err(|_| ResourceError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
    }
}

impl Drop for ResourceCache {
    fn drop(&mut self) {
        self.clear();
    }
}
