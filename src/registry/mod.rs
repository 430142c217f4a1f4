//! Opaque handle registry
//!
//! Every native object reachable from the host is registered under two keys:
//! its native identity (scoped to its kind) and a freshly minted [`Handle`].
//! The registry keeps both directions consistent under a single lock so a
//! concurrent reader never observes one index without the other.

mod repository;

pub use repository::{ChannelEntry, ConnectionEntry, ObjectRepository, RtpOwner, RtpSide};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Host-visible opaque token. Minted once per native object and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Mint a new random handle
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

struct Entry<T: ?Sized> {
    handle: Handle,
    value: Arc<T>,
}

struct Indexes<T: ?Sized> {
    by_identity: HashMap<String, Entry<T>>,
    by_handle: HashMap<Handle, String>,
}

impl<T: ?Sized> Indexes<T> {
    fn remove_identity(&mut self, identity: &str) -> Option<Arc<T>> {
        let entry = self.by_identity.remove(identity)?;
        self.by_handle.remove(&entry.handle);
        Some(entry.value)
    }
}

/// Bidirectional map between native identity, handle and native object
pub struct HandleRegistry<T: ?Sized> {
    inner: RwLock<Indexes<T>>,
}

impl<T: ?Sized> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indexes {
                by_identity: HashMap::new(),
                by_handle: HashMap::new(),
            }),
        }
    }

    /// Register `value` under `identity` and `handle`.
    ///
    /// Re-adding an identity that already maps to the same object is a no-op
    /// and keeps the existing handle. An identity mapped to a different
    /// object is replaced.
    pub fn add(&self, identity: impl Into<String>, handle: Handle, value: Arc<T>) {
        let identity = identity.into();
        let mut inner = self.inner.write();

        if let Some(existing) = inner.by_identity.get(&identity) {
            if Arc::ptr_eq(&existing.value, &value) {
                return;
            }
        }

        inner.remove_identity(&identity);
        if let Some(previous) = inner.by_handle.get(&handle).cloned() {
            inner.remove_identity(&previous);
        }
        inner.by_handle.insert(handle.clone(), identity.clone());
        inner.by_identity.insert(identity, Entry { handle, value });
    }

    /// Register `value` and return its handle, minting one only if the
    /// identity is new or now refers to a different object
    pub fn register(&self, identity: impl Into<String>, value: Arc<T>) -> Handle {
        let identity = identity.into();
        let mut inner = self.inner.write();

        if let Some(existing) = inner.by_identity.get(&identity) {
            if Arc::ptr_eq(&existing.value, &value) {
                return existing.handle.clone();
            }
        }

        let handle = Handle::new();
        inner.remove_identity(&identity);
        inner.by_handle.insert(handle.clone(), identity.clone());
        inner.by_identity.insert(
            identity,
            Entry {
                handle: handle.clone(),
                value,
            },
        );
        handle
    }

    pub fn get_by_handle(&self, handle: &Handle) -> Option<Arc<T>> {
        let inner = self.inner.read();
        let identity = inner.by_handle.get(handle)?;
        inner.by_identity.get(identity).map(|e| e.value.clone())
    }

    pub fn get_by_identity(&self, identity: &str) -> Option<Arc<T>> {
        self.inner
            .read()
            .by_identity
            .get(identity)
            .map(|e| e.value.clone())
    }

    pub fn handle_of(&self, identity: &str) -> Option<Handle> {
        self.inner
            .read()
            .by_identity
            .get(identity)
            .map(|e| e.handle.clone())
    }

    pub fn identity_of(&self, handle: &Handle) -> Option<String> {
        self.inner.read().by_handle.get(handle).cloned()
    }

    /// Remove the entry and return its object. Unknown identities are a no-op.
    pub fn remove_by_identity(&self, identity: &str) -> Option<Arc<T>> {
        self.inner.write().remove_identity(identity)
    }

    /// Remove the entry and return its object. Unknown handles are a no-op.
    pub fn remove_by_handle(&self, handle: &Handle) -> Option<Arc<T>> {
        let mut inner = self.inner.write();
        let identity = inner.by_handle.get(handle).cloned()?;
        inner.remove_identity(&identity)
    }

    pub fn contains_identity(&self, identity: &str) -> bool {
        self.inner.read().by_identity.contains_key(identity)
    }

    pub fn contains_handle(&self, handle: &Handle) -> bool {
        self.inner.read().by_handle.contains_key(handle)
    }

    /// Snapshot of every registered object
    pub fn all(&self) -> Vec<Arc<T>> {
        self.inner
            .read()
            .by_identity
            .values()
            .map(|e| e.value.clone())
            .collect()
    }

    /// Snapshot of every (identity, handle) pair, sorted by identity
    pub fn keys(&self) -> Vec<(String, Handle)> {
        let mut keys: Vec<_> = self
            .inner
            .read()
            .by_identity
            .iter()
            .map(|(identity, e)| (identity.clone(), e.handle.clone()))
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_identity.clear();
        inner.by_handle.clear();
    }
}

impl<T: ?Sized> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
