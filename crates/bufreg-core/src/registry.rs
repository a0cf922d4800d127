//! Opaque handles over the buffer store
//!
//! A `BufferHandle` is the only thing a caller ever holds. It carries the
//! intern key plus the capacity the buffer was created with; a handle whose
//! capacity does not match the buffer its key names was not produced by this
//! registry and is refused.

use serde::{Deserialize, Serialize};

use crate::buffer::BufferInfo;
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::key::{InternKey, KeyStatus};
use crate::store::{BufferRef, BufferStore, StoreStats};

/// Opaque value identifying one buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferHandle {
    key: InternKey,
    capacity: u64,
}

impl BufferHandle {
    pub fn key(&self) -> InternKey {
        self.key
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Rebuild a handle from raw parts, e.g. when reading one back from a
    /// foreign caller. Forged parts simply fail to resolve.
    pub fn from_parts(key: InternKey, capacity: u64) -> Self {
        Self { key, capacity }
    }
}

/// Lifecycle of a handle: `Unregistered -> Live -> Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleState {
    /// Never issued by this registry (or forged)
    Unregistered,
    /// Refers to a live buffer
    Live,
    /// Its buffer has been destroyed; terminal
    Destroyed,
}

/// Maps handles to buffers
#[derive(Debug, Default)]
pub struct HandleRegistry {
    store: BufferStore,
}

impl HandleRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            store: BufferStore::new(config),
        }
    }

    /// Create a buffer and hand back its handle
    pub fn create(&self, capacity: u64) -> Result<BufferHandle> {
        let key = self.store.create(capacity)?;
        self.register(key)
    }

    /// Wrap a freshly allocated key as a handle
    pub fn register(&self, key: InternKey) -> Result<BufferHandle> {
        let entry = self.store.lookup(key).ok_or(Error::UnknownHandle { key })?;
        Ok(BufferHandle {
            key,
            capacity: entry.capacity(),
        })
    }

    /// Return a reference to the buffer if `handle` is live
    pub fn resolve(&self, handle: &BufferHandle) -> Option<BufferRef> {
        self.store
            .lookup(handle.key)
            .filter(|entry| entry.capacity() == handle.capacity)
    }

    fn require(&self, handle: &BufferHandle) -> Result<BufferRef> {
        self.resolve(handle).ok_or_else(|| {
            tracing::debug!(key = %handle.key, state = ?self.state(handle), "Handle did not resolve");
            Error::UnknownHandle { key: handle.key }
        })
    }

    /// Destroy the buffer behind `handle`.
    ///
    /// A second call for the same handle fails and changes nothing.
    pub fn invalidate(&self, handle: &BufferHandle) -> Result<()> {
        self.require(handle)?;
        self.store.destroy(handle.key)
    }

    pub fn state(&self, handle: &BufferHandle) -> HandleState {
        if self.resolve(handle).is_some() {
            return HandleState::Live;
        }
        match self.store.key_status(handle.key) {
            KeyStatus::Released => HandleState::Destroyed,
            // A live key with the wrong capacity is a forged handle.
            KeyStatus::Live | KeyStatus::Unissued => HandleState::Unregistered,
        }
    }

    pub fn read(&self, handle: &BufferHandle, dst: &mut [u8]) -> Result<usize> {
        self.store.read(&self.require(handle)?, dst)
    }

    pub fn write(&self, handle: &BufferHandle, src: &[u8]) -> Result<usize> {
        self.store.write(&self.require(handle)?, src)
    }

    pub fn read_at(&self, handle: &BufferHandle, offset: u64, dst: &mut [u8]) -> Result<usize> {
        self.store.read_at(&self.require(handle)?, offset, dst)
    }

    pub fn write_at(&self, handle: &BufferHandle, offset: u64, src: &[u8]) -> Result<usize> {
        self.store.write_at(&self.require(handle)?, offset, src)
    }

    pub fn rewind(&self, handle: &BufferHandle) -> Result<()> {
        self.store.rewind(&self.require(handle)?)
    }

    pub fn clear(&self, handle: &BufferHandle) -> Result<()> {
        self.store.clear(&self.require(handle)?)
    }

    pub fn info(&self, handle: &BufferHandle) -> Result<BufferInfo> {
        self.store.info(&self.require(handle)?)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Destroy every live buffer
    pub fn shutdown(&self) -> usize {
        self.store.clear_all()
    }
}
