//! Buffer storage keyed by intern key
//!
//! The table is split into shards, each behind its own `RwLock`, and every
//! buffer sits behind its own `Mutex`. Lookups clone the buffer's `Arc` out of
//! the shard and drop the shard lock before touching the buffer, so transfers
//! on distinct buffers never contend and a long copy never blocks creation.
//! Transfers run against a `BufferRef` the caller has already resolved.
//!
//! Destruction removes the table entry first, then takes the buffer lock to
//! tombstone it. A transfer that resolved the buffer just before the removal
//! either finishes first or observes the tombstone and fails; it never sees
//! freed storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, BufferInfo};
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::key::{InternKey, KeyAllocator, KeyStatus};

/// A resolved, call-scoped reference to a live buffer
#[derive(Debug, Clone)]
pub struct BufferRef {
    key: InternKey,
    capacity: u64,
    cell: Arc<Mutex<Buffer>>,
}

impl BufferRef {
    pub fn key(&self) -> InternKey {
        self.key
    }

    /// Capacity the buffer was created with
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Run `f` with exclusive access to the buffer.
    ///
    /// Fails with `UnknownHandle` if the buffer was destroyed after this
    /// reference was resolved.
    pub fn with<R>(&self, f: impl FnOnce(&mut Buffer) -> Result<R>) -> Result<R> {
        let mut buffer = self.cell.lock();
        if buffer.is_released() {
            return Err(Error::UnknownHandle { key: self.key });
        }
        f(&mut buffer)
    }
}

/// Counters describing the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub live_buffers: u64,
    pub reserved_bytes: u64,
    pub total_created: u64,
    pub total_destroyed: u64,
    pub failed_creations: u64,
    pub retired_slots: u64,
}

type Shard = RwLock<HashMap<InternKey, BufferRef>>;

/// Owns every live buffer
#[derive(Debug)]
pub struct BufferStore {
    shards: Box<[Shard]>,
    shard_mask: usize,
    keys: KeyAllocator,
    max_buffer_capacity: u64,
    max_total_bytes: u64,
    reserved_bytes: AtomicU64,
    total_created: AtomicU64,
    total_destroyed: AtomicU64,
    failed_creations: AtomicU64,
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl BufferStore {
    /// Create an empty store sized by `config`
    pub fn new(config: &RegistryConfig) -> Self {
        let shard_count = config.shard_count.max(1).next_power_of_two();
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            shard_mask: shard_count - 1,
            keys: KeyAllocator::new(),
            max_buffer_capacity: config.max_buffer_capacity,
            max_total_bytes: config.max_total_bytes,
            reserved_bytes: AtomicU64::new(0),
            total_created: AtomicU64::new(0),
            total_destroyed: AtomicU64::new(0),
            failed_creations: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: InternKey) -> &Shard {
        &self.shards[key.slot() as usize & self.shard_mask]
    }

    /// Allocate a buffer of `capacity` bytes and issue a key for it.
    ///
    /// On failure nothing is retained: no key is issued and no bytes stay
    /// reserved against the budget.
    pub fn create(&self, capacity: u64) -> Result<InternKey> {
        let result = self
            .reserve(capacity)
            .and_then(|()| {
                Buffer::with_capacity(capacity).inspect_err(|_| {
                    self.reserved_bytes.fetch_sub(capacity, Ordering::AcqRel);
                })
            });

        let buffer = match result {
            Ok(buffer) => buffer,
            Err(e) => {
                self.failed_creations.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(capacity, error = %e, "Buffer creation rejected");
                return Err(e);
            }
        };

        let key = self.keys.allocate();
        let entry = BufferRef {
            key,
            capacity,
            cell: Arc::new(Mutex::new(buffer)),
        };
        self.shard(key).write().insert(key, entry);
        self.total_created.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(%key, capacity, "Buffer created");
        Ok(key)
    }

    fn reserve(&self, capacity: u64) -> Result<()> {
        if capacity > self.max_buffer_capacity {
            return Err(Error::CapacityLimit {
                requested: capacity,
                reserved: self.reserved_bytes.load(Ordering::Acquire),
                limit: self.max_buffer_capacity,
                limit_name: "max_buffer_capacity",
            });
        }

        let limit = self.max_total_bytes;
        self.reserved_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                reserved.checked_add(capacity).filter(|total| *total <= limit)
            })
            .map(|_| ())
            .map_err(|reserved| Error::CapacityLimit {
                requested: capacity,
                reserved,
                limit,
                limit_name: "max_total_bytes",
            })
    }

    /// Resolve `key` to its buffer, if live
    pub fn lookup(&self, key: InternKey) -> Option<BufferRef> {
        self.shard(key).read().get(&key).cloned()
    }

    /// Free the buffer behind `key` and release the key.
    pub fn destroy(&self, key: InternKey) -> Result<()> {
        let entry = self.shard(key).write().remove(&key);
        let Some(entry) = entry else {
            tracing::debug!(%key, status = ?self.keys.status(key), "Destroy of dead key");
            return Err(Error::UnknownHandle { key });
        };

        // Waits for any transfer already holding the buffer.
        entry.cell.lock().release();

        self.reserved_bytes.fetch_sub(entry.capacity, Ordering::AcqRel);
        self.keys.release(key);
        self.total_destroyed.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(%key, capacity = entry.capacity, "Buffer destroyed");
        Ok(())
    }

    /// Sequential read from the buffer's read cursor
    pub fn read(&self, entry: &BufferRef, dst: &mut [u8]) -> Result<usize> {
        entry.with(|buffer| Ok(buffer.read(dst)))
    }

    /// Append to the buffer
    pub fn write(&self, entry: &BufferRef, src: &[u8]) -> Result<usize> {
        entry.with(|buffer| Ok(buffer.write(src)))
    }

    pub fn read_at(&self, entry: &BufferRef, offset: u64, dst: &mut [u8]) -> Result<usize> {
        entry.with(|buffer| buffer.read_at(offset, dst))
    }

    pub fn write_at(&self, entry: &BufferRef, offset: u64, src: &[u8]) -> Result<usize> {
        entry.with(|buffer| buffer.write_at(offset, src))
    }

    pub fn rewind(&self, entry: &BufferRef) -> Result<()> {
        entry.with(|buffer| {
            buffer.rewind();
            Ok(())
        })
    }

    pub fn clear(&self, entry: &BufferRef) -> Result<()> {
        entry.with(|buffer| {
            buffer.clear();
            Ok(())
        })
    }

    pub fn info(&self, entry: &BufferRef) -> Result<BufferInfo> {
        entry.with(|buffer| Ok(buffer.info()))
    }

    /// Where `key` stands with the key allocator
    pub fn key_status(&self, key: InternKey) -> KeyStatus {
        self.keys.status(key)
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.keys.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            live_buffers: self.keys.live_count() as u64,
            reserved_bytes: self.reserved_bytes.load(Ordering::Acquire),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_destroyed: self.total_destroyed.load(Ordering::Relaxed),
            failed_creations: self.failed_creations.load(Ordering::Relaxed),
            retired_slots: self.keys.retired_count() as u64,
        }
    }

    /// Destroy every live buffer, returning how many were destroyed
    pub fn clear_all(&self) -> usize {
        let keys: Vec<InternKey> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().keys().copied().collect::<Vec<_>>())
            .collect();

        // A concurrent destroy may win the race for some keys.
        let destroyed = keys.into_iter().filter(|key| self.destroy(*key).is_ok()).count();
        tracing::debug!(destroyed, "Store cleared");
        destroyed
    }
}
