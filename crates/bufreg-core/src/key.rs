//! Intern key allocation
//!
//! Keys are slot-plus-generation pairs packed into a `u64`. Releasing a key
//! bumps the generation of its slot before the slot is reused, so a stale key
//! held by a foreign caller can never alias a buffer created later.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Generation counter stored in the high half of a key.
pub type Generation = u32;

/// Reserved generation values.
pub mod generation {
    use super::Generation;

    /// Never issued; the all-zero key is always invalid.
    pub const UNISSUED: Generation = 0;
    /// First generation handed out for a fresh slot.
    pub const FIRST: Generation = 1;
    /// Slots that reach this generation are retired instead of recycled.
    pub const OVERFLOW_GUARD: Generation = u32::MAX;
}

/// Opaque identifier of a live buffer
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InternKey(u64);

impl InternKey {
    fn new(slot: u32, generation: Generation) -> Self {
        InternKey((u64::from(generation) << 32) | u64::from(slot))
    }

    /// Rebuild a key from its raw representation.
    ///
    /// Any `u64` is accepted; keys that were never issued simply fail to resolve.
    pub fn from_raw(raw: u64) -> Self {
        InternKey(raw)
    }

    /// The raw `u64` form handed across the boundary
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Slot index (low 32 bits)
    pub fn slot(self) -> u32 {
        self.0 as u32
    }

    /// Generation (high 32 bits)
    pub fn generation(self) -> Generation {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for InternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key(slot={}, gen={})", self.slot(), self.generation())
    }
}

/// Where a key stands relative to the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    /// Never handed out
    Unissued,
    /// Currently issued
    Live,
    /// Issued once and released since
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Live,
    Retired,
}

#[derive(Debug, Default)]
struct SlotTable {
    generations: Vec<Generation>,
    states: Vec<SlotState>,
    free: Vec<u32>,
    live_count: usize,
    retired: usize,
}

impl SlotTable {
    fn status(&self, key: InternKey) -> KeyStatus {
        let index = key.slot() as usize;
        let (Some(&current), Some(&state)) = (self.generations.get(index), self.states.get(index))
        else {
            return KeyStatus::Unissued;
        };

        let gen = key.generation();
        if gen == generation::UNISSUED || gen > current {
            KeyStatus::Unissued
        } else if gen < current {
            KeyStatus::Released
        } else {
            match state {
                SlotState::Live => KeyStatus::Live,
                SlotState::Retired => KeyStatus::Released,
                SlotState::Free => KeyStatus::Unissued,
            }
        }
    }
}

/// Issues keys that never collide with a currently live key
#[derive(Debug, Default)]
pub struct KeyAllocator {
    slots: Mutex<SlotTable>,
}

impl KeyAllocator {
    /// Create an allocator with no issued keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a key not assigned to any live buffer.
    ///
    /// # Panics
    /// Panics when all 2^32 slots are live or retired. That is the one fatal
    /// condition of the allocator.
    pub fn allocate(&self) -> InternKey {
        let mut table = self.slots.lock();

        let slot = match table.free.pop() {
            Some(slot) => slot,
            None => {
                let next = table.generations.len();
                let slot = u32::try_from(next)
                    .unwrap_or_else(|_| panic!("intern key space exhausted after {} slots", next));
                table.generations.push(generation::FIRST);
                table.states.push(SlotState::Free);
                slot
            }
        };

        let index = slot as usize;
        table.states[index] = SlotState::Live;
        table.live_count += 1;
        InternKey::new(slot, table.generations[index])
    }

    /// Return a key to the free pool.
    ///
    /// Must only be called once the buffer behind the key is fully torn down.
    /// Returns `false`, leaving state untouched, when the key is not live.
    pub fn release(&self, key: InternKey) -> bool {
        let mut table = self.slots.lock();
        if table.status(key) != KeyStatus::Live {
            return false;
        }

        let index = key.slot() as usize;
        table.live_count -= 1;
        if table.generations[index] < generation::OVERFLOW_GUARD {
            table.generations[index] += 1;
            table.states[index] = SlotState::Free;
            table.free.push(key.slot());
        } else {
            table.states[index] = SlotState::Retired;
            table.retired += 1;
        }
        true
    }

    /// Whether `key` is currently issued
    pub fn is_live(&self, key: InternKey) -> bool {
        self.status(key) == KeyStatus::Live
    }

    /// Classify `key` as live, released, or never issued
    pub fn status(&self, key: InternKey) -> KeyStatus {
        self.slots.lock().status(key)
    }

    /// Number of keys currently issued
    pub fn live_count(&self) -> usize {
        self.slots.lock().live_count
    }

    /// Number of slots permanently retired after generation overflow
    pub fn retired_count(&self) -> usize {
        self.slots.lock().retired
    }

    #[cfg(test)]
    fn force_generation(&self, slot: u32, gen: Generation) {
        self.slots.lock().generations[slot as usize] = gen;
    }
}
