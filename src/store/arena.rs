//! Growable byte arena backing the store.
//!
//! Байты живут в одном непрерывном буфере. Снаружи на них ссылаются только
//! смещениями, поэтому перемещение буфера при росте ничего не ломает.

use std::ops::Range;

use crate::core::{StoreError, StoreResult};

/// Capacity grows in whole multiples of this many bytes.
pub const ARENA_GROWTH_STEP: usize = 1024;

/// Contiguous, append-only byte buffer.
///
/// Invariant: `data.len() == used <= capacity`. `capacity` is the logical
/// reservation chosen by the growth policy; it only shrinks in [`Arena::compact`]
/// and [`Arena::clear`].
#[derive(Debug, Default)]
pub struct Arena {
    data: Vec<u8>,
    capacity: usize,
    grow_events: u32,
}

impl Arena {
    pub fn new() -> Self { Self::default() }

    /// Arena with `capacity` bytes reserved up front (rounded to the growth step).
    ///
    /// Requests beyond the `u32` offset space fail with
    /// [`StoreError::CapacityOverflow`] before anything is reserved.
    pub fn with_capacity(capacity: usize) -> StoreResult<Self> {
        let mut arena = Self::new();
        if capacity > 0 {
            let rounded = round_up(capacity)
                .filter(|_| capacity <= u32::MAX as usize)
                .ok_or(StoreError::CapacityOverflow { used: 0, requested: capacity })?;
            arena.grow_to(rounded)?;
        }
        Ok(arena)
    }

    /// Committed bytes.
    pub fn used(&self) -> usize { self.data.len() }
    pub fn capacity(&self) -> usize { self.capacity }
    pub fn grow_events(&self) -> u32 { self.grow_events }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Reserves `size` bytes at the end of the committed range and returns their offset.
    ///
    /// The reserved bytes are zeroed; the caller fills them with [`Arena::write`].
    pub fn allocate(&mut self, size: usize) -> StoreResult<u32> {
        let used = self.used();
        let end = used
            .checked_add(size)
            .filter(|&end| end <= u32::MAX as usize)
            .ok_or(StoreError::CapacityOverflow { used, requested: size })?;

        if end > self.capacity {
            let rounded = round_up(end).ok_or(StoreError::CapacityOverflow { used, requested: size })?;
            self.grow_to(rounded)?;
        }

        self.data.resize(end, 0);
        Ok(used as u32)
    }

    /// Copies `bytes` into a range previously returned by [`Arena::allocate`].
    ///
    /// Panics if the range is not committed; callers only pass offsets they
    /// just allocated.
    pub fn write(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Allocates and fills in one step.
    pub fn push(&mut self, bytes: &[u8]) -> StoreResult<u32> {
        let offset = self.allocate(bytes.len())?;
        self.write(offset, bytes);
        Ok(offset)
    }

    fn grow_to(&mut self, new_capacity: usize) -> StoreResult<()> {
        let additional = new_capacity - self.data.len();
        self.data
            .try_reserve_exact(additional)
            .map_err(|source| StoreError::OutOfMemory { requested: new_capacity, source })?;
        tracing::debug!(
            "arena grow: {} -> {} bytes (used {})",
            self.capacity,
            new_capacity,
            self.data.len()
        );
        self.capacity = new_capacity;
        self.grow_events += 1;
        Ok(())
    }

    /// Shrinks the reservation to exactly the committed size.
    pub fn compact(&mut self) {
        if self.capacity == self.data.len() {
            return;
        }
        self.data.shrink_to_fit();
        tracing::debug!("arena compact: {} -> {} bytes", self.capacity, self.data.len());
        self.capacity = self.data.len();
    }

    /// Releases the backing storage.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.capacity = 0;
    }

    /// Current base address. Valid only until the next mutation.
    pub fn base_addr(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Whether `addr` lies in `[base, base + used)`.
    pub fn contains_addr(&self, addr: usize) -> bool {
        let base = self.base_addr();
        !self.data.is_empty() && addr >= base && addr < base + self.data.len()
    }

    pub fn bytes(&self, range: Range<usize>) -> Option<&[u8]> {
        self.data.get(range)
    }

    /// Committed bytes starting at `offset`.
    pub fn tail_from(&self, offset: u32) -> Option<&[u8]> {
        self.data.get(offset as usize..)
    }

    pub fn as_bytes(&self) -> &[u8] { &self.data }
}

/// Next multiple of the growth step strictly above `needed`; `None` on overflow.
fn round_up(needed: usize) -> Option<usize> {
    (needed / ARENA_GROWTH_STEP)
        .checked_add(1)?
        .checked_mul(ARENA_GROWTH_STEP)
}
