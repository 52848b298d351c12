//! Handles into a store's arena.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_STORE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of a [`UniqueStrings`](crate::store::UniqueStrings) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreId(u32);

impl StoreId {
    pub(crate) fn fresh() -> Self {
        StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self { StoreId(raw) }
    pub fn as_u32(self) -> u32 { self.0 }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Offset of a stored string plus the store that issued it.
///
/// A handle holds no address: the owning store recomputes the location on every
/// resolve, so handles survive arena growth and the compaction done by `freeze`.
/// Two handles are equal exactly when they name the same stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    offset: u32,
    owner: StoreId,
}

impl Handle {
    pub(crate) fn new(offset: u32, owner: StoreId) -> Self {
        Self { offset, owner }
    }
    pub fn offset(&self) -> u32 { self.offset }
    pub fn owner(&self) -> StoreId { self.owner }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.owner, self.offset)
    }
}
