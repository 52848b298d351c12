//! Hash-indexed entry table used while a store is building.
//!
//! Fixed number of buckets, each a singly linked chain of entries kept in
//! non-increasing fingerprint order. Entries live in one `Vec` and link to
//! each other by index, so dropping the table is a flat deallocation no matter
//! how long the chains get.

use crate::store::arena::Arena;
use crate::store::handle::Handle;

/// Number of bucket heads.
pub const BUCKET_COUNT: usize = 32;

/// Index of an entry inside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u32);

#[derive(Debug, Clone)]
struct Entry {
    fingerprint: u32,
    handle: Handle,
    /// Length of the stored text without the terminator.
    len: u32,
    next: Option<EntryId>,
}

/// Where a missing string has to be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    bucket: usize,
    /// Last entry whose fingerprint is `>=` the new one; `None` means the bucket head.
    after: Option<EntryId>,
    fingerprint: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(Handle),
    Vacant(InsertPoint),
}

#[derive(Debug)]
pub struct EntryTable {
    heads: [Option<EntryId>; BUCKET_COUNT],
    entries: Vec<Entry>,
}

impl Default for EntryTable {
    fn default() -> Self { Self::new() }
}

impl EntryTable {
    pub fn new() -> Self {
        Self { heads: [None; BUCKET_COUNT], entries: Vec::new() }
    }

    pub fn bucket_of(fingerprint: u32) -> usize {
        fingerprint as usize % BUCKET_COUNT
    }

    fn entry(&self, id: EntryId) -> &Entry { &self.entries[id.0 as usize] }

    /// Walks the bucket for `fingerprint` looking for `text`.
    ///
    /// Stops at the first entry with a smaller fingerprint: because chains are
    /// sorted descending, an equal string cannot appear after it.
    pub fn find(&self, fingerprint: u32, text: &[u8], arena: &Arena) -> Lookup {
        let bucket = Self::bucket_of(fingerprint);
        let mut after = None;
        let mut cur = self.heads[bucket];

        while let Some(id) = cur {
            let entry = self.entry(id);
            if entry.fingerprint < fingerprint {
                break;
            }
            if entry.fingerprint == fingerprint && entry.len as usize == text.len() {
                let start = entry.handle.offset() as usize;
                if arena.bytes(start..start + text.len()) == Some(text) {
                    return Lookup::Found(entry.handle);
                }
            }
            after = Some(id);
            cur = entry.next;
        }

        Lookup::Vacant(InsertPoint { bucket, after, fingerprint })
    }

    /// Links a new entry at `point`, i.e. right before the first entry with a
    /// smaller fingerprint.
    ///
    /// `point` must come from [`EntryTable::find`] with no link in between.
    pub fn link(&mut self, point: InsertPoint, handle: Handle, len: u32) -> EntryId {
        let id = EntryId(self.entries.len() as u32);
        let next = match point.after {
            Some(prev) => self.entries[prev.0 as usize].next.replace(id),
            None => self.heads[point.bucket].replace(id),
        };
        self.entries.push(Entry { fingerprint: point.fingerprint, handle, len, next });
        id
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn chain_len(&self, bucket: usize) -> usize {
        self.chain(bucket).count()
    }

    /// Fingerprints of one bucket in chain order.
    pub fn chain(&self, bucket: usize) -> impl Iterator<Item = u32> + '_ {
        let mut cur = self.heads.get(bucket).copied().flatten();
        std::iter::from_fn(move || {
            let entry = self.entry(cur?);
            cur = entry.next;
            Some(entry.fingerprint)
        })
    }

    /// Every chain is in non-increasing fingerprint order.
    pub fn is_sorted(&self) -> bool {
        (0..BUCKET_COUNT).all(|bucket| {
            let chain: Vec<u32> = self.chain(bucket).collect();
            chain.windows(2).all(|w| w[0] >= w[1])
        })
    }

    /// Drops every entry and resets the bucket heads.
    pub fn clear(&mut self) {
        self.heads = [None; BUCKET_COUNT];
        self.entries = Vec::new();
    }
}
