/*!
# Unique String Store

Дедуплицирующее хранилище строк. Каждая различная строка хранится ровно
один раз в общей арене; вызывающий код получает лёгкий [`Handle`] вместо
копии текста.

## Жизненный цикл

```text
Building --freeze()--> Frozen
    \                    /
     `---- drop/destroy -'
```

- **Building**: `add` ищет строку в хэш-таблице и либо возвращает
  существующий handle, либо дописывает байты в арену.
- **Frozen**: таблица удалена, арена сжата до занятого размера. Доступны
  только `resolve`, `owns` и итерация; `add` возвращает
  [`StoreError::Frozen`].

## Использование

```rust
use unique_strings::UniqueStrings;

let mut store = UniqueStrings::new();
let firefox = store.add_str("Firefox")?;
let chrome = store.add_str("Chrome")?;
assert_eq!(store.add_str("Firefox")?, firefox);

store.freeze();
assert_eq!(store.resolve_str(firefox)?, "Firefox");
assert_eq!(store.resolve_str(chrome)?, "Chrome");
# Ok::<(), unique_strings::StoreError>(())
```
*/

pub mod arena;
pub mod handle;
pub mod hash;
pub mod table;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{StoreError, StoreResult};
use arena::Arena;
pub use handle::{Handle, StoreId};
use table::{EntryTable, Lookup};

/// Фаза жизненного цикла хранилища
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Building,
    Frozen,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Building => write!(f, "building"),
            Phase::Frozen => write!(f, "frozen"),
        }
    }
}

/// The dedup index only exists while building.
#[derive(Debug)]
enum State {
    Building(EntryTable),
    Frozen,
}

/// Статистика хранилища
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub phase: Phase,
    /// Различных строк в арене
    pub strings: usize,
    /// Успешных вызовов `add`
    pub add_calls: u64,
    /// Вызовов `add`, вернувших уже существующий handle
    pub dedup_hits: u64,
    /// Занято байт (включая терминаторы)
    pub bytes_used: usize,
    /// Зарезервировано байт
    pub bytes_capacity: usize,
    pub grow_events: u32,
}

impl StoreStats {
    /// Доля вызовов `add`, не потребовавших новой памяти
    pub fn dedup_ratio(&self) -> f64 {
        if self.add_calls == 0 {
            0.0
        } else {
            self.dedup_hits as f64 / self.add_calls as f64
        }
    }

    /// Байт, которые заняли бы строки без дедупликации, минус фактически занятые.
    /// Оценка: считаем, что повторы в среднем такой же длины, как уникальные строки.
    pub fn estimated_bytes_saved(&self) -> usize {
        if self.strings == 0 {
            return 0;
        }
        let avg = self.bytes_used / self.strings;
        avg * self.dedup_hits as usize
    }
}

/// Deduplicating string store.
///
/// Not internally synchronized: `add` and `freeze` take `&mut self`, so sharing
/// a building store across threads requires an external lock. Once frozen the
/// store is read-only and can be shared by reference (or `Arc`) freely.
#[derive(Debug)]
pub struct UniqueStrings {
    id: StoreId,
    arena: Arena,
    state: State,
    strings: usize,
    add_calls: u64,
    dedup_hits: u64,
}

impl Default for UniqueStrings {
    fn default() -> Self { Self::new() }
}

impl UniqueStrings {
    pub fn new() -> Self {
        Self::from_arena(Arena::new())
    }

    /// Store with `bytes` of arena space reserved up front.
    pub fn with_capacity(bytes: usize) -> StoreResult<Self> {
        Ok(Self::from_arena(Arena::with_capacity(bytes)?))
    }

    fn from_arena(arena: Arena) -> Self {
        let id = StoreId::fresh();
        tracing::debug!("store {} created", id);
        Self {
            id,
            arena,
            state: State::Building(EntryTable::new()),
            strings: 0,
            add_calls: 0,
            dedup_hits: 0,
        }
    }

    pub fn id(&self) -> StoreId { self.id }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Building(_) => Phase::Building,
            State::Frozen => Phase::Frozen,
        }
    }

    pub fn is_frozen(&self) -> bool { self.phase() == Phase::Frozen }

    /// Number of distinct strings stored.
    pub fn len(&self) -> usize { self.strings }
    pub fn is_empty(&self) -> bool { self.strings == 0 }

    /// Inserts `text` unless an equal string is already stored, and returns its handle.
    ///
    /// Equal inputs get equal handles for the whole building phase. Fails with
    /// [`StoreError::Frozen`] after [`freeze`](Self::freeze), and with
    /// [`StoreError::InteriorNul`] if `text` contains a NUL byte.
    pub fn add<B: AsRef<[u8]>>(&mut self, text: B) -> StoreResult<Handle> {
        let text = text.as_ref();
        let table = match &mut self.state {
            State::Building(table) => table,
            State::Frozen => {
                tracing::warn!("add rejected: store {} is frozen", self.id);
                return Err(StoreError::Frozen { store: self.id });
            }
        };
        if let Some(position) = text.iter().position(|&b| b == 0) {
            return Err(StoreError::InteriorNul { position });
        }

        let fingerprint = hash::fingerprint(text);
        let handle = match table.find(fingerprint, text, &self.arena) {
            Lookup::Found(handle) => {
                self.dedup_hits += 1;
                tracing::trace!("dedup hit {} ({} bytes)", handle, text.len());
                handle
            }
            Lookup::Vacant(point) => {
                // +1 под терминатор; allocate отдаёт обнулённые байты
                let offset = self.arena.allocate(text.len() + 1)?;
                self.arena.write(offset, text);
                let handle = Handle::new(offset, self.id);
                table.link(point, handle, text.len() as u32);
                self.strings += 1;
                handle
            }
        };
        self.add_calls += 1;
        Ok(handle)
    }

    pub fn add_str(&mut self, text: &str) -> StoreResult<Handle> {
        self.add(text.as_bytes())
    }

    /// Finds `text` without inserting it. Always `None` once frozen.
    pub fn lookup<B: AsRef<[u8]>>(&self, text: B) -> Option<Handle> {
        let text = text.as_ref();
        match &self.state {
            State::Building(table) => match table.find(hash::fingerprint(text), text, &self.arena) {
                Lookup::Found(handle) => Some(handle),
                Lookup::Vacant(_) => None,
            },
            State::Frozen => None,
        }
    }

    /// Stored bytes for `handle`, without the terminator.
    ///
    /// The location is recomputed from the arena on each call.
    pub fn resolve(&self, handle: Handle) -> StoreResult<&[u8]> {
        if handle.owner() != self.id {
            return Err(StoreError::ForeignHandle { store: self.id, handle_owner: handle.owner() });
        }
        let invalid = || StoreError::InvalidHandle { offset: handle.offset(), used: self.arena.used() };
        let tail = self.arena.tail_from(handle.offset()).ok_or_else(invalid)?;
        let end = tail.iter().position(|&b| b == 0).ok_or_else(invalid)?;
        Ok(&tail[..end])
    }

    pub fn resolve_str(&self, handle: Handle) -> StoreResult<&str> {
        Ok(std::str::from_utf8(self.resolve(handle)?)?)
    }

    /// Whether `addr` points into this store's committed bytes.
    pub fn owns(&self, addr: *const u8) -> bool {
        self.arena.contains_addr(addr as usize)
    }

    /// Whether `text` starts inside this store's committed bytes.
    pub fn owns_bytes(&self, text: &[u8]) -> bool {
        self.owns(text.as_ptr())
    }

    /// Drops the dedup index and compacts the arena. One-way.
    ///
    /// Handles issued earlier keep resolving. Freezing a frozen store does nothing.
    pub fn freeze(&mut self) {
        match std::mem::replace(&mut self.state, State::Frozen) {
            State::Building(table) => {
                let entries = table.len();
                drop(table);
                let before = self.arena.capacity();
                self.arena.compact();
                tracing::debug!(
                    "store {} frozen: {} entries released, arena {} -> {} bytes",
                    self.id,
                    entries,
                    before,
                    self.arena.capacity()
                );
            }
            State::Frozen => {
                tracing::debug!("store {} already frozen", self.id);
            }
        }
    }

    /// Releases the index and the arena. Every handle issued by this store
    /// becomes meaningless; the borrow checker already forbids resolving through it.
    pub fn destroy(self) {
        drop(self);
    }

    /// Stored strings in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &[u8])> + '_ {
        let id = self.id;
        let bytes = self.arena.as_bytes();
        let mut offset = 0usize;
        std::iter::from_fn(move || {
            let rest = bytes.get(offset..).filter(|rest| !rest.is_empty())?;
            let end = rest.iter().position(|&b| b == 0)?;
            let item = (Handle::new(offset as u32, id), &rest[..end]);
            offset += end + 1;
            Some(item)
        })
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            phase: self.phase(),
            strings: self.strings,
            add_calls: self.add_calls,
            dedup_hits: self.dedup_hits,
            bytes_used: self.arena.used(),
            bytes_capacity: self.arena.capacity(),
            grow_events: self.arena.grow_events(),
        }
    }

    /// Reserved arena bytes.
    pub fn capacity(&self) -> usize { self.arena.capacity() }
    /// Committed arena bytes, terminators included.
    pub fn bytes_used(&self) -> usize { self.arena.used() }
}

impl Drop for UniqueStrings {
    fn drop(&mut self) {
        if let State::Building(table) = &mut self.state {
            table.clear();
        }
        tracing::debug!(
            "store {} destroyed ({} strings, {} bytes)",
            self.id,
            self.strings,
            self.arena.used()
        );
        self.arena.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_deduplicates() {
        let mut store = UniqueStrings::new();
        let h1 = store.add_str("Firefox").unwrap();
        let h2 = store.add_str("Chrome").unwrap();
        let h3 = store.add_str("Firefox").unwrap();

        assert_eq!(h1, h3);
        assert_ne!(h1, h2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.resolve_str(h1).unwrap(), "Firefox");
        assert_eq!(store.resolve_str(h2).unwrap(), "Chrome");
        // "Firefox\0Chrome\0"
        assert_eq!(store.bytes_used(), 15);
    }

    #[test]
    fn test_empty_string() {
        let mut store = UniqueStrings::new();
        let empty = store.add("").unwrap();
        let again = store.add(b"").unwrap();
        assert_eq!(empty, again);
        assert_eq!(store.resolve(empty).unwrap(), b"");
        assert!(store.owns_bytes(store.resolve(empty).unwrap()));
    }

    #[test]
    fn test_interior_nul_rejected() {
        let mut store = UniqueStrings::new();
        let err = store.add(b"ab\0cd").unwrap_err();
        assert!(matches!(err, StoreError::InteriorNul { position: 2 }));
        assert!(store.is_empty());
        assert_eq!(store.bytes_used(), 0);
    }

    #[test]
    fn test_add_after_freeze_is_rejected() {
        let mut store = UniqueStrings::new();
        let h = store.add_str("Opera").unwrap();
        store.freeze();

        let err = store.add_str("Opera").unwrap_err();
        assert!(matches!(err, StoreError::Frozen { .. }));
        assert!(err.is_contract_violation());
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes_used(), 6);
        assert_eq!(store.resolve_str(h).unwrap(), "Opera");
    }

    #[test]
    fn test_freeze_twice_is_noop() {
        let mut store = UniqueStrings::new();
        store.add_str("Safari").unwrap();
        store.freeze();
        let stats = store.stats();
        store.freeze();
        assert_eq!(store.stats(), stats);
        assert_eq!(store.phase(), Phase::Frozen);
    }

    #[test]
    fn test_lookup() {
        let mut store = UniqueStrings::new();
        assert_eq!(store.lookup("Edge"), None);
        let h = store.add_str("Edge").unwrap();
        assert_eq!(store.lookup("Edge"), Some(h));
        assert_eq!(store.len(), 1);

        store.freeze();
        assert_eq!(store.lookup("Edge"), None);
    }

    #[test]
    fn test_foreign_handle() {
        let mut a = UniqueStrings::new();
        let mut b = UniqueStrings::new();
        let ha = a.add_str("same").unwrap();
        let hb = b.add_str("same").unwrap();
        assert_eq!(ha.offset(), hb.offset());
        assert_ne!(ha, hb);

        let err = b.resolve(ha).unwrap_err();
        assert!(matches!(err, StoreError::ForeignHandle { .. }));
    }

    #[test]
    fn test_invalid_offset() {
        let mut store = UniqueStrings::new();
        store.add_str("x").unwrap();
        let bogus = Handle::new(100, store.id());
        assert!(matches!(store.resolve(bogus), Err(StoreError::InvalidHandle { offset: 100, used: 2 })));
    }

    #[test]
    fn test_resolve_str_utf8_error() {
        let mut store = UniqueStrings::new();
        let h = store.add(&[0xff, 0xfe][..]).unwrap();
        assert_eq!(store.resolve(h).unwrap(), &[0xff, 0xfe]);
        assert!(matches!(store.resolve_str(h), Err(StoreError::Utf8(_))));
    }

    #[test]
    fn test_iter_in_arena_order() {
        let mut store = UniqueStrings::new();
        let a = store.add_str("Android").unwrap();
        let b = store.add_str("").unwrap();
        let c = store.add_str("iOS").unwrap();
        store.add_str("Android").unwrap();

        let items: Vec<(Handle, &[u8])> = store.iter().collect();
        assert_eq!(items, vec![(a, &b"Android"[..]), (b, &b""[..]), (c, &b"iOS"[..])]);
    }

    #[test]
    fn test_stats() {
        let mut store = UniqueStrings::new();
        for family in ["Chrome", "Chrome", "Firefox", "Chrome"] {
            store.add_str(family).unwrap();
        }
        let stats = store.stats();
        assert_eq!(stats.phase, Phase::Building);
        assert_eq!(stats.strings, 2);
        assert_eq!(stats.add_calls, 4);
        assert_eq!(stats.dedup_hits, 2);
        assert_eq!(stats.bytes_used, 15);
        assert_eq!(stats.bytes_capacity, 1024);
        assert_eq!(stats.dedup_ratio(), 0.5);
        assert_eq!(stats.estimated_bytes_saved(), 14);

        store.freeze();
        let stats = store.stats();
        assert_eq!(stats.phase, Phase::Frozen);
        assert_eq!(stats.bytes_capacity, 15);
    }

    #[test]
    fn test_destroy_either_phase() {
        let mut building = UniqueStrings::new();
        building.add_str("Linux").unwrap();
        building.destroy();

        let mut frozen = UniqueStrings::with_capacity(4096).unwrap();
        frozen.add_str("Linux").unwrap();
        frozen.freeze();
        frozen.destroy();
    }

    #[test]
    fn test_with_capacity_huge_request_fails_cleanly() {
        let err = UniqueStrings::with_capacity(usize::MAX).unwrap_err();
        assert!(err.is_resource_exhaustion());
        assert!(!err.is_contract_violation());
        assert!(matches!(err, StoreError::CapacityOverflow { requested: usize::MAX, .. }));
    }

    #[test]
    fn test_store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UniqueStrings>();
        assert_send_sync::<Handle>();
    }
}
