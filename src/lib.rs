/*!
# Unique Strings

Deduplicating string store for corpus ingestion. Parsers that emit the same
family / version / vendor tokens millions of times keep a small [`Handle`]
per value instead of a copy, and every distinct value lives exactly once in
a single growable arena.

## Core Features

- **Insert-or-find** in amortized O(1) through a fixed 32-bucket table of
  fingerprint-sorted chains (MurmurHash2 fingerprints)
- **Stable handles**: offset plus owning store, resolved against the arena on
  every access, so arena growth never invalidates them
- **Freeze**: one-way transition that drops the index and compacts the arena
  to its committed size; frozen stores are read-only and shareable
- **Ownership test**: does an address point into this store's bytes

## Architecture

```text
unique-strings
├── store         - UniqueStrings, Phase, StoreStats
│   ├── hash      - MurmurHash2 fingerprints
│   ├── arena     - growable byte arena (1 KiB growth step)
│   ├── handle    - Handle, StoreId
│   └── table     - 32-bucket sorted entry chains
├── core          - StoreError, StoreResult
├── ingest        - line / key-value token ingestion, TOML config
└── cli_common    - logging init, output formatting for the binary
```

## Usage

```rust
use unique_strings::{Phase, UniqueStrings};

let mut store = UniqueStrings::new();
let h1 = store.add_str("Firefox")?;
let h2 = store.add_str("Chrome")?;
let h3 = store.add_str("Firefox")?;
assert_eq!(h1, h3);
assert_ne!(h1, h2);

store.freeze();
assert_eq!(store.phase(), Phase::Frozen);
assert_eq!(store.capacity(), store.bytes_used());

let text = store.resolve(h1)?;
assert_eq!(text, b"Firefox");
assert!(store.owns(text.as_ptr()));
# Ok::<(), unique_strings::StoreError>(())
```
*/

pub mod cli_common;
pub mod core;
pub mod ingest;
pub mod store;

pub use crate::core::{StoreError, StoreResult};
pub use ingest::{ingest_path, IngestConfig, IngestReport, Ingested, Ingestor};
pub use store::{Handle, Phase, StoreId, StoreStats, UniqueStrings};
