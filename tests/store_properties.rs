//! Behavioural properties of the store across both phases.
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use unique_strings::{Handle, Phase, StoreError, UniqueStrings};

fn all_non_nul_bytes() -> Vec<u8> {
    (1..=255u8).collect()
}

#[test]
fn browser_family_scenario() {
    let mut store = UniqueStrings::new();
    let h1 = store.add_str("Firefox").unwrap();
    let h2 = store.add_str("Chrome").unwrap();
    let h3 = store.add_str("Firefox").unwrap();

    assert_eq!(h1, h3);
    assert_ne!(h2, h1);
    assert_eq!(h1.offset(), h3.offset());
    assert_eq!(store.resolve_str(h1).unwrap(), "Firefox");
    assert_eq!(store.resolve_str(h2).unwrap(), "Chrome");

    store.freeze();
    assert_eq!(store.resolve_str(h1).unwrap(), "Firefox");
    assert_eq!(store.resolve_str(h2).unwrap(), "Chrome");
    let addr = store.resolve(h1).unwrap().as_ptr();
    assert!(store.owns(addr));
}

#[test]
fn content_fidelity_for_every_byte_value() {
    let mut store = UniqueStrings::new();
    let every = all_non_nul_bytes();
    let mut inputs: Vec<Vec<u8>> = vec![Vec::new(), every.clone()];
    inputs.extend(every.iter().map(|&b| vec![b]));
    inputs.extend((1..=9).map(|n| every[..n].to_vec()));

    let handles: Vec<Handle> = inputs.iter().map(|s| store.add(s).unwrap()).collect();
    for (input, handle) in inputs.iter().zip(&handles) {
        let resolved = store.resolve(*handle).unwrap();
        assert_eq!(resolved.len(), input.len());
        assert_eq!(resolved, input.as_slice());
    }
}

#[test]
fn dedup_identity_is_same_offset() {
    let mut store = UniqueStrings::new();
    let words = ["Windows", "Mac OS X", "Ubuntu", "Windows", "iOS", "Ubuntu", "Windows"];
    let handles: Vec<Handle> = words.iter().map(|w| store.add_str(w).unwrap()).collect();

    assert_eq!(store.len(), 4);
    assert_eq!(handles[0], handles[3]);
    assert_eq!(handles[0], handles[6]);
    assert_eq!(handles[2], handles[5]);
    assert_eq!(
        store.resolve(handles[0]).unwrap().as_ptr(),
        store.resolve(handles[6]).unwrap().as_ptr()
    );
}

#[test]
fn handles_survive_growth() {
    let mut store = UniqueStrings::new();
    let early: Vec<(Handle, String)> = (0..50)
        .map(|i| {
            let s = format!("early-{}", i);
            (store.add_str(&s).unwrap(), s)
        })
        .collect();
    let grow_before = store.stats().grow_events;

    for i in 0..20_000 {
        store.add_str(&format!("Device/Model-{:05}/Build", i)).unwrap();
    }
    assert!(store.stats().grow_events > grow_before + 10);

    for (handle, text) in &early {
        assert_eq!(store.resolve_str(*handle).unwrap(), text);
    }
    // повторная вставка после роста всё ещё находит старые строки
    for (handle, text) in &early {
        assert_eq!(store.add_str(text).unwrap(), *handle);
    }
}

#[test]
fn no_duplicates_under_heavy_collisions() {
    let mut store = UniqueStrings::new();
    let words: Vec<String> = (0..3000).map(|i| format!("v{}", i % 1000)).collect();
    let handles: Vec<Handle> = words.iter().map(|w| store.add_str(w).unwrap()).collect();

    assert_eq!(store.len(), 1000);
    for i in 0..1000 {
        assert_eq!(handles[i], handles[i + 1000]);
        assert_eq!(handles[i], handles[i + 2000]);
    }
    assert_eq!(store.iter().count(), 1000);
}

#[test]
fn freeze_compacts_to_committed_size() {
    let mut store = UniqueStrings::new();
    let handles: Vec<Handle> = (0..500).map(|i| store.add_str(&format!("Vendor{}", i)).unwrap()).collect();
    assert!(store.capacity() > store.bytes_used());

    store.freeze();
    assert_eq!(store.phase(), Phase::Frozen);
    assert_eq!(store.capacity(), store.bytes_used());
    for (i, h) in handles.iter().enumerate() {
        assert_eq!(store.resolve_str(*h).unwrap(), format!("Vendor{}", i));
    }
}

#[test]
fn freeze_on_empty_store() {
    let mut store = UniqueStrings::new();
    store.freeze();
    assert_eq!(store.capacity(), 0);
    assert_eq!(store.bytes_used(), 0);
    assert!(store.is_empty());
}

#[test]
fn post_freeze_add_is_rejected_without_side_effects() {
    let mut store = UniqueStrings::new();
    let h = store.add_str("Samsung").unwrap();
    store.freeze();
    let before = store.stats();

    for text in ["Samsung", "Apple"] {
        match store.add_str(text) {
            Err(StoreError::Frozen { store: id }) => assert_eq!(id, store.id()),
            other => panic!("expected Frozen, got {:?}", other),
        }
    }
    assert_eq!(store.stats(), before);
    assert_eq!(store.resolve_str(h).unwrap(), "Samsung");
}

#[test]
fn ownership_test_accuracy() {
    let mut store = UniqueStrings::new();
    let handles: Vec<Handle> = ["HTC", "LG", "Nokia"].iter().map(|s| store.add_str(s).unwrap()).collect();

    for h in &handles {
        let bytes = store.resolve(*h).unwrap();
        assert!(store.owns_bytes(bytes));
        assert!(store.owns(bytes[bytes.len() - 1..].as_ptr()));
    }

    let outside = String::from("HTC");
    assert!(!store.owns_bytes(outside.as_bytes()));

    let last = store.resolve(handles[2]).unwrap();
    // адрес терминатора последней строки входит в занятый диапазон, следующий — нет
    let end = last.as_ptr().wrapping_add(last.len() + 1);
    assert!(!store.owns(end));

    store.freeze();
    for h in &handles {
        assert!(store.owns_bytes(store.resolve(*h).unwrap()));
    }
}

#[test]
fn frozen_store_shared_across_readers() {
    let mut store = UniqueStrings::new();
    let handles: Vec<Handle> = (0..100).map(|i| store.add_str(&format!("Bot{}", i)).unwrap()).collect();
    store.freeze();

    let store = Arc::new(store);
    let handles = Arc::new(handles);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let handles = Arc::clone(&handles);
            thread::spawn(move || {
                handles
                    .iter()
                    .enumerate()
                    .all(|(i, h)| store.resolve_str(*h).unwrap() == format!("Bot{}", i))
            })
        })
        .collect();

    for worker in workers {
        assert!(worker.join().unwrap());
    }
}

#[test]
fn handles_are_scoped_to_their_store() {
    let mut a = UniqueStrings::new();
    let mut b = UniqueStrings::new();
    let ha = a.add_str("Kindle").unwrap();
    b.add_str("Kindle").unwrap();

    let err = b.resolve(ha).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(err, StoreError::ForeignHandle { .. }));
}
