//! Serde round-trips for the serde feature.
//!
//! Run with: `cargo test --features serde --test serde_tests`

#![cfg(feature = "serde")]

use sharetrie_rs::{TrieMap, TrieSet};

#[test]
fn test_map_json_roundtrip() {
    let m: TrieMap<String, u64> =
        [("a", 1), ("b", 2), ("c", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let json = serde_json::to_string(&m).unwrap();
    let back: TrieMap<String, u64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
}

#[test]
fn test_set_json_roundtrip() {
    let s: TrieSet<u32> = (0..100).collect();
    let json = serde_json::to_string(&s).unwrap();
    let back: TrieSet<u32> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_empty_containers_roundtrip() {
    let m: TrieMap<String, u64> = TrieMap::new();
    let back: TrieMap<String, u64> = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
    assert!(back.is_empty());
}
