//! Version branching and batch edits.
//!
//! Run with: `cargo run -p sharetrie-rs --example versioning`

use sharetrie_rs::{trie_map, BidiMap, TrieMap};

fn main() {
    // Every edit is a new version; old versions stay valid.
    let v1 = trie_map!{"config" => 1, "retries" => 3};
    let v2 = v1.insert("retries", 5);
    let v3 = v2.remove("config");

    println!("v1: {v1:?}");
    println!("v2: {v2:?}");
    println!("v3: {v3:?}");
    assert_eq!(v1.get("retries"), Some(&3));
    assert_eq!(v2.get("retries"), Some(&5));
    assert!(!v3.contains_key("config"));

    // No-op edits return the identical allocation: cheap change detection.
    let same = v1.insert("retries", 3);
    println!("no-op insert shared the root: {}", same.ptr_eq(&v1));

    // Batch edits run under one author and reuse in-progress nodes.
    let bulk: TrieMap<u64, u64> = TrieMap::new().transaction(|tx| {
        for i in 0..10_000 {
            tx.insert(i, i * i).unwrap();
        }
    });
    println!("bulk built {} entries", bulk.size());

    // Bidirectional maps keep both directions consistent.
    let seats = BidiMap::new()
        .insert("alice", 1)
        .insert("bob", 2)
        .insert("carol", 2); // evicts bob's pair entirely
    println!("seat 2 belongs to {:?}", seats.key_for(&2));
    assert!(!seats.contains_key("bob"));
}
