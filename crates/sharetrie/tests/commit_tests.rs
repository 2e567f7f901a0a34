//! Thread-affinity and lifecycle tests for transaction handles.

use std::sync::{mpsc, Arc};
use std::thread;

use sharetrie_rs::{MapCommit, TrieMap};

#[test]
fn test_foreign_thread_mutation_is_rejected() {
    let m: TrieMap<String, u64> = TrieMap::new().insert("a".to_string(), 1);
    let mut commit = m.transact();
    commit.insert("b".to_string(), 2).unwrap();

    let (to_worker, from_main) = mpsc::channel::<MapCommit<String, u64>>();
    let (to_main, from_worker) = mpsc::channel::<MapCommit<String, u64>>();

    to_worker.send(commit).unwrap();
    let worker = thread::spawn(move || {
        let mut commit = from_main.recv().unwrap();

        // mutations fail before touching anything
        assert!(commit.insert("evil".to_string(), 666).unwrap_err().is_readonly());
        assert!(commit.remove("a").unwrap_err().is_readonly());

        // reads delegate to the immutable trie and ignore thread identity
        assert_eq!(commit.get("b").unwrap(), Some(&2));
        assert_eq!(commit.size().unwrap(), 2);

        to_main.send(commit).unwrap();
    });
    worker.join().unwrap();

    // back on the owning thread the transaction is still healthy
    let mut commit = from_worker.recv().unwrap();
    commit.insert("c".to_string(), 3).unwrap();
    let out = commit.resolve().unwrap();

    assert_eq!(out.size(), 3);
    assert_eq!(out.get("b"), Some(&2));
    assert_eq!(out.get("c"), Some(&3));
    assert!(!out.contains_key("evil"));
    // the source map never saw any of it
    assert_eq!(m.size(), 1);
}

#[test]
fn test_retained_commit_is_dead_after_resolve() {
    let m: TrieMap<u32, u32> = TrieMap::new();
    let mut commit = m.transact();
    commit.insert(1, 1).unwrap();
    let published = commit.resolve().unwrap();
    assert_eq!(published.size(), 1);

    // the handle outlives its transaction; every operation now fails
    assert!(commit.insert(2, 2).unwrap_err().is_resolved());
    assert!(commit.get(&1).unwrap_err().is_resolved());
    assert!(commit.size().unwrap_err().is_resolved());
    assert!(commit.resolve().unwrap_err().is_resolved());

    // the published value is unaffected by the dead handle
    assert_eq!(published.get(&1), Some(&1));
}

#[test]
fn test_published_containers_support_concurrent_readers() {
    let shared: Arc<TrieMap<u32, u32>> = Arc::new((0..1000).map(|i| (i, i + 7)).collect());

    let mut readers = Vec::new();
    for _ in 0..4 {
        let map = Arc::clone(&shared);
        readers.push(thread::spawn(move || {
            for i in 0..1000 {
                assert_eq!(map.get(&i), Some(&(i + 7)));
            }
        }));
    }

    // deriving new versions concurrently never disturbs the published one
    let derived = shared.transaction(|tx| {
        for i in 1000..2000 {
            tx.insert(i, i).unwrap();
        }
    });

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(derived.size(), 2000);
    assert_eq!(shared.size(), 1000);
}

#[test]
fn test_bulk_ops_on_shared_receiver_from_many_threads() {
    let base: Arc<TrieMap<u32, u32>> = Arc::new((0..256).map(|i| (i, i)).collect());
    let extra: TrieMap<u32, u32> = (256..512).map(|i| (i, i)).collect();

    // each bulk call owns its author; concurrent calls on one receiver are
    // safe because receivers are never mutated
    thread::scope(|s| {
        for _ in 0..4 {
            let base = Arc::clone(&base);
            let extra = extra.clone();
            s.spawn(move || {
                let merged = base.merge(&extra);
                assert_eq!(merged.size(), 512);
                let halved = base.filter(|k, _| k % 2 == 0);
                assert_eq!(halved.size(), 128);
            });
        }
    });
    assert_eq!(base.size(), 256);
}

#[test]
fn test_panicking_transaction_discards_partial_trie() {
    let m: TrieMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    let m2 = m.clone();
    let result = std::panic::catch_unwind(move || {
        m2.transaction(|tx| {
            tx.insert(100, 100).unwrap();
            panic!("boom");
        })
    });
    assert!(result.is_err());
    // the source map is preserved; the partial trie is simply dropped
    assert_eq!(m.size(), 10);
    assert!(!m.contains_key(&100));
}
