//! Transaction handles: batch edits that reuse in-progress storage.
//!
//! A commit is a short-lived handle over a container. It owns a fresh,
//! never-reused [`AuthorId`](crate::author::AuthorId); every edit made
//! through it tags newly allocated nodes with that id, which authorizes
//! later edits in the same transaction to mutate those nodes in place
//! instead of copying the path again. Nodes inherited from the source
//! container carry other (retired) tags and are still copied on first
//! touch, so no other version can observe the reuse.
//!
//! Handles are deliberately strict:
//!
//! - every mutation checks the calling thread against the creator before
//!   touching anything (`CommitError::Readonly`);
//! - once resolved, *every* method fails, reads and a second resolve
//!   included (`CommitError::Resolved`) — catching accidental retention of
//!   a handle is worth more than the convenience of late reads.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::author::{next_author, AuthorId};
use crate::error::CommitError;
use crate::map::{MapNode, TrieMap};
use crate::node::Edit;
use crate::set::TrieSet;
use crate::value_eq::ValueEq;

/// A transaction handle over a [`TrieMap`].
///
/// Obtained from [`TrieMap::transact`] or inside [`TrieMap::transaction`].
pub struct MapCommit<K, V> {
    root: Arc<MapNode<K, V>>,
    size: usize,
    author: AuthorId,
    owner: ThreadId,
    resolved: bool,
}

impl<K: Hash + Eq, V: ValueEq> MapCommit<K, V> {
    pub(crate) fn open(map: &TrieMap<K, V>) -> Self {
        MapCommit {
            root: Arc::clone(map.root()),
            size: map.size(),
            author: next_author(),
            owner: thread::current().id(),
            resolved: false,
        }
    }

    fn guard(&self) -> Result<(), CommitError> {
        if self.resolved {
            return Err(CommitError::Resolved);
        }
        Ok(())
    }

    fn guard_mut(&self) -> Result<(), CommitError> {
        self.guard()?;
        let caller = thread::current().id();
        if caller != self.owner {
            return Err(CommitError::Readonly { owner: self.owner, caller });
        }
        Ok(())
    }

    /// Binds `key` to `value` in the working trie.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), CommitError> {
        self.guard_mut()?;
        if TrieMap::insert_in(&mut self.root, key, value, self.author) == Edit::Inserted {
            self.size += 1;
        }
        Ok(())
    }

    /// Removes `key` from the working trie. Returns whether it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<bool, CommitError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.guard_mut()?;
        let removed = TrieMap::remove_in(&mut self.root, key, self.author);
        if removed {
            self.size -= 1;
        }
        Ok(removed)
    }

    /// Reads the working trie. Reads are allowed from any thread, but not
    /// after resolution.
    pub fn get<Q>(&self, key: &Q) -> Result<Option<&V>, CommitError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.guard()?;
        Ok(TrieMap::get_entry(&self.root, key).map(|entry| &entry.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> Result<bool, CommitError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self.get(key)?.is_some())
    }

    /// Entry count of the working trie.
    pub fn size(&self) -> Result<usize, CommitError> {
        self.guard()?;
        Ok(self.size)
    }

    /// Ends the transaction and publishes the working trie as an immutable
    /// map. The author id is retired; nodes it tagged are frozen because no
    /// future probe can present it.
    pub fn resolve(&mut self) -> Result<TrieMap<K, V>, CommitError> {
        self.guard_mut()?;
        self.resolved = true;
        Ok(TrieMap::from_raw(Arc::clone(&self.root), self.size))
    }

    /// Infallible resolution for the closure form: the handle never left
    /// this thread and cannot have been resolved.
    pub(crate) fn finish(mut self) -> TrieMap<K, V> {
        self.resolved = true;
        TrieMap::from_raw(self.root, self.size)
    }
}

/// A transaction handle over a [`TrieSet`].
///
/// Obtained from [`TrieSet::transact`] or inside [`TrieSet::transaction`].
pub struct SetCommit<T> {
    inner: MapCommit<T, ()>,
}

impl<T: Hash + Eq> SetCommit<T> {
    pub(crate) fn open(set: &TrieSet<T>) -> Self {
        SetCommit { inner: MapCommit::open(set.as_map()) }
    }

    /// Adds an element to the working set.
    pub fn insert(&mut self, element: T) -> Result<(), CommitError> {
        self.inner.insert(element, ())
    }

    /// Removes an element. Returns whether it was present.
    pub fn remove<Q>(&mut self, element: &Q) -> Result<bool, CommitError>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(element)
    }

    pub fn contains<Q>(&self, element: &Q) -> Result<bool, CommitError>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    pub fn size(&self) -> Result<usize, CommitError> {
        self.inner.size()
    }

    /// Ends the transaction and publishes the working set.
    pub fn resolve(&mut self) -> Result<TrieSet<T>, CommitError> {
        Ok(TrieSet::from_map(self.inner.resolve()?))
    }

    pub(crate) fn finish(self) -> TrieSet<T> {
        TrieSet::from_map(self.inner.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transact_edit_resolve() {
        let m = TrieMap::new().insert("a", 1);
        let mut commit = m.transact();
        commit.insert("b", 2).unwrap();
        commit.insert("c", 3).unwrap();
        assert_eq!(commit.remove("a").unwrap(), true);
        assert_eq!(commit.get("b").unwrap(), Some(&2));
        assert_eq!(commit.size().unwrap(), 2);
        let out = commit.resolve().unwrap();
        assert_eq!(out.size(), 2);
        assert!(!out.contains_key("a"));
        // the source map is untouched
        assert_eq!(m.get("a"), Some(&1));
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn test_resolved_commit_rejects_everything() {
        let m = TrieMap::new().insert("a", 1);
        let mut commit = m.transact();
        commit.insert("b", 2).unwrap();
        let _ = commit.resolve().unwrap();

        assert_eq!(commit.insert("c", 3), Err(CommitError::Resolved));
        assert_eq!(commit.remove("a"), Err(CommitError::Resolved));
        assert_eq!(commit.get("a"), Err(CommitError::Resolved));
        assert_eq!(commit.size(), Err(CommitError::Resolved));
        assert!(commit.resolve().unwrap_err().is_resolved());
    }

    #[test]
    fn test_transaction_closure_applies_edits_in_order() {
        let m: TrieMap<u32, u64> = TrieMap::new();
        let out = m.transaction(|tx| {
            for i in 0..100 {
                tx.insert(i, u64::from(i) * 2).unwrap();
            }
            for i in 0..50 {
                tx.remove(&i).unwrap();
            }
        });
        assert_eq!(out.size(), 50);
        assert!(!out.contains_key(&0));
        assert_eq!(out.get(&99), Some(&198));
        assert!(m.is_empty());
    }

    #[test]
    fn test_net_nil_transaction_round_trips() {
        let s: TrieSet<u32> = [1, 2, 3].into_iter().collect();
        let out = s.transaction(|tx| {
            tx.insert(4).unwrap();
            tx.remove(&2).unwrap();
            tx.insert(2).unwrap();
            tx.remove(&4).unwrap();
        });
        assert_eq!(out, s);
    }

    #[test]
    fn test_transaction_matches_one_at_a_time_edits() {
        let base: TrieMap<u32, u32> = (0..64).map(|i| (i, i)).collect();
        let via_commit = base.transaction(|tx| {
            for i in 0..32 {
                tx.insert(i, i + 100).unwrap();
            }
            for i in 48..64 {
                tx.remove(&i).unwrap();
            }
        });
        let mut one_at_a_time = base.clone();
        for i in 0..32 {
            one_at_a_time = one_at_a_time.insert(i, i + 100);
        }
        for i in 48..64 {
            one_at_a_time = one_at_a_time.remove(&i);
        }
        assert_eq!(via_commit, one_at_a_time);
    }
}
