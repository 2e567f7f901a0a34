//! Persistent hash map with structural sharing.
//!
//! A [`TrieMap`] is a thin value around a trie root and an element count.
//! Every edit returns a new map; sub-tries off the edit path are shared with
//! the original. Bulk operations (`merge`, `filter`, `map_entries`, ...)
//! open an internal transaction so intermediate versions are never
//! materialized.
//!
//! Entries are stored behind `Arc`, so copy-on-write of a node clones
//! pointers, never keys or values.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::author::{next_author, AuthorId};
use crate::commit::MapCommit;
use crate::error::KeyMissing;
use crate::node::{self, Edit, Node, Probe, WriteProbe};
use crate::value_eq::ValueEq;

/// Derive a 64-bit trie path from a key. Deterministic within a process so
/// that independently built equal containers agree on layout.
pub(crate) fn hash64<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A stored key/value pair.
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

pub(crate) type MapNode<K, V> = Node<Arc<Entry<K, V>>>;

/// Lookup/delete probe: matches on the key alone.
struct LookupProbe<'a, Q: ?Sized> {
    key: &'a Q,
    path: u64,
}

impl<'a, K, V, Q> Probe<Arc<Entry<K, V>>> for LookupProbe<'a, Q>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    fn path(&self) -> u64 {
        self.path
    }

    fn matches(&self, stored: &Arc<Entry<K, V>>) -> bool {
        stored.key.borrow() == self.key
    }

    fn path_of(&self, stored: &Arc<Entry<K, V>>) -> u64 {
        hash64(&stored.key)
    }
}

/// Insert probe: matches on the key, overwrites unless the stored value is
/// already value-equal to the incoming one.
struct EntryProbe<K, V> {
    entry: Arc<Entry<K, V>>,
    path: u64,
}

impl<K: Hash + Eq, V: ValueEq> Probe<Arc<Entry<K, V>>> for EntryProbe<K, V> {
    fn path(&self) -> u64 {
        self.path
    }

    fn matches(&self, stored: &Arc<Entry<K, V>>) -> bool {
        stored.key == self.entry.key
    }

    fn path_of(&self, stored: &Arc<Entry<K, V>>) -> u64 {
        hash64(&stored.key)
    }
}

impl<K: Hash + Eq, V: ValueEq> WriteProbe<Arc<Entry<K, V>>> for EntryProbe<K, V> {
    fn replaces(&self, stored: &Arc<Entry<K, V>>) -> bool {
        !stored.value.value_eq(&self.entry.value)
    }
}

/// Creates a [`TrieMap`] containing the given entries:
///
/// ```
/// use sharetrie_rs::{trie_map, TrieMap};
///
/// let m = trie_map!{"one" => 1, "two" => 2, "three" => 3};
/// assert_eq!(m.size(), 3);
/// assert_eq!(m.get("two"), Some(&2));
/// ```
#[macro_export]
macro_rules! trie_map {
    () => {
        $crate::TrieMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::TrieMap::new().transaction(|tx| {
            $(
                tx.insert($key, $value).expect("open commit");
            )+
        })
    };
}

/// A persistent map from `K` to `V` backed by a bitmap-indexed hash trie.
///
/// # Example
///
/// ```
/// use sharetrie_rs::TrieMap;
///
/// let m0 = TrieMap::new().insert("foo", 100).insert("bar", 200);
/// let m1 = m0.insert("foo", 999);
///
/// // m0 is a value; the edit produced a new version sharing its structure
/// assert_eq!(m0.get("foo"), Some(&100));
/// assert_eq!(m1.get("foo"), Some(&999));
///
/// // re-inserting the stored value is a no-op returning the same root
/// assert!(m0.insert("foo", 100).ptr_eq(&m0));
/// ```
pub struct TrieMap<K, V> {
    root: Arc<MapNode<K, V>>,
    size: usize,
}

impl<K, V> TrieMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        TrieMap { root: Arc::new(Node::new()), size: 0 }
    }

    pub(crate) fn from_raw(root: Arc<MapNode<K, V>>, size: usize) -> Self {
        TrieMap { root, size }
    }

    pub(crate) fn empty_root() -> Arc<MapNode<K, V>> {
        Arc::new(Node::new())
    }

    pub(crate) fn root(&self) -> &Arc<MapNode<K, V>> {
        &self.root
    }

    pub(crate) fn entries(&self) -> node::Iter<'_, Arc<Entry<K, V>>> {
        node::Iter::new(&self.root)
    }

    /// Number of entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Constant-time identity check: do both maps share the same root
    /// allocation? Used as a fast equality and as a change-detection
    /// primitive — no-op edits return `ptr_eq` maps.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Iterate `(&K, &V)` pairs. Order is unspecified and may vary between
    /// versions of the same map.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { inner: self.entries() }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K: Hash + Eq, V> TrieMap<K, V> {
    pub(crate) fn get_entry<'a, Q>(root: &'a MapNode<K, V>, key: &Q) -> Option<&'a Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let probe = LookupProbe { key, path: hash64(key) };
        node::fetch(root, &probe).map(AsRef::as_ref)
    }

    pub(crate) fn remove_in<Q>(root: &mut Arc<MapNode<K, V>>, key: &Q, author: AuthorId) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let probe = LookupProbe { key, path: hash64(key) };
        node::delete(root, probe.path, 0, &probe, author)
    }

    /// Looks up the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self::get_entry(&self.root, key).map(|entry| &entry.value)
    }

    /// Looks up `key`, falling back to `default` when absent.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Checked lookup: absent keys are an error carrying the offending key.
    pub fn fetch<Q>(&self, key: &Q) -> Result<&V, KeyMissing>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(key).ok_or_else(|| KeyMissing { key: format!("{key:?}") })
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns a map without `key`. When `key` is absent the result shares
    /// this map's root.
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut root = Arc::clone(&self.root);
        if Self::remove_in(&mut root, key, AuthorId::NONE) {
            TrieMap { root, size: self.size - 1 }
        } else {
            self.clone()
        }
    }
}

impl<K: Hash + Eq, V: ValueEq> TrieMap<K, V> {
    pub(crate) fn insert_entry_in(
        root: &mut Arc<MapNode<K, V>>,
        entry: Arc<Entry<K, V>>,
        author: AuthorId,
    ) -> Edit {
        let path = hash64(&entry.key);
        let probe = EntryProbe { entry, path };
        node::add(root, path, 0, &probe, Arc::clone(&probe.entry), author)
    }

    pub(crate) fn insert_in(
        root: &mut Arc<MapNode<K, V>>,
        key: K,
        value: V,
        author: AuthorId,
    ) -> Edit {
        Self::insert_entry_in(root, Arc::new(Entry { key, value }), author)
    }

    /// Returns a map with `key` bound to `value`.
    ///
    /// When the stored value is already value-equal to `value` the edit is a
    /// no-op and the result is `ptr_eq` to this map.
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut root = Arc::clone(&self.root);
        match Self::insert_in(&mut root, key, value, AuthorId::NONE) {
            Edit::Inserted => TrieMap { root, size: self.size + 1 },
            Edit::Replaced => TrieMap { root, size: self.size },
            Edit::Unchanged => self.clone(),
        }
    }

    /// Applies `f` to the current value of `key`, or inserts `default` when
    /// the key is absent.
    pub fn update<F>(&self, key: K, default: V, f: F) -> Self
    where
        F: FnOnce(&V) -> V,
    {
        match self.get(&key) {
            Some(current) => {
                let next = f(current);
                self.insert(key, next)
            }
            None => self.insert(key, default),
        }
    }

    /// Right-biased merge: entries of `other` win on key conflicts.
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        let author = next_author();
        let mut root = Arc::clone(&self.root);
        let mut size = self.size;
        for entry in other.entries() {
            if Self::insert_entry_in(&mut root, Arc::clone(entry), author) == Edit::Inserted {
                size += 1;
            }
        }
        TrieMap { root, size }
    }

    /// Merge with a conflict combiner: `combine(key, ours, theirs)` decides
    /// the value stored for keys present on both sides.
    pub fn merge_with<F>(&self, other: &Self, mut combine: F) -> Self
    where
        K: Clone,
        F: FnMut(&K, &V, &V) -> V,
    {
        let author = next_author();
        let mut root = Arc::clone(&self.root);
        let mut size = self.size;
        for entry in other.entries() {
            let merged = match Self::get_entry(&self.root, &entry.key) {
                Some(existing) => {
                    let value = combine(&entry.key, &existing.value, &entry.value);
                    Arc::new(Entry { key: entry.key.clone(), value })
                }
                None => Arc::clone(entry),
            };
            if Self::insert_entry_in(&mut root, merged, author) == Edit::Inserted {
                size += 1;
            }
        }
        TrieMap { root, size }
    }

    /// Keeps the entries satisfying `pred`. Runs one transaction deleting
    /// the rest, so a map where everything passes comes back `ptr_eq`.
    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
    {
        let author = next_author();
        let mut root = Arc::clone(&self.root);
        let mut size = self.size;
        for entry in self.entries() {
            if !pred(&entry.key, &entry.value) && Self::remove_in(&mut root, &entry.key, author) {
                size -= 1;
            }
        }
        TrieMap { root, size }
    }

    /// Drops the entries satisfying `pred`.
    pub fn reject<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.filter(|key, value| !pred(key, value))
    }

    /// Keeps exactly the listed keys (absent keys are ignored).
    pub fn filter_keys<'q, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let author = next_author();
        let mut root = Arc::new(Node::new());
        let mut size = 0;
        for key in keys {
            let probe = LookupProbe { key, path: hash64(key) };
            if let Some(entry) = node::fetch(&self.root, &probe) {
                if Self::insert_entry_in(&mut root, Arc::clone(entry), author) == Edit::Inserted {
                    size += 1;
                }
            }
        }
        TrieMap { root, size }
    }

    /// Drops the listed keys.
    pub fn reject_keys<'q, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let author = next_author();
        let mut root = Arc::clone(&self.root);
        let mut size = self.size;
        for key in keys {
            if Self::remove_in(&mut root, key, author) {
                size -= 1;
            }
        }
        TrieMap { root, size }
    }

    /// Keeps the entries of `self` whose keys are also in `other`.
    pub(crate) fn intersect_keys(&self, other: &Self) -> Self {
        let author = next_author();
        let mut root = Arc::new(Node::new());
        let mut size = 0;
        for entry in self.entries() {
            if Self::get_entry(&other.root, &entry.key).is_some()
                && Self::insert_entry_in(&mut root, Arc::clone(entry), author) == Edit::Inserted
            {
                size += 1;
            }
        }
        TrieMap { root, size }
    }

    /// Rebuilds the map through `f` applied to every entry.
    pub fn map_entries<L, W, F>(&self, mut f: F) -> TrieMap<L, W>
    where
        L: Hash + Eq,
        W: ValueEq,
        F: FnMut(&K, &V) -> (L, W),
    {
        let author = next_author();
        let mut root = Arc::new(Node::new());
        let mut size = 0;
        for entry in self.entries() {
            let (key, value) = f(&entry.key, &entry.value);
            if TrieMap::insert_in(&mut root, key, value, author) == Edit::Inserted {
                size += 1;
            }
        }
        TrieMap { root, size }
    }

    /// Rebuilds the map with keys passed through `f`. Keys mapping to the
    /// same image collapse; the surviving value is unspecified.
    pub fn map_keys<L, F>(&self, mut f: F) -> TrieMap<L, V>
    where
        L: Hash + Eq,
        V: Clone,
        F: FnMut(&K) -> L,
    {
        self.map_entries(|key, value| (f(key), value.clone()))
    }

    /// Rebuilds the map with values passed through `f`.
    pub fn map_values<W, F>(&self, mut f: F) -> TrieMap<K, W>
    where
        K: Clone,
        W: ValueEq,
        F: FnMut(&V) -> W,
    {
        self.map_entries(|key, value| (key.clone(), f(value)))
    }

    /// Opens a transaction handle on this map. Mutations through the handle
    /// reuse freshly allocated nodes in place; `resolve` publishes the
    /// result as an immutable map.
    pub fn transact(&self) -> MapCommit<K, V> {
        MapCommit::open(self)
    }

    /// Runs `f` against a transaction handle and returns the resolved map.
    /// If `f` panics the partial trie is discarded and the panic propagates.
    pub fn transaction<F>(&self, f: F) -> Self
    where
        F: FnOnce(&mut MapCommit<K, V>),
    {
        let mut commit = self.transact();
        f(&mut commit);
        commit.finish()
    }
}

impl<K: Hash + Eq + Clone, V: Clone + ValueEq> TrieMap<K, Option<V>> {
    /// Drops `None` entries and unwraps the rest.
    pub fn compact(&self) -> TrieMap<K, V> {
        let author = next_author();
        let mut root = Arc::new(Node::new());
        let mut size = 0;
        for entry in self.entries() {
            if let Some(value) = &entry.value {
                if TrieMap::insert_in(&mut root, entry.key.clone(), value.clone(), author)
                    == Edit::Inserted
                {
                    size += 1;
                }
            }
        }
        TrieMap { root, size }
    }
}

impl<K, V> Clone for TrieMap<K, V> {
    fn clone(&self) -> Self {
        TrieMap { root: Arc::clone(&self.root), size: self.size }
    }
}

impl<K, V> Default for TrieMap<K, V> {
    fn default() -> Self {
        TrieMap::new()
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for TrieMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.iter().all(|(key, value)| other.get(key).map_or(false, |w| *value == *w))
    }
}

impl<K: Hash + Eq, V: Eq> Eq for TrieMap<K, V> {}

/// Order-independent hash: entry hashes are combined commutatively because
/// iteration order is unspecified.
impl<K: Hash + Eq, V: Hash> Hash for TrieMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut acc: u64 = 0;
        for (key, value) in self.iter() {
            let mut entry_hasher = FxHasher::default();
            key.hash(&mut entry_hasher);
            value.hash(&mut entry_hasher);
            acc = acc.wrapping_add(entry_hasher.finish());
        }
        state.write_u64(acc);
        state.write_usize(self.size);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TrieMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Unchecked lookup.
///
/// # Panics
///
/// Panics with the missing-key message when `key` is absent.
impl<K, V, Q> Index<&Q> for TrieMap<K, V>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + fmt::Debug + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("{}", KeyMissing { key: format!("{key:?}") }),
        }
    }
}

impl<K: Hash + Eq, V: ValueEq> FromIterator<(K, V)> for TrieMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let author = next_author();
        let mut root = Arc::new(Node::new());
        let mut size = 0;
        for (key, value) in iter {
            if Self::insert_in(&mut root, key, value, author) == Edit::Inserted {
                size += 1;
            }
        }
        TrieMap { root, size }
    }
}

impl<'a, K, V> IntoIterator for &'a TrieMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

pub struct Iter<'a, K, V> {
    inner: node::Iter<'a, Arc<Entry<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        self.inner.next().map(|entry| (&entry.key, &entry.value))
    }
}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    use super::*;
    use ::serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use ::serde::ser::{Serialize, Serializer};
    use std::marker::PhantomData;

    impl<K, V> Serialize for TrieMap<K, V>
    where
        K: Hash + Eq + Serialize,
        V: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_map(self)
        }
    }

    impl<'de, K, V> Deserialize<'de> for TrieMap<K, V>
    where
        K: Hash + Eq + Deserialize<'de>,
        V: ValueEq + Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<TrieMap<K, V>, D::Error> {
            deserializer.deserialize_map(TrieMapVisitor { _phantom: PhantomData })
        }
    }

    struct TrieMapVisitor<K, V> {
        _phantom: PhantomData<(K, V)>,
    }

    impl<'de, K, V> Visitor<'de> for TrieMapVisitor<K, V>
    where
        K: Hash + Eq + Deserialize<'de>,
        V: ValueEq + Deserialize<'de>,
    {
        type Value = TrieMap<K, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map")
        }

        fn visit_map<A>(self, mut access: A) -> Result<TrieMap<K, V>, A::Error>
        where
            A: MapAccess<'de>,
        {
            let author = next_author();
            let mut root = Arc::new(Node::new());
            let mut size = 0;
            while let Some((key, value)) = access.next_entry()? {
                if TrieMap::insert_in(&mut root, key, value, author) == Edit::Inserted {
                    size += 1;
                }
            }
            Ok(TrieMap::from_raw(root, size))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lookup_roundtrip() {
        let m = TrieMap::new().insert("one", 1).insert("two", 2);
        assert_eq!(m.size(), 2);
        assert_eq!(m.get("one"), Some(&1));
        assert_eq!(m.get("two"), Some(&2));
        assert_eq!(m.get("three"), None);
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let m = TrieMap::new().insert("k", 1).insert("k", 2);
        assert_eq!(m.size(), 1);
        assert_eq!(m.get("k"), Some(&2));
    }

    #[test]
    fn test_remove_roundtrip() {
        let m = TrieMap::new().insert("k", 1);
        let n = m.remove("k");
        assert!(!n.contains_key("k"));
        assert_eq!(n.size(), 0);
        assert!(n.is_empty());
        // removing an absent key shares the root
        assert!(m.remove("nope").ptr_eq(&m));
    }

    #[test]
    fn test_versions_are_independent() {
        let m0 = TrieMap::new().insert("foo", 100).insert("bar", 200);
        let m1 = m0.insert("foo", 999);
        let m2 = m0.remove("bar");
        assert_eq!(m0.get("foo"), Some(&100));
        assert_eq!(m1.get("foo"), Some(&999));
        assert!(!m2.contains_key("bar"));
        assert_eq!(m0.get("bar"), Some(&200));
    }

    #[test]
    fn test_value_equal_reinsert_is_identity() {
        let m = TrieMap::new().insert("k", 7u64);
        assert!(m.insert("k", 7).ptr_eq(&m));
        assert!(!m.insert("k", 8).ptr_eq(&m));
    }

    #[test]
    fn test_borrowed_key_lookup() {
        let m: TrieMap<String, u32> = TrieMap::new().insert("alpha".to_string(), 1);
        // &str lookups against String keys
        assert_eq!(m.get("alpha"), Some(&1));
        assert!(m.contains_key("alpha"));
        assert!(m.remove("alpha").is_empty());
    }

    #[test]
    fn test_get_or_and_fetch() {
        let m = TrieMap::new().insert("k", 1);
        assert_eq!(m.get_or("k", &9), &1);
        assert_eq!(m.get_or("absent", &9), &9);
        assert_eq!(m.fetch("k"), Ok(&1));
        let err = m.fetch("absent").unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_panics_on_missing_key() {
        let m: TrieMap<&str, u32> = TrieMap::new();
        let _ = m["nope"];
    }

    #[test]
    fn test_update() {
        let m = TrieMap::new().update("hits", 1u64, |n| n + 1);
        assert_eq!(m.get("hits"), Some(&1));
        let m = m.update("hits", 1, |n| n + 1);
        assert_eq!(m.get("hits"), Some(&2));
    }

    #[test]
    fn test_merge_right_bias() {
        let a = TrieMap::new().insert("x", 1).insert("y", 2);
        let b = TrieMap::new().insert("y", 20).insert("z", 30);
        let m = a.merge(&b);
        assert_eq!(m.size(), 3);
        assert_eq!(m.get("x"), Some(&1));
        assert_eq!(m.get("y"), Some(&20));
        assert_eq!(m.get("z"), Some(&30));
    }

    #[test]
    fn test_merge_with_combiner() {
        let a = TrieMap::new().insert("y", 2u64);
        let b = TrieMap::new().insert("y", 20).insert("z", 30);
        let m = a.merge_with(&b, |_, ours, theirs| ours + theirs);
        assert_eq!(m.get("y"), Some(&22));
        assert_eq!(m.get("z"), Some(&30));
    }

    #[test]
    fn test_filter_and_reject() {
        let m: TrieMap<u32, u32> = (0..20).map(|i| (i, i * i)).collect();
        let even = m.filter(|k, _| k % 2 == 0);
        assert_eq!(even.size(), 10);
        assert!(even.contains_key(&4));
        assert!(!even.contains_key(&5));
        let odd = m.reject(|k, _| k % 2 == 0);
        assert_eq!(odd.size(), 10);
        assert!(odd.contains_key(&5));
        // a pass-everything filter shares the root
        assert!(m.filter(|_, _| true).ptr_eq(&m));
    }

    #[test]
    fn test_filter_keys_and_reject_keys() {
        let m: TrieMap<String, u32> =
            [("a", 1), ("b", 2), ("c", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let picked = m.filter_keys(["a", "c", "ghost"]);
        assert_eq!(picked.size(), 2);
        assert!(picked.contains_key("a"));
        assert!(!picked.contains_key("b"));
        let rest = m.reject_keys(["a"]);
        assert_eq!(rest.size(), 2);
        assert!(!rest.contains_key("a"));
    }

    #[test]
    fn test_map_entries_keys_values() {
        let m = TrieMap::new().insert("a".to_string(), 1u64).insert("b".to_string(), 2);
        let doubled = m.map_values(|v| v * 2);
        assert_eq!(doubled.get("a"), Some(&2));
        let upper = m.map_keys(|k| k.to_uppercase());
        assert_eq!(upper.get("A"), Some(&1));
        let flipped: TrieMap<u64, String> = m.map_entries(|k, v| (*v, k.clone()));
        assert_eq!(flipped.get(&1), Some(&"a".to_string()));
    }

    #[test]
    fn test_compact() {
        let m: TrieMap<&str, Option<u32>> =
            TrieMap::new().insert("a", Some(1)).insert("b", None).insert("c", Some(3));
        let compacted = m.compact();
        assert_eq!(compacted.size(), 2);
        assert_eq!(compacted.get("a"), Some(&1));
        assert!(!compacted.contains_key("b"));
    }

    #[test]
    fn test_equality_ignores_build_order() {
        let a: TrieMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
        let b: TrieMap<u32, u32> = (0..50).rev().map(|i| (i, i)).collect();
        assert_eq!(a, b);
        assert_ne!(a, b.insert(99, 99));
    }

    #[test]
    fn test_hash_is_order_independent() {
        fn hash_of<T: Hash>(value: &T) -> u64 {
            let mut hasher = FxHasher::default();
            value.hash(&mut hasher);
            hasher.finish()
        }
        let a: TrieMap<u32, u32> = (0..50).map(|i| (i, i)).collect();
        let b: TrieMap<u32, u32> = (0..50).rev().map(|i| (i, i)).collect();
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_iteration_covers_all_entries() {
        let m: TrieMap<u32, u32> = (0..500).map(|i| (i, i + 1)).collect();
        assert_eq!(m.size(), 500);
        let mut keys: Vec<u32> = m.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..500).collect::<Vec<_>>());
        let total: u32 = m.values().sum();
        assert_eq!(total, (0..500).map(|i| i + 1).sum());
    }
}
