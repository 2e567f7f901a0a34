//! Persistent one-to-one bidirectional map.
//!
//! A [`BidiMap`] keeps two tries consistent: `value_of: K → V` and
//! `key_of: V → K`, so that `(k, v)` is in one exactly when `(v, k)` is in
//! the other. Binding a key or a value that is already taken evicts the
//! stale pair from *both* directions before installing the new one. All
//! edits of one `insert` run under a single internal author, so the
//! intermediate states are never materialized.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::author::{next_author, AuthorId};
use crate::map::{self, MapNode, TrieMap};
use crate::value_eq::ValueEq;

/// Creates a [`BidiMap`] containing the given pairs (later pairs evict
/// earlier ones that share a key or a value):
///
/// ```
/// use sharetrie_rs::{bidi_map, BidiMap};
///
/// let b = bidi_map!{"one" => 1, "two" => 2};
/// assert_eq!(b.key_for(&2), Some(&"two"));
/// ```
#[macro_export]
macro_rules! bidi_map {
    () => {
        $crate::BidiMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::BidiMap::new();
        $(
            map = map.insert($key, $value);
        )+
        map
    }};
}

/// A persistent bidirectional map pairing keys and values one-to-one.
///
/// # Example
///
/// ```
/// use sharetrie_rs::BidiMap;
///
/// let b = BidiMap::new().insert("John", 100).insert("Nancy", 200);
/// let b = b.insert("Barbara", 200);
///
/// // 200 now belongs to Barbara; Nancy's pair is gone entirely
/// assert_eq!(b.key_for(&200), Some(&"Barbara"));
/// assert!(!b.contains_key("Nancy"));
/// assert_eq!(b.size(), 2);
/// ```
pub struct BidiMap<K, V> {
    value_of: TrieMap<K, V>,
    key_of: TrieMap<V, K>,
}

impl<K, V> BidiMap<K, V> {
    /// Creates an empty bidirectional map.
    pub fn new() -> Self {
        BidiMap { value_of: TrieMap::new(), key_of: TrieMap::new() }
    }

    /// Number of pairs.
    #[inline]
    pub fn size(&self) -> usize {
        self.value_of.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value_of.is_empty()
    }

    /// Constant-time identity check on both backing roots.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.value_of.ptr_eq(&other.value_of) && self.key_of.ptr_eq(&other.key_of)
    }

    /// Iterate `(&K, &V)` pairs. Order is unspecified.
    pub fn iter(&self) -> map::Iter<'_, K, V> {
        self.value_of.iter()
    }
}

impl<K: Hash + Eq, V: Hash + Eq> BidiMap<K, V> {
    /// The value paired with `key`.
    pub fn value_for<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.value_of.get(key)
    }

    /// The key paired with `value`.
    pub fn key_for<Q>(&self, value: &Q) -> Option<&K>
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.key_of.get(value)
    }

    /// Does `key` have a paired value?
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.value_of.contains_key(key)
    }

    /// Is `value` paired with some key?
    pub fn contains_value<Q>(&self, value: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.key_of.contains_key(value)
    }
}

impl<K, V> BidiMap<K, V>
where
    K: Hash + Eq + Clone + ValueEq,
    V: Hash + Eq + Clone + ValueEq,
{
    /// Install `key ↔ value` into both roots, evicting any stale pairs.
    /// Returns the pair-count delta.
    fn insert_in_both(
        fwd: &mut Arc<MapNode<K, V>>,
        rev: &mut Arc<MapNode<V, K>>,
        key: K,
        value: V,
        author: AuthorId,
    ) -> isize {
        if let Some(entry) = TrieMap::get_entry(fwd.as_ref(), &key) {
            if entry.value.value_eq(&value) {
                return 0; // the exact pair is already present
            }
        }
        let stale_key: Option<K> =
            TrieMap::get_entry(rev.as_ref(), &value).map(|entry| entry.value.clone());
        let stale_value: Option<V> =
            TrieMap::get_entry(fwd.as_ref(), &key).map(|entry| entry.value.clone());
        // `key ↔ stale_value` and `stale_key ↔ value` are one pair, not two,
        // when the stale key is the key being bound
        let same_pair = stale_key.as_ref().map_or(false, |stale| *stale == key);
        let mut delta = 1;
        if let Some(stale) = &stale_key {
            TrieMap::remove_in(fwd, stale, author);
            delta -= 1;
        }
        if let Some(stale) = &stale_value {
            TrieMap::remove_in(rev, stale, author);
            if !same_pair {
                delta -= 1;
            }
        }
        TrieMap::insert_in(fwd, key.clone(), value.clone(), author);
        TrieMap::insert_in(rev, value, key, author);
        delta
    }

    /// Returns a map with `key ↔ value` paired.
    ///
    /// If `key` was paired with some `v'`, the `v' → key` entry is dropped;
    /// if `value` was paired with some `k'`, the `k' → value` entry is
    /// dropped. Re-inserting an existing pair (by value equality) is a no-op
    /// returning a `ptr_eq` map.
    pub fn insert(&self, key: K, value: V) -> Self {
        if let Some(existing) = self.value_of.get(&key) {
            if existing.value_eq(&value) {
                return self.clone();
            }
        }
        let author = next_author();
        let mut fwd = Arc::clone(self.value_of.root());
        let mut rev = Arc::clone(self.key_of.root());
        let delta = Self::insert_in_both(&mut fwd, &mut rev, key, value, author);
        let size = (self.size() as isize + delta) as usize;
        BidiMap {
            value_of: TrieMap::from_raw(fwd, size),
            key_of: TrieMap::from_raw(rev, size),
        }
    }

    /// Removes the pair containing `key`, from both directions.
    pub fn remove_by_key<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(value) = self.value_of.get(key) else {
            return self.clone();
        };
        let author = next_author();
        let mut fwd = Arc::clone(self.value_of.root());
        let mut rev = Arc::clone(self.key_of.root());
        TrieMap::remove_in(&mut fwd, key, author);
        TrieMap::remove_in(&mut rev, value, author);
        let size = self.size() - 1;
        BidiMap {
            value_of: TrieMap::from_raw(fwd, size),
            key_of: TrieMap::from_raw(rev, size),
        }
    }

    /// Removes the pair containing `value`, from both directions.
    pub fn remove_by_value<Q>(&self, value: &Q) -> Self
    where
        V: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(key) = self.key_of.get(value) else {
            return self.clone();
        };
        let author = next_author();
        let mut fwd = Arc::clone(self.value_of.root());
        let mut rev = Arc::clone(self.key_of.root());
        TrieMap::remove_in(&mut fwd, key, author);
        TrieMap::remove_in(&mut rev, value, author);
        let size = self.size() - 1;
        BidiMap {
            value_of: TrieMap::from_raw(fwd, size),
            key_of: TrieMap::from_raw(rev, size),
        }
    }
}

impl<K, V> Clone for BidiMap<K, V> {
    fn clone(&self) -> Self {
        BidiMap { value_of: self.value_of.clone(), key_of: self.key_of.clone() }
    }
}

impl<K, V> Default for BidiMap<K, V> {
    fn default() -> Self {
        BidiMap::new()
    }
}

/// Equal forward maps imply equal reverse maps; only one side is compared.
impl<K: Hash + Eq, V: PartialEq> PartialEq for BidiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.value_of == other.value_of
    }
}

impl<K: Hash + Eq, V: Eq> Eq for BidiMap<K, V> {}

impl<K: Hash + Eq, V: Hash> Hash for BidiMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_of.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BidiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for BidiMap<K, V>
where
    K: Hash + Eq + Clone + ValueEq,
    V: Hash + Eq + Clone + ValueEq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let author = next_author();
        let mut fwd = TrieMap::<K, V>::empty_root();
        let mut rev = TrieMap::<V, K>::empty_root();
        let mut count: isize = 0;
        for (key, value) in iter {
            count += Self::insert_in_both(&mut fwd, &mut rev, key, value, author);
        }
        let size = count as usize;
        BidiMap {
            value_of: TrieMap::from_raw(fwd, size),
            key_of: TrieMap::from_raw(rev, size),
        }
    }
}
