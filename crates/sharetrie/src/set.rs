//! Persistent hash set: a map from elements to unit.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::commit::SetCommit;
use crate::map::{self, TrieMap};

/// Creates a [`TrieSet`] containing the given elements:
///
/// ```
/// use sharetrie_rs::{trie_set, TrieSet};
///
/// let s = trie_set!{1, 2, 3};
/// assert_eq!(s.size(), 3);
/// assert!(s.contains(&2));
/// ```
#[macro_export]
macro_rules! trie_set {
    () => {
        $crate::TrieSet::new()
    };
    ($($element:expr),+ $(,)?) => {
        $crate::TrieSet::new().transaction(|tx| {
            $(
                tx.insert($element).expect("open commit");
            )+
        })
    };
}

/// A persistent set of `T` backed by a bitmap-indexed hash trie.
///
/// # Example
///
/// ```
/// use sharetrie_rs::TrieSet;
///
/// let s: TrieSet<u32> = [1, 2, 3].into_iter().collect();
/// let t = s.insert(4);
/// assert!(!s.contains(&4));
/// assert!(t.contains(&4));
///
/// // re-adding an element is a no-op returning the same root
/// assert!(s.insert(2).ptr_eq(&s));
/// ```
pub struct TrieSet<T> {
    map: TrieMap<T, ()>,
}

impl<T> TrieSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        TrieSet { map: TrieMap::new() }
    }

    pub(crate) fn from_map(map: TrieMap<T, ()>) -> Self {
        TrieSet { map }
    }

    pub(crate) fn as_map(&self) -> &TrieMap<T, ()> {
        &self.map
    }

    /// Number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.map.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Constant-time identity check on the backing root.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map)
    }

    /// Iterate the elements. Order is unspecified.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { inner: self.map.keys() }
    }
}

impl<T: Hash + Eq> TrieSet<T> {
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(element)
    }

    /// Returns a set with `element` added. Adding a present element is a
    /// no-op returning a `ptr_eq` set.
    pub fn insert(&self, element: T) -> Self {
        TrieSet { map: self.map.insert(element, ()) }
    }

    /// Returns a set without `element`. Removing an absent element is a
    /// no-op returning a `ptr_eq` set.
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        TrieSet { map: self.map.remove(element) }
    }

    /// Set union. Bulk-inserts the smaller side into the larger inside one
    /// transaction.
    pub fn union(&self, other: &Self) -> Self {
        let (larger, smaller) =
            if self.size() >= other.size() { (self, other) } else { (other, self) };
        TrieSet { map: larger.map.merge(&smaller.map) }
    }

    /// Set intersection. Probes the smaller side against the larger.
    pub fn intersection(&self, other: &Self) -> Self {
        let (larger, smaller) =
            if self.size() >= other.size() { (self, other) } else { (other, self) };
        TrieSet { map: smaller.map.intersect_keys(&larger.map) }
    }

    /// Keeps the elements satisfying `pred`; a pass-everything predicate
    /// returns a `ptr_eq` set.
    pub fn filter<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        TrieSet { map: self.map.filter(|element, _| pred(element)) }
    }

    /// Drops the elements satisfying `pred`.
    pub fn reject<F>(&self, mut pred: F) -> Self
    where
        F: FnMut(&T) -> bool,
    {
        self.filter(|element| !pred(element))
    }

    /// Opens a transaction handle on this set.
    pub fn transact(&self) -> SetCommit<T> {
        SetCommit::open(self)
    }

    /// Runs `f` against a transaction handle and returns the resolved set.
    pub fn transaction<F>(&self, f: F) -> Self
    where
        F: FnOnce(&mut SetCommit<T>),
    {
        let mut commit = self.transact();
        f(&mut commit);
        commit.finish()
    }
}

impl<T> Clone for TrieSet<T> {
    fn clone(&self) -> Self {
        TrieSet { map: self.map.clone() }
    }
}

impl<T> Default for TrieSet<T> {
    fn default() -> Self {
        TrieSet::new()
    }
}

impl<T: Hash + Eq> PartialEq for TrieSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<T: Hash + Eq> Eq for TrieSet<T> {}

impl<T: Hash + Eq> Hash for TrieSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map.hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for TrieSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Hash + Eq> FromIterator<T> for TrieSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        TrieSet { map: iter.into_iter().map(|element| (element, ())).collect() }
    }
}

impl<'a, T> IntoIterator for &'a TrieSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    inner: map::Keys<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }
}

#[cfg(feature = "serde")]
mod serde {
    use super::*;
    use ::serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
    use ::serde::ser::{Serialize, Serializer};
    use std::marker::PhantomData;

    impl<T: Hash + Eq + Serialize> Serialize for TrieSet<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self)
        }
    }

    impl<'de, T: Hash + Eq + Deserialize<'de>> Deserialize<'de> for TrieSet<T> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<TrieSet<T>, D::Error> {
            deserializer.deserialize_seq(TrieSetVisitor { _phantom: PhantomData })
        }
    }

    struct TrieSetVisitor<T> {
        _phantom: PhantomData<T>,
    }

    impl<'de, T: Hash + Eq + Deserialize<'de>> Visitor<'de> for TrieSetVisitor<T> {
        type Value = TrieSet<T>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a sequence")
        }

        fn visit_seq<A>(self, mut access: A) -> Result<TrieSet<T>, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut elements = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(element) = access.next_element()? {
                elements.push(element);
            }
            Ok(elements.into_iter().collect())
        }
    }
}
