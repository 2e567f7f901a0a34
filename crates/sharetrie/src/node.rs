//! The bitmap-indexed hash trie node and its probe operations.
//!
//! =============================================================================
//! STRUCTURAL SHARING & WRITE AUTHORIZATION STRATEGY
//! =============================================================================
//!
//! Every node owns two sparse arrays: `items` (values terminating at this
//! depth) and `children` (sub-tries for values whose paths continue). A key's
//! 64-bit path is consumed 5 bits at a time, low bits first; each window
//! selects one of 32 slots. For any index, at most one of the two arrays is
//! occupied.
//!
//! ## Copy-on-write by default
//!
//! Published containers share nodes freely across versions, so the default
//! write strategy is copy-on-write: an edit rebuilds the node with one slot
//! changed and returns the copy to its parent, which in turn copies, up to
//! the root. Sub-tries off the edit path are shared untouched.
//!
//! ## In-place writes under an author
//!
//! A transaction allocates a unique, never-reused [`AuthorId`]. Each array
//! carries the id under which it was last rebuilt (`writer_items`,
//! `writer_children`). A write may mutate an array in place iff the probing
//! author is live and equals the array's writer: such an array was allocated
//! during this very transaction and is reachable only through the
//! transaction's private root.
//!
//! The single-writer invariant makes the unsynchronized `Arc::get_mut` access
//! safe: an authored node has exactly one strong reference (its parent slot
//! in the transaction's trie). Debug builds assert this; release builds fall
//! back to copy-on-write, which is always correct.
//!
//! ## Path exhaustion
//!
//! 64 bits / 5 bits per level = 13 levels. At depth 13 the path is exhausted
//! and the node switches to collision-bucket mode: `items` is linearly
//! probed (slot 0 stays free), and `children` slot 0 chains an overflow
//! bucket once all 31 item slots fill. Same-path, non-matching values
//! coexist without loss at any count.

use std::sync::Arc;

use crate::author::AuthorId;
use crate::invariants::{debug_assert_author_exclusive, debug_assert_exclusive_slot};
use crate::sparse::{SparseArray, SLOTS};

/// Path bits consumed per trie level.
pub(crate) const BITS: u32 = 5;
/// Window mask for one level: the low 5 bits.
const MASK: u64 = (1 << BITS) - 1;
/// Levels before a 64-bit path is exhausted.
pub(crate) const MAX_DEPTH: u32 = 13;

/// What a container asks the trie to look for.
///
/// The node knows nothing about keys or hashes; the probe carries the path
/// and the match predicate, which is what lets one node type power maps,
/// sets and bidirectional maps.
pub(crate) trait Probe<T> {
    /// Full 64-bit path of the probed key.
    fn path(&self) -> u64;
    /// Does this stored value satisfy the lookup?
    fn matches(&self, stored: &T) -> bool;
    /// Full path of an already-stored value, needed when a slot is promoted
    /// into a sub-trie.
    fn path_of(&self, stored: &T) -> u64;
}

/// A probe that may also overwrite a matching value.
pub(crate) trait WriteProbe<T>: Probe<T> {
    /// Should a matching stored value be overwritten? Returning false here
    /// is the structural-sharing fast path: the whole edit becomes a no-op.
    fn replaces(&self, stored: &T) -> bool;
}

/// Outcome of an `add` probe, as seen by the container's size accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit {
    /// A new value was stored; the container grew by one.
    Inserted,
    /// A matching value was overwritten; the size did not change.
    Replaced,
    /// Nothing changed; the root handle was left untouched.
    Unchanged,
}

pub(crate) struct Node<T> {
    items: SparseArray<T>,
    children: SparseArray<Arc<Node<T>>>,
    writer_items: AuthorId,
    writer_children: AuthorId,
}

impl<T> Node<T> {
    /// An empty node immutable to everyone.
    pub(crate) fn new() -> Self {
        Node {
            items: SparseArray::new(),
            children: SparseArray::new(),
            writer_items: AuthorId::NONE,
            writer_children: AuthorId::NONE,
        }
    }

    /// An empty node whose arrays the given author may mutate in place.
    fn new_authored(author: AuthorId) -> Self {
        Node {
            items: SparseArray::new(),
            children: SparseArray::new(),
            writer_items: author,
            writer_children: author,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty() && self.children.is_empty()
    }
}

// ---------------------------------------------------------------------
// FETCH
// ---------------------------------------------------------------------

/// Walk the trie for a value satisfying the probe.
pub(crate) fn fetch<'a, T, P: Probe<T>>(root: &'a Node<T>, probe: &P) -> Option<&'a T> {
    let mut node = root;
    let mut path = probe.path();
    for _ in 0..MAX_DEPTH {
        let index = (path & MASK) as u32;
        if let Some(stored) = node.items.get(index) {
            if probe.matches(stored) {
                return Some(stored);
            }
        }
        match node.children.get(index) {
            Some(child) => {
                node = child;
                path >>= BITS;
            }
            None => return None,
        }
    }
    // Path exhausted: scan the collision bucket chain.
    loop {
        if let Some(found) = node.items.iter().find(|stored| probe.matches(stored)) {
            return Some(found);
        }
        match node.children.get(0) {
            Some(child) => node = child,
            None => return None,
        }
    }
}

// ---------------------------------------------------------------------
// ADD
// ---------------------------------------------------------------------

/// Insert or replace a value. `path` is the probe's path with `depth` levels
/// already shifted off.
pub(crate) fn add<T: Clone, P: WriteProbe<T>>(
    link: &mut Arc<Node<T>>,
    path: u64,
    depth: u32,
    probe: &P,
    value: T,
    author: AuthorId,
) -> Edit {
    if depth >= MAX_DEPTH {
        return add_collision(link, probe, value, author);
    }
    let index = (path & MASK) as u32;

    if let Some(stored) = link.items.get(index) {
        if probe.matches(stored) {
            if !probe.replaces(stored) {
                // Structural sharing fast path: nothing to do, the caller
                // keeps the identical root.
                return Edit::Unchanged;
            }
            set_item(link, index, value, author);
            return Edit::Replaced;
        }
        // Non-matching occupant: promote the slot into a sub-trie holding
        // both values. Writes both arrays, so in-place needs both tags.
        if author.can_write(link.writer_items) && author.can_write(link.writer_children) {
            if let Some(node) = Arc::get_mut(link) {
                let stored = node
                    .items
                    .without_mut(index)
                    .expect("item occupancy checked above");
                let child = promote_child(stored, path, depth, probe, value, author);
                node.children.with_mut(index, child);
                debug_assert_exclusive_slot!(
                    node.items.contains(index),
                    node.children.contains(index),
                    index
                );
                return Edit::Inserted;
            }
            debug_assert_author_exclusive!(false);
        }
        let stored = match link.items.get(index) {
            Some(stored) => stored.clone(),
            None => unreachable!("item occupancy checked above"),
        };
        let child = promote_child(stored, path, depth, probe, value, author);
        let next = Node {
            items: link.items.without(index),
            children: link.children.with(index, child),
            writer_items: author,
            writer_children: author,
        };
        *link = Arc::new(next);
        return Edit::Inserted;
    }

    if link.children.contains(index) {
        return add_into_child(link, index, path >> BITS, depth + 1, probe, value, author);
    }

    set_item(link, index, value, author);
    Edit::Inserted
}

/// Build the sub-trie that replaces a promoted item slot: a fresh child one
/// level deeper holding the evicted occupant, with the new value inserted by
/// recursion. The two paths may collide over several successive windows,
/// producing a chain of single-child nodes until they diverge.
fn promote_child<T: Clone, P: WriteProbe<T>>(
    stored: T,
    path: u64,
    depth: u32,
    probe: &P,
    value: T,
    author: AuthorId,
) -> Arc<Node<T>> {
    let mut child_node = Node::new_authored(author);
    if depth + 1 >= MAX_DEPTH {
        // The occupant lands in the collision bucket; slot 0 stays free for
        // the overflow chain.
        child_node.items.with_mut(1, stored);
    } else {
        let stored_index = ((probe.path_of(&stored) >> ((depth + 1) * BITS)) & MASK) as u32;
        child_node.items.with_mut(stored_index, stored);
    }
    let mut child = Arc::new(child_node);
    let edit = add(&mut child, path >> BITS, depth + 1, probe, value, author);
    debug_assert!(matches!(edit, Edit::Inserted), "promoted values cannot match");
    child
}

/// Recurse into an occupied child slot, in place when the author owns the
/// children array, otherwise on a detached handle written back copy-on-write.
fn add_into_child<T: Clone, P: WriteProbe<T>>(
    link: &mut Arc<Node<T>>,
    index: u32,
    path: u64,
    depth: u32,
    probe: &P,
    value: T,
    author: AuthorId,
) -> Edit {
    if author.can_write(link.writer_children) {
        if let Some(node) = Arc::get_mut(link) {
            let child = node
                .children
                .get_mut(index)
                .expect("child occupancy checked by caller");
            return add(child, path, depth, probe, value, author);
        }
        debug_assert_author_exclusive!(false);
    }
    let mut child = match link.children.get(index) {
        Some(child) => Arc::clone(child),
        None => unreachable!("child occupancy checked by caller"),
    };
    let edit = add(&mut child, path, depth, probe, value, author);
    if edit != Edit::Unchanged {
        set_child(link, index, child, author);
    }
    edit
}

/// Insert into a path-exhausted bucket: replace a match, take the first free
/// item slot, or push down the overflow chain.
fn add_collision<T: Clone, P: WriteProbe<T>>(
    link: &mut Arc<Node<T>>,
    probe: &P,
    value: T,
    author: AuthorId,
) -> Edit {
    let hit = link
        .items
        .entries()
        .find(|(_, stored)| probe.matches(stored))
        .map(|(index, stored)| (index, probe.replaces(stored)));
    if let Some((index, wants_replace)) = hit {
        if !wants_replace {
            return Edit::Unchanged;
        }
        set_item(link, index, value, author);
        return Edit::Replaced;
    }
    if let Some(index) = (1..SLOTS).find(|&i| !link.items.contains(i)) {
        set_item(link, index, value, author);
        return Edit::Inserted;
    }
    if link.children.contains(0) {
        // Recursing with an exhausted depth routes straight back into
        // collision handling for the chained bucket.
        return add_into_child(link, 0, 0, MAX_DEPTH, probe, value, author);
    }
    let mut bucket = Node::new_authored(author);
    bucket.items.with_mut(1, value);
    set_child(link, 0, Arc::new(bucket), author);
    Edit::Inserted
}

// ---------------------------------------------------------------------
// DELETE
// ---------------------------------------------------------------------

/// Clear the slot holding a matching value. Returns whether anything was
/// removed; an untouched trie keeps its identical root handle.
pub(crate) fn delete<T: Clone, P: Probe<T>>(
    link: &mut Arc<Node<T>>,
    path: u64,
    depth: u32,
    probe: &P,
    author: AuthorId,
) -> bool {
    if depth >= MAX_DEPTH {
        return delete_collision(link, probe, author);
    }
    let index = (path & MASK) as u32;
    if let Some(stored) = link.items.get(index) {
        if probe.matches(stored) {
            remove_item(link, index, author);
            return true;
        }
        // Occupied by a different key; single occupancy rules out a child
        // at this index, so the probed key is absent.
        return false;
    }
    if link.children.contains(index) {
        return delete_from_child(link, index, path >> BITS, depth + 1, probe, author);
    }
    false
}

fn delete_from_child<T: Clone, P: Probe<T>>(
    link: &mut Arc<Node<T>>,
    index: u32,
    path: u64,
    depth: u32,
    probe: &P,
    author: AuthorId,
) -> bool {
    if author.can_write(link.writer_children) {
        if let Some(node) = Arc::get_mut(link) {
            let removed = {
                let child = node
                    .children
                    .get_mut(index)
                    .expect("child occupancy checked by caller");
                delete(child, path, depth, probe, author)
            };
            if removed {
                let emptied = node.children.get(index).map_or(false, |c| c.is_empty());
                if emptied {
                    node.children.without_mut(index);
                }
            }
            return removed;
        }
        debug_assert_author_exclusive!(false);
    }
    let mut child = match link.children.get(index) {
        Some(child) => Arc::clone(child),
        None => unreachable!("child occupancy checked by caller"),
    };
    let removed = delete(&mut child, path, depth, probe, author);
    if removed {
        let next = Node {
            items: link.items.clone(),
            children: if child.is_empty() {
                link.children.without(index)
            } else {
                link.children.with(index, child)
            },
            writer_items: link.writer_items,
            writer_children: author,
        };
        *link = Arc::new(next);
    }
    removed
}

fn delete_collision<T: Clone, P: Probe<T>>(
    link: &mut Arc<Node<T>>,
    probe: &P,
    author: AuthorId,
) -> bool {
    let hit = link
        .items
        .entries()
        .find(|(_, stored)| probe.matches(stored))
        .map(|(index, _)| index);
    if let Some(index) = hit {
        remove_item(link, index, author);
        return true;
    }
    if link.children.contains(0) {
        return delete_from_child(link, 0, 0, MAX_DEPTH, probe, author);
    }
    false
}

// ---------------------------------------------------------------------
// SLOT WRITES (the authorization protocol lives here)
// ---------------------------------------------------------------------

fn set_item<T: Clone>(link: &mut Arc<Node<T>>, index: u32, value: T, author: AuthorId) {
    if author.can_write(link.writer_items) {
        if let Some(node) = Arc::get_mut(link) {
            node.items.with_mut(index, value);
            return;
        }
        debug_assert_author_exclusive!(false);
    }
    let next = Node {
        items: link.items.with(index, value),
        children: link.children.clone(),
        writer_items: author,
        writer_children: link.writer_children,
    };
    *link = Arc::new(next);
}

fn remove_item<T: Clone>(link: &mut Arc<Node<T>>, index: u32, author: AuthorId) {
    if author.can_write(link.writer_items) {
        if let Some(node) = Arc::get_mut(link) {
            node.items.without_mut(index);
            return;
        }
        debug_assert_author_exclusive!(false);
    }
    let next = Node {
        items: link.items.without(index),
        children: link.children.clone(),
        writer_items: author,
        writer_children: link.writer_children,
    };
    *link = Arc::new(next);
}

fn set_child<T: Clone>(link: &mut Arc<Node<T>>, index: u32, child: Arc<Node<T>>, author: AuthorId) {
    if author.can_write(link.writer_children) {
        if let Some(node) = Arc::get_mut(link) {
            node.children.with_mut(index, child);
            return;
        }
        debug_assert_author_exclusive!(false);
    }
    let next = Node {
        items: link.items.clone(),
        children: link.children.with(index, child),
        writer_items: link.writer_items,
        writer_children: author,
    };
    *link = Arc::new(next);
}

// ---------------------------------------------------------------------
// TRAVERSAL
// ---------------------------------------------------------------------

/// Depth-first walk over every stored value. Order is unspecified and may
/// vary across container versions.
pub(crate) struct Iter<'a, T> {
    items: std::slice::Iter<'a, T>,
    children: Vec<std::slice::Iter<'a, Arc<Node<T>>>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: &'a Node<T>) -> Self {
        let mut children = Vec::with_capacity(MAX_DEPTH as usize + 1);
        children.push(root.children.iter());
        Iter { items: root.items.iter(), children }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.items.next() {
                return Some(item);
            }
            let child = loop {
                let frame = self.children.last_mut()?;
                match frame.next() {
                    Some(child) => break child,
                    None => {
                        self.children.pop();
                    }
                }
            };
            self.items = child.items.iter();
            self.children.push(child.children.iter());
        }
    }
}
