//! Debug assertion macros for trie invariants.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds.
//!
//! Used by `SparseArray<T>` and the node probe operations.

// =============================================================================
// INV-LEN-01: Packed Buffer Length
// =============================================================================

/// Assert that the packed buffer holds exactly one element per set bitmap bit.
///
/// **Invariant**: `buf.len() == popcount(bitmap)`
///
/// Used in: `SparseArray` after every in-place edit
macro_rules! debug_assert_packed {
    ($len:expr, $bitmap:expr) => {
        debug_assert!(
            $len == $bitmap.count_ones() as usize,
            "INV-LEN-01 violated: buffer length {} does not match bitmap population {}",
            $len,
            $bitmap.count_ones()
        )
    };
}

// =============================================================================
// INV-SLOT-01: Single Occupancy
// =============================================================================

/// Assert that an index is occupied in at most one of a node's two arrays.
///
/// **Invariant**: for every index, `items` and `children` are not both set
///
/// Used in: node `add`/`delete` after slot writes
macro_rules! debug_assert_exclusive_slot {
    ($items_occupied:expr, $children_occupied:expr, $index:expr) => {
        debug_assert!(
            !($items_occupied && $children_occupied),
            "INV-SLOT-01 violated: index {} occupied in both items and children",
            $index
        )
    };
}

// =============================================================================
// INV-AUTH-01: Author Exclusivity
// =============================================================================

/// Assert that a node whose writer tag authorizes the live transaction is
/// uniquely referenced.
///
/// **Invariant**: a node array tagged with a live author is reachable only
/// from the trie version that transaction holds
///
/// Used in: the in-place write paths when `Arc::get_mut` is expected to
/// succeed. Release builds fall back to copy-on-write, which is always safe.
macro_rules! debug_assert_author_exclusive {
    ($unique:expr) => {
        debug_assert!(
            $unique,
            "INV-AUTH-01 violated: node authored by a live transaction is shared"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_author_exclusive;
pub(crate) use debug_assert_exclusive_slot;
pub(crate) use debug_assert_packed;
