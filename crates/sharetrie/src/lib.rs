//! sharetrie - Persistent Hash-Trie Containers
//!
//! Persistent, unordered, hash-indexed containers — a map, a set and a
//! one-to-one bidirectional map — backed by a single bitmap-indexed hash
//! trie with structural sharing and a transactional batch-edit mode.
//!
//! # Key Features
//!
//! - Immutable values: every edit returns a new container, the old one is
//!   unchanged and safe to read from any thread
//! - Structural sharing: versions differing by one edit share every node
//!   off the edit path
//! - Transactions: batch edits reuse freshly allocated nodes in place,
//!   authorized by a process-unique author id that is retired on resolve
//! - Change detection: no-op edits return the *same* root allocation, so
//!   `ptr_eq` doubles as a cheap "did anything change?" probe
//!
//! # Example
//!
//! ```
//! use sharetrie_rs::TrieMap;
//!
//! let m0 = TrieMap::new().insert("foo", 100).insert("bar", 200);
//!
//! // persistent edits branch; m0 is untouched
//! let m1 = m0.insert("foo", 999);
//! assert_eq!(m0.get("foo"), Some(&100));
//! assert_eq!(m1.get("foo"), Some(&999));
//!
//! // batch edits share one author and skip per-edit path copies
//! let m2 = m0.transaction(|tx| {
//!     for word in ["a", "b", "c"] {
//!         tx.insert(word, 1).unwrap();
//!     }
//! });
//! assert_eq!(m2.size(), 5);
//! ```

mod author;
mod bidi;
mod commit;
mod error;
mod invariants;
mod map;
mod node;
mod set;
mod sparse;
mod value_eq;

pub use bidi::BidiMap;
pub use commit::{MapCommit, SetCommit};
pub use error::{CommitError, KeyMissing};
pub use map::{Iter as MapIter, Keys, TrieMap, Values};
pub use set::{Iter as SetIter, TrieSet};
pub use value_eq::ValueEq;
