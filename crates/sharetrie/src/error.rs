//! Error types for container and commit operations.
//!
//! All of these are programmer errors, never expected control flow; the
//! library does not recover from them internally, and transactions do not
//! roll back.

use std::thread::ThreadId;
use thiserror::Error;

/// Errors raised by commit (transaction handle) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommitError {
    /// The commit's transaction already resolved. Applies to every method,
    /// reads and a second resolve included, to catch accidental retention.
    #[error("commit was already resolved")]
    Resolved,

    /// A mutation was attempted from a thread other than the one that opened
    /// the transaction. The check runs before any mutation occurs.
    #[error("commit is owned by thread {owner:?}, called from thread {caller:?}")]
    Readonly {
        /// Thread that opened the transaction.
        owner: ThreadId,
        /// Thread that attempted the call.
        caller: ThreadId,
    },
}

impl CommitError {
    /// Returns `true` if the commit was used after resolution.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Returns `true` if the commit was mutated from a non-owning thread.
    #[inline]
    pub fn is_readonly(&self) -> bool {
        matches!(self, Self::Readonly { .. })
    }
}

/// A checked lookup found no entry for the key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("key not found: {key}")]
pub struct KeyMissing {
    /// Debug rendering of the offending key.
    pub key: String,
}
