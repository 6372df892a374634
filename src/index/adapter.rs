//! Defines the `KvStore` trait for pluggable storage backends.

use crate::error::Result;

/// The storage contract the index is built on.
///
/// `KvStore` abstracts over the key-value substrate holding the index. Any
/// backend works as long as it provides:
///
/// - an ordered key space, so that all keys sharing a prefix can be scanned
///   in ascending order,
/// - atomic single-key reads,
/// - atomic batch writes, including clearing every key under a prefix.
///
/// Backends report outages as
/// [`AutocompleteError::StoreUnavailable`](crate::error::AutocompleteError::StoreUnavailable).
/// A failed `write` must leave the store untouched.
///
/// The `Send` and `Sync` bounds are required so that one store can serve
/// concurrent queries and builds.
pub trait KvStore: Send + Sync {
    /// Reads a single key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Returns up to `limit` entries whose keys start with `prefix`, in
    /// ascending key order.
    ///
    /// When `after` is given, scanning resumes strictly after that key,
    /// which lets callers page through large prefixes.
    fn scan_prefix(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>>;

    /// Applies every operation of the batch, in order, as one atomic step.
    fn write(&self, batch: WriteBatch) -> Result<()>;
}

/// A single write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
    /// Removes every key starting with the prefix.
    ClearPrefix { prefix: String },
}

/// An ordered list of writes applied atomically by [`KvStore::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value,
        });
    }

    pub fn delete(&mut self, key: impl Into<String>) {
        self.ops.push(WriteOp::Delete { key: key.into() });
    }

    pub fn clear_prefix(&mut self, prefix: impl Into<String>) {
        self.ops.push(WriteOp::ClearPrefix {
            prefix: prefix.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
