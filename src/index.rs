//! Secondary indexes - hash and B-tree
//!
//! Both kinds map a column value to the positions of the rows holding it,
//! in insertion (row) order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::btree::BTree;
use crate::error::{LumaError, Result};
use crate::types::{Row, RowPosition, Value};

/// Common interface of per-column indexes
pub trait RowIndex: Send + Sync {
    /// Record that the row at `position` holds `key`
    fn insert(&mut self, key: &Value, position: RowPosition);
    /// Positions of rows holding `key`, ascending
    fn lookup(&self, key: &Value) -> &[RowPosition];
    fn kind(&self) -> IndexKind;
    /// Number of distinct keys
    fn key_count(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    Hash,
    Ordered,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hash => f.write_str("hash"),
            IndexKind::Ordered => f.write_str("btree"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = LumaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hash" => Ok(IndexKind::Hash),
            "btree" | "ordered" => Ok(IndexKind::Ordered),
            other => Err(LumaError::Command(format!("unknown index kind: {}", other))),
        }
    }
}

/// Fill `index` with one pass over `rows`
pub fn populate<I: RowIndex + ?Sized>(index: &mut I, column: &str, rows: &[Row]) {
    for (position, row) in rows.iter().enumerate() {
        if let Some(value) = row.get(column) {
            index.insert(value, position);
        }
    }
}

/// Hash index: value -> row positions
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    buckets: HashMap<Value, Vec<RowPosition>>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowIndex for HashIndex {
    fn insert(&mut self, key: &Value, position: RowPosition) {
        self.buckets.entry(key.clone()).or_default().push(position);
    }

    fn lookup(&self, key: &Value) -> &[RowPosition] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Hash
    }

    fn key_count(&self) -> usize {
        self.buckets.len()
    }
}

/// B-tree index: value -> row positions
///
/// The payload is the full set of positions for a key, so columns with
/// repeated values resolve completely through the tree.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    tree: BTree<Value, Vec<RowPosition>>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_degree(degree: usize) -> Self {
        Self {
            tree: BTree::with_degree(degree),
        }
    }

    /// Tree height, exposed for diagnostics
    pub fn height(&self) -> usize {
        self.tree.height()
    }
}

impl RowIndex for OrderedIndex {
    fn insert(&mut self, key: &Value, position: RowPosition) {
        match self.tree.search_mut(key) {
            Some(positions) => positions.push(position),
            None => {
                self.tree.insert(key.clone(), vec![position]);
            }
        }
    }

    fn lookup(&self, key: &Value) -> &[RowPosition] {
        self.tree.search(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Ordered
    }

    fn key_count(&self) -> usize {
        self.tree.len()
    }
}
