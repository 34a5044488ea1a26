//! B-tree - balanced multi-way search tree backing ordered indexes
//!
//! Insert/search only. Nodes are split proactively on the way down, so an
//! insert never has to walk back up the tree:
//!
//! - a full root is split first, growing the tree by one level
//! - a full child is split before it is entered
//! - the target leaf therefore always has room for one more entry
//!
//! With minimum degree `d`, every non-root node holds between `d-1` and
//! `2d-1` sorted entries, and an internal node holds one more child than
//! entries.

use std::cmp::Ordering;
use std::fmt;
use std::mem;

/// Minimum degree used by ordered indexes
pub const DEFAULT_DEGREE: usize = 4;

/// Smallest degree that still yields a valid B-tree
pub const MIN_DEGREE: usize = 2;

#[derive(Clone)]
struct Node<K, V> {
    /// Sorted key/payload pairs
    entries: Vec<(K, V)>,
    /// Empty for leaves, `entries.len() + 1` long otherwise
    children: Vec<Box<Node<K, V>>>,
}

impl<K: Ord, V> Node<K, V> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            children: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// `Ok(i)` if `key` sits at `entries[i]`, otherwise `Err(i)` with the
    /// index of the first entry greater than `key` (the child pocket).
    fn locate(&self, key: &K) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Split the full child at `index`, promoting its median into `self`.
    ///
    /// The child keeps its lower `d-1` entries (and `d` children), the new
    /// right sibling takes the upper `d-1` entries (and `d` children).
    fn split_child(&mut self, index: usize, degree: usize) {
        let child = &mut self.children[index];
        debug_assert_eq!(child.entries.len(), 2 * degree - 1);

        let upper_entries = child.entries.split_off(degree);
        let median = child.entries.remove(degree - 1);
        let upper_children = if child.is_leaf() {
            Vec::new()
        } else {
            child.children.split_off(degree)
        };

        let sibling = Box::new(Node {
            entries: upper_entries,
            children: upper_children,
        });

        self.entries.insert(index, median);
        self.children.insert(index + 1, sibling);
    }

    /// Insert into a node known to have room. Returns the replaced payload
    /// when the key already exists.
    fn insert_non_full(&mut self, key: K, value: V, degree: usize) -> Option<V> {
        let mut index = match self.locate(&key) {
            Ok(found) => return Some(mem::replace(&mut self.entries[found].1, value)),
            Err(pocket) => pocket,
        };

        if self.is_leaf() {
            self.entries.insert(index, (key, value));
            return None;
        }

        if self.children[index].entries.len() == 2 * degree - 1 {
            self.split_child(index, degree);
            match key.cmp(&self.entries[index].0) {
                Ordering::Greater => index += 1,
                Ordering::Equal => {
                    return Some(mem::replace(&mut self.entries[index].1, value));
                }
                Ordering::Less => {}
            }
        }

        self.children[index].insert_non_full(key, value, degree)
    }

    fn check(
        &self,
        degree: usize,
        is_root: bool,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> Result<usize, String> {
        let count = self.entries.len();
        if count > 2 * degree - 1 {
            return Err(format!("node at depth {} holds {} entries", depth, count));
        }
        if !is_root && count < degree - 1 {
            return Err(format!("node at depth {} underfull with {} entries", depth, count));
        }
        if self.entries.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(format!("node at depth {} is not strictly sorted", depth));
        }
        if let (Some(lower), Some((first, _))) = (lower, self.entries.first()) {
            if first <= lower {
                return Err(format!("node at depth {} violates its lower separator", depth));
            }
        }
        if let (Some(upper), Some((last, _))) = (upper, self.entries.last()) {
            if last >= upper {
                return Err(format!("node at depth {} violates its upper separator", depth));
            }
        }

        if self.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(format!("leaf at depth {} but expected {}", depth, expected));
                }
                Some(_) => {}
            }
            return Ok(count);
        }

        if self.children.len() != count + 1 {
            return Err(format!(
                "internal node at depth {} has {} entries but {} children",
                depth,
                count,
                self.children.len()
            ));
        }

        let mut total = count;
        for (i, child) in self.children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(&self.entries[i - 1].0) };
            let child_upper = self.entries.get(i).map(|(k, _)| k).or(upper);
            total += child.check(degree, false, child_lower, child_upper, depth + 1, leaf_depth)?;
        }
        Ok(total)
    }
}

/// Insert/search B-tree keyed by any totally ordered type
#[derive(Clone)]
pub struct BTree<K, V> {
    root: Box<Node<K, V>>,
    degree: usize,
    len: usize,
}

impl<K: Ord, V> BTree<K, V> {
    /// Create an empty tree with [`DEFAULT_DEGREE`]
    pub fn new() -> Self {
        Self::with_degree(DEFAULT_DEGREE)
    }

    /// Create an empty tree with the given minimum degree (clamped to
    /// [`MIN_DEGREE`])
    pub fn with_degree(degree: usize) -> Self {
        Self {
            root: Box::new(Node::new()),
            degree: degree.max(MIN_DEGREE),
            len: 0,
        }
    }

    /// Insert a key/payload pair; an existing key has its payload replaced
    /// and the old payload returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.root.entries.len() == 2 * self.degree - 1 {
            let old_root = mem::replace(&mut self.root, Box::new(Node::new()));
            self.root.children.push(old_root);
            self.root.split_child(0, self.degree);
        }

        let replaced = self.root.insert_non_full(key, value, self.degree);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Look up the payload stored under `key`
    pub fn search(&self, key: &K) -> Option<&V> {
        let mut node = &self.root;
        loop {
            match node.locate(key) {
                Ok(found) => return Some(&node.entries[found].1),
                Err(_) if node.is_leaf() => return None,
                Err(pocket) => node = &node.children[pocket],
            }
        }
    }

    /// Mutable variant of [`BTree::search`]
    pub fn search_mut(&mut self, key: &K) -> Option<&mut V> {
        let mut node = &mut self.root;
        loop {
            match node.locate(key) {
                Ok(found) => return Some(&mut node.entries[found].1),
                Err(_) if node.is_leaf() => return None,
                Err(pocket) => node = &mut node.children[pocket],
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of levels; an empty or single-node tree has height 1
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(first) = node.children.first() {
            height += 1;
            node = first;
        }
        height
    }

    /// Verify the structural invariants, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut leaf_depth = None;
        let counted = self.root.check(self.degree, true, None, None, 0, &mut leaf_depth)?;
        if counted != self.len {
            return Err(format!("tree reports {} keys but holds {}", self.len, counted));
        }
        Ok(())
    }
}

impl<K: Ord, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("degree", &self.degree)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_tree() {
        let tree: BTree<i64, usize> = BTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.search(&1), None);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_root_split_grows_height() {
        let mut tree = BTree::with_degree(4);
        for k in 0..7 {
            tree.insert(k, k * 10);
        }
        assert_eq!(tree.height(), 1);

        // Eighth insert finds a full root (7 = 2d-1 entries) and splits it
        tree.insert(7, 70);
        assert_eq!(tree.height(), 2);
        assert!(tree.check_invariants().is_ok());
        for k in 0..8 {
            assert_eq!(tree.search(&k), Some(&(k * 10)));
        }
    }

    #[test]
    fn test_ascending_and_descending_inserts() {
        let mut asc = BTree::new();
        let mut desc = BTree::new();
        for k in 0..1_000i64 {
            asc.insert(k, k);
            desc.insert(999 - k, 999 - k);
        }
        for tree in [&asc, &desc] {
            assert_eq!(tree.len(), 1_000);
            assert!(tree.check_invariants().is_ok());
            assert_eq!(tree.search(&500), Some(&500));
            assert_eq!(tree.search(&1_000), None);
            assert_eq!(tree.search(&-1), None);
        }
    }

    #[test]
    fn test_duplicate_key_replaces_payload() {
        let mut tree = BTree::with_degree(2);
        for k in 0..50 {
            assert_eq!(tree.insert(k, "first"), None);
        }
        // Hits keys sitting in internal nodes as well as leaves
        for k in 0..50 {
            assert_eq!(tree.insert(k, "second"), Some("first"));
        }
        assert_eq!(tree.len(), 50);
        assert!(tree.check_invariants().is_ok());
        assert!((0..50).all(|k| tree.search(&k) == Some(&"second")));
    }

    #[test]
    fn test_search_mut() {
        let mut tree = BTree::new();
        for k in 0..20 {
            tree.insert(k, vec![k]);
        }
        tree.search_mut(&13).unwrap().push(99);
        assert_eq!(tree.search(&13), Some(&vec![13, 99]));
        assert!(tree.search_mut(&42).is_none());
    }

    #[test]
    fn test_degree_is_clamped() {
        let tree: BTree<u8, ()> = BTree::with_degree(0);
        assert_eq!(tree.degree(), MIN_DEGREE);
    }

    #[test]
    fn test_string_keys() {
        let mut tree = BTree::new();
        for name in ["mallory", "alice", "trent", "bob", "eve", "carol", "dave", "peggy"] {
            tree.insert(name.to_string(), name.len());
        }
        assert_eq!(tree.search(&"carol".to_string()), Some(&5));
        assert_eq!(tree.search(&"zed".to_string()), None);
        assert!(tree.check_invariants().is_ok());
    }

    proptest! {
        #[test]
        fn prop_inserted_keys_are_found(
            keys in proptest::collection::vec(-10_000i64..10_000, 0..400),
            probes in proptest::collection::vec(-10_000i64..10_000, 0..50),
            degree in 2usize..7,
        ) {
            let mut tree = BTree::with_degree(degree);
            let mut inserted = BTreeSet::new();
            for &k in &keys {
                tree.insert(k, k.wrapping_mul(3));
                inserted.insert(k);
                prop_assert!(tree.check_invariants().is_ok());
            }

            prop_assert_eq!(tree.len(), inserted.len());
            for k in &inserted {
                prop_assert_eq!(tree.search(k), Some(&k.wrapping_mul(3)));
            }
            for k in probes.iter().filter(|k| !inserted.contains(*k)) {
                prop_assert_eq!(tree.search(k), None);
            }
        }
    }
}
