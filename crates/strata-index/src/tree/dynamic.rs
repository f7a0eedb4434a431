//! Mutable B+Tree absorbing writes (the dynamic stage).
//!
//! Nodes live in two arenas, one for inner nodes and one for leaves. Leaves
//! form a doubly linked chain in key order. The tail leaf carries a virtual
//! trailing slot (`slot == len`) that serves as the end position of the
//! whole tree, so cursor movement never has to test for a missing leaf.
//!
//! Structure invariants:
//! - `keys[i]` of an inner node is an upper bound of every key below
//!   `children[i]`, and every key below `children[i + 1]` is greater than it.
//!   The last child is unbounded.
//! - Every non-root node holds between `order / 2` and `order` entries.
//! - All leaves sit at the same depth.
//!
//! Both structural operations work top-down. Insert splits a full child
//! before descending into it and erase fixes an underfull child (borrow from
//! a sibling with slack, else merge) before descending into it, so nothing
//! ever propagates back up.

use super::arena::{NodeArena, NodeId};
use strata_common::{Result, StrataError};
use tracing::trace;

/// Inner node: separator keys plus child handles.
pub(crate) struct InnerNode<K> {
    /// Distance from the leaves. Children of a level-1 node are leaves.
    level: u16,
    /// `keys.len() == children.len() - 1`.
    keys: Vec<K>,
    children: Vec<NodeId>,
}

/// Leaf node: sorted key/value slots plus chain links.
pub(crate) struct LeafNode<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl<K, V> LeafNode<K, V> {
    fn with_capacity(order: usize) -> Self {
        Self {
            keys: Vec::with_capacity(order),
            values: Vec::with_capacity(order),
            prev: None,
            next: None,
        }
    }
}

/// Position of a slot in the leaf chain.
///
/// Positions are normalized: only the tail leaf may be addressed at
/// `slot == len`, and that position is the end of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafPos {
    pub(crate) leaf: NodeId,
    pub(crate) slot: usize,
}

/// Mutable B+Tree with bounded fanout.
pub struct DynamicIndex<K, V> {
    inner: NodeArena<InnerNode<K>>,
    leaves: NodeArena<LeafNode<K, V>>,
    /// Root node; a leaf when `height == 1`.
    root: NodeId,
    /// Tree height (1 = root is a leaf).
    height: usize,
    /// Leftmost leaf.
    head: NodeId,
    /// Rightmost leaf.
    tail: NodeId,
    len: usize,
    inner_order: usize,
    leaf_order: usize,
}

/// First child whose separator is `>= key`.
#[inline(always)]
fn lower_child<K: Ord>(keys: &[K], key: &K) -> usize {
    keys.iter().take_while(|sep| *sep < key).count()
}

/// First child whose separator is `> key`.
#[inline(always)]
fn upper_child<K: Ord>(keys: &[K], key: &K) -> usize {
    keys.iter().take_while(|sep| *sep <= key).count()
}

impl<K: Ord + Copy, V> DynamicIndex<K, V> {
    /// Creates an empty tree. Both orders must be at least 4.
    pub fn new(inner_order: usize, leaf_order: usize) -> Self {
        debug_assert!(inner_order >= 4 && leaf_order >= 4);
        let mut leaves = NodeArena::new();
        let root = leaves.alloc(LeafNode::with_capacity(leaf_order));
        Self {
            inner: NodeArena::new(),
            leaves,
            root,
            height: 1,
            head: root,
            tail: root,
            len: 0,
            inner_order,
            leaf_order,
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tree height (1 = just a root leaf).
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of live inner nodes.
    #[inline]
    pub fn inner_count(&self) -> usize {
        self.inner.live()
    }

    /// Number of live leaf nodes.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.live()
    }

    #[inline(always)]
    fn leaf_half(&self) -> usize {
        self.leaf_order / 2
    }

    #[inline(always)]
    fn inner_half(&self) -> usize {
        self.inner_order / 2
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Descends to the leaf that may hold `key`.
    fn find_leaf(&self, key: &K, upper: bool) -> NodeId {
        let mut node = self.root;
        for _ in 1..self.height {
            let inner = &self.inner[node];
            let idx = if upper {
                upper_child(&inner.keys, key)
            } else {
                lower_child(&inner.keys, key)
            };
            node = inner.children[idx];
        }
        node
    }

    /// Moves a one-past-the-end slot of a non-tail leaf to the next leaf.
    #[inline]
    fn normalize(&self, leaf: NodeId, slot: usize) -> LeafPos {
        let node = &self.leaves[leaf];
        match node.next {
            Some(next) if slot >= node.keys.len() => LeafPos { leaf: next, slot: 0 },
            _ => LeafPos { leaf, slot },
        }
    }

    /// Position of `key`, if present.
    pub fn find(&self, key: &K) -> Option<LeafPos> {
        let leaf = self.find_leaf(key, false);
        let node = &self.leaves[leaf];
        let slot = node.keys.iter().take_while(|k| *k < key).count();
        (slot < node.keys.len() && node.keys[slot] == *key).then_some(LeafPos { leaf, slot })
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|pos| &self.leaves[pos.leaf].values[pos.slot])
    }

    /// Mutable value for `key`, if present.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = self.find(key)?;
        Some(&mut self.leaves[pos.leaf].values[pos.slot])
    }

    /// Returns true if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// First position whose key is `>= key`.
    pub fn lower_bound(&self, key: &K) -> LeafPos {
        let leaf = self.find_leaf(key, false);
        let slot = self.leaves[leaf].keys.iter().take_while(|k| *k < key).count();
        self.normalize(leaf, slot)
    }

    /// First position whose key is `> key`.
    pub fn upper_bound(&self, key: &K) -> LeafPos {
        let leaf = self.find_leaf(key, true);
        let slot = self.leaves[leaf].keys.iter().take_while(|k| *k <= key).count();
        self.normalize(leaf, slot)
    }

    /// Position of the smallest key (equals `end()` when empty).
    #[inline]
    pub fn begin(&self) -> LeafPos {
        LeafPos {
            leaf: self.head,
            slot: 0,
        }
    }

    /// The end position: the virtual slot after the tail leaf's last entry.
    #[inline]
    pub fn end(&self) -> LeafPos {
        LeafPos {
            leaf: self.tail,
            slot: self.leaves[self.tail].keys.len(),
        }
    }

    /// Position after `pos`. `next(end()) == end()`.
    pub fn next(&self, pos: LeafPos) -> LeafPos {
        if pos == self.end() {
            return pos;
        }
        self.normalize(pos.leaf, pos.slot + 1)
    }

    /// Position before `pos`. `prev(begin()) == begin()`.
    pub fn prev(&self, pos: LeafPos) -> LeafPos {
        if pos == self.begin() {
            return pos;
        }
        if pos.slot > 0 {
            return LeafPos {
                leaf: pos.leaf,
                slot: pos.slot - 1,
            };
        }
        match self.leaves[pos.leaf].prev {
            Some(prev) => LeafPos {
                leaf: prev,
                slot: self.leaves[prev].keys.len() - 1,
            },
            None => pos,
        }
    }

    /// Entry at `pos`, or `None` at the end position or for a stale position.
    #[inline]
    pub fn entry_at(&self, pos: LeafPos) -> Option<(&K, &V)> {
        let node = self.leaves.get(pos.leaf)?;
        Some((node.keys.get(pos.slot)?, &node.values[pos.slot]))
    }

    /// Key at `pos`.
    #[inline]
    pub fn key_at(&self, pos: LeafPos) -> Option<&K> {
        self.leaves.get(pos.leaf)?.keys.get(pos.slot)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let mut pos = self.begin();
        std::iter::from_fn(move || {
            let entry = self.entry_at(pos)?;
            pos = self.next(pos);
            Some(entry)
        })
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Inserts `key` unless present. Returns the key's position and whether
    /// it was inserted.
    pub fn insert(&mut self, key: K, value: V) -> (LeafPos, bool) {
        let (leaf, slot, found) = self.descend_for_insert(&key);
        if !found {
            self.put(leaf, slot, key, value);
        }
        (LeafPos { leaf, slot }, !found)
    }

    /// Inserts or overwrites `key`. Returns the previous value, if any.
    pub fn upsert(&mut self, key: K, value: V) -> Option<V> {
        let (leaf, slot, found) = self.descend_for_insert(&key);
        if found {
            return Some(std::mem::replace(
                &mut self.leaves[leaf].values[slot],
                value,
            ));
        }
        self.put(leaf, slot, key, value);
        None
    }

    /// Returns the value of `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, default: F) -> &mut V {
        let (leaf, slot, found) = self.descend_for_insert(&key);
        if !found {
            self.put(leaf, slot, key, default());
        }
        &mut self.leaves[leaf].values[slot]
    }

    #[inline]
    fn put(&mut self, leaf: NodeId, slot: usize, key: K, value: V) {
        let node = &mut self.leaves[leaf];
        debug_assert!(node.keys.len() < self.leaf_order);
        node.keys.insert(slot, key);
        node.values.insert(slot, value);
        self.len += 1;
    }

    /// Descends to the leaf for `key`, splitting every full node on the way.
    /// Returns the leaf, the slot for `key` and whether `key` is already there.
    fn descend_for_insert(&mut self, key: &K) -> (NodeId, usize, bool) {
        if self.is_node_full(self.root, self.height == 1) {
            self.split_root();
        }

        let mut node = self.root;
        for _ in 1..self.height {
            let mut idx = lower_child(&self.inner[node].keys, key);
            let child_is_leaf = self.inner[node].level == 1;
            if self.is_node_full(self.inner[node].children[idx], child_is_leaf) {
                self.split_child(node, idx);
                if self.inner[node].keys[idx] < *key {
                    idx += 1;
                }
            }
            node = self.inner[node].children[idx];
        }

        let leaf = &self.leaves[node];
        let slot = leaf.keys.iter().take_while(|k| *k < key).count();
        let found = slot < leaf.keys.len() && leaf.keys[slot] == *key;
        (node, slot, found)
    }

    #[inline]
    fn is_node_full(&self, id: NodeId, is_leaf: bool) -> bool {
        if is_leaf {
            self.leaves[id].keys.len() >= self.leaf_order
        } else {
            self.inner[id].children.len() >= self.inner_order
        }
    }

    /// Splits the root under a new root, growing the tree by one level.
    fn split_root(&mut self) {
        let mut children = Vec::with_capacity(self.inner_order);
        children.push(self.root);
        let new_root = self.inner.alloc(InnerNode {
            level: self.height as u16,
            keys: Vec::with_capacity(self.inner_order - 1),
            children,
        });
        self.split_child(new_root, 0);
        self.root = new_root;
        self.height += 1;
        trace!(height = self.height, "dynamic root split");
    }

    /// Splits `children[idx]` of `parent` in half.
    fn split_child(&mut self, parent: NodeId, idx: usize) {
        let child = self.inner[parent].children[idx];
        let (separator, right) = if self.inner[parent].level == 1 {
            self.split_leaf(child)
        } else {
            self.split_inner(child)
        };
        let parent = &mut self.inner[parent];
        parent.keys.insert(idx, separator);
        parent.children.insert(idx + 1, right);
    }

    /// Splits a leaf. Returns (last key of the left half, new right leaf).
    fn split_leaf(&mut self, id: NodeId) -> (K, NodeId) {
        let mut right = LeafNode::with_capacity(self.leaf_order);
        let node = &mut self.leaves[id];
        let mid = node.keys.len() / 2;
        right.keys.extend(node.keys.drain(mid..));
        right.values.extend(node.values.drain(mid..));
        right.prev = Some(id);
        right.next = node.next;
        let separator = node.keys[mid - 1];

        let old_next = right.next;
        let right_id = self.leaves.alloc(right);
        self.leaves[id].next = Some(right_id);
        match old_next {
            Some(next) => self.leaves[next].prev = Some(right_id),
            None => self.tail = right_id,
        }
        (separator, right_id)
    }

    /// Splits an inner node. Returns (separator moved up, new right node).
    fn split_inner(&mut self, id: NodeId) -> (K, NodeId) {
        let mut keys = Vec::with_capacity(self.inner_order - 1);
        let mut children = Vec::with_capacity(self.inner_order);
        let node = &mut self.inner[id];
        let mid = node.children.len() / 2;
        children.extend(node.children.drain(mid..));
        keys.extend(node.keys.drain(mid..));
        let separator = node.keys[mid - 1];
        node.keys.truncate(mid - 1);
        let level = node.level;

        let right_id = self.inner.alloc(InnerNode {
            level,
            keys,
            children,
        });
        (separator, right_id)
    }

    // =========================================================================
    // Erase Path
    // =========================================================================

    /// Removes `key`. Returns its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut node = self.root;
        for _ in 1..self.height {
            let mut idx = lower_child(&self.inner[node].keys, key);
            if self.child_len(node, idx) <= self.child_half(node) {
                idx = self.rebalance_child(node, idx);
            }
            node = self.inner[node].children[idx];
        }

        let leaf = &mut self.leaves[node];
        let slot = leaf.keys.iter().take_while(|k| *k < key).count();
        let removed = if slot < leaf.keys.len() && leaf.keys[slot] == *key {
            leaf.keys.remove(slot);
            Some(leaf.values.remove(slot))
        } else {
            None
        };
        if removed.is_some() {
            self.len -= 1;
        }

        self.collapse_root();
        removed
    }

    /// Removes `key`. Returns true if it was present.
    #[inline]
    pub fn erase(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    /// Removes the entry at `pos`, returning it.
    pub fn remove_at(&mut self, pos: LeafPos) -> Option<(K, V)> {
        let key = *self.key_at(pos)?;
        self.remove(&key).map(|value| (key, value))
    }

    #[inline]
    fn child_len(&self, parent: NodeId, idx: usize) -> usize {
        let node = &self.inner[parent];
        let child = node.children[idx];
        if node.level == 1 {
            self.leaves[child].keys.len()
        } else {
            self.inner[child].children.len()
        }
    }

    #[inline]
    fn child_half(&self, parent: NodeId) -> usize {
        if self.inner[parent].level == 1 {
            self.leaf_half()
        } else {
            self.inner_half()
        }
    }

    /// Brings `children[idx]` above half occupancy before the descent enters
    /// it. Returns the index the descent should continue at.
    fn rebalance_child(&mut self, parent: NodeId, idx: usize) -> usize {
        let count = self.inner[parent].children.len();
        let half = self.child_half(parent);
        let has_left = idx > 0;
        let has_right = idx + 1 < count;

        if has_left && self.child_len(parent, idx - 1) > half {
            self.borrow_from_left(parent, idx);
            return idx;
        }
        if has_right && self.child_len(parent, idx + 1) > half {
            self.borrow_from_right(parent, idx);
            return idx;
        }
        if has_left {
            self.merge_children(parent, idx - 1);
            return idx - 1;
        }
        if has_right {
            self.merge_children(parent, idx);
        }
        idx
    }

    /// Moves the last entry of `children[idx - 1]` to the front of `children[idx]`.
    fn borrow_from_left(&mut self, parent: NodeId, idx: usize) {
        let node = &self.inner[parent];
        let (left, child) = (node.children[idx - 1], node.children[idx]);

        if node.level == 1 {
            let left_node = &mut self.leaves[left];
            let last = left_node.keys.len() - 1;
            let key = left_node.keys.remove(last);
            let value = left_node.values.remove(last);
            let separator = left_node.keys[last - 1];

            let child_node = &mut self.leaves[child];
            child_node.keys.insert(0, key);
            child_node.values.insert(0, value);
            self.inner[parent].keys[idx - 1] = separator;
        } else {
            let left_node = &mut self.inner[left];
            let last = left_node.children.len() - 1;
            let moved = left_node.children.remove(last);
            let separator = left_node.keys.remove(last - 1);

            let old_separator = std::mem::replace(&mut self.inner[parent].keys[idx - 1], separator);
            let child_node = &mut self.inner[child];
            child_node.children.insert(0, moved);
            child_node.keys.insert(0, old_separator);
        }
    }

    /// Moves the first entry of `children[idx + 1]` to the back of `children[idx]`.
    fn borrow_from_right(&mut self, parent: NodeId, idx: usize) {
        let node = &self.inner[parent];
        let (child, right) = (node.children[idx], node.children[idx + 1]);

        if node.level == 1 {
            let right_node = &mut self.leaves[right];
            let key = right_node.keys.remove(0);
            let value = right_node.values.remove(0);

            let child_node = &mut self.leaves[child];
            child_node.keys.push(key);
            child_node.values.push(value);
            self.inner[parent].keys[idx] = key;
        } else {
            let right_node = &mut self.inner[right];
            let moved = right_node.children.remove(0);
            let separator = right_node.keys.remove(0);

            let old_separator = std::mem::replace(&mut self.inner[parent].keys[idx], separator);
            let child_node = &mut self.inner[child];
            child_node.keys.push(old_separator);
            child_node.children.push(moved);
        }
    }

    /// Merges `children[idx + 1]` into `children[idx]` and frees it.
    fn merge_children(&mut self, parent: NodeId, idx: usize) {
        let parent_node = &mut self.inner[parent];
        let left = parent_node.children[idx];
        let right = parent_node.children.remove(idx + 1);
        let separator = parent_node.keys.remove(idx);

        if parent_node.level == 1 {
            let right_node = self.leaves.free(right);
            let left_node = &mut self.leaves[left];
            left_node.keys.extend(right_node.keys);
            left_node.values.extend(right_node.values);
            left_node.next = right_node.next;
            match right_node.next {
                Some(next) => self.leaves[next].prev = Some(left),
                None => self.tail = left,
            }
        } else {
            let right_node = self.inner.free(right);
            let left_node = &mut self.inner[left];
            left_node.keys.push(separator);
            left_node.keys.extend(right_node.keys);
            left_node.children.extend(right_node.children);
        }
    }

    /// Replaces a single-child inner root by its child.
    fn collapse_root(&mut self) {
        while self.height > 1 && self.inner[self.root].children.len() == 1 {
            let old_root = self.inner.free(self.root);
            self.root = old_root.children[0];
            self.height -= 1;
            trace!(height = self.height, "dynamic root collapsed");
        }
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Drops every entry, keeping one empty root leaf.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.leaves.clear();
        let root = self.leaves.alloc(LeafNode::with_capacity(self.leaf_order));
        self.root = root;
        self.head = root;
        self.tail = root;
        self.height = 1;
        self.len = 0;
    }

    /// Drains all entries in key order, releasing each leaf as soon as it is
    /// reached. The tree is empty once the drain is dropped.
    pub(crate) fn drain(&mut self) -> Drain<'_, K, V> {
        // Inner nodes are not needed to walk the chain.
        self.inner.clear();
        let head = self.head;
        Drain {
            tree: self,
            next_leaf: Some(head),
            current: None,
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Walks the whole tree and reports the first broken invariant.
    pub fn check_invariants(&self) -> Result<()> {
        let mut walk = Walk {
            leaves: Vec::new(),
            inner_nodes: 0,
            entries: 0,
        };
        self.check_node(self.root, self.height, true, None, None, &mut walk)?;

        if walk.entries != self.len {
            return Err(StrataError::corrupted(format!(
                "dynamic size {} but {} entries reachable",
                self.len, walk.entries
            )));
        }
        if walk.inner_nodes != self.inner.live() || walk.leaves.len() != self.leaves.live() {
            return Err(StrataError::corrupted(format!(
                "{} inner / {} leaf nodes reachable, arena holds {} / {}",
                walk.inner_nodes,
                walk.leaves.len(),
                self.inner.live(),
                self.leaves.live()
            )));
        }

        // The linked chain must visit the leaves in tree order.
        let mut prev: Option<NodeId> = None;
        let mut cursor = Some(self.head);
        for &expected in &walk.leaves {
            let Some(id) = cursor else {
                return Err(StrataError::corrupted("leaf chain ends early"));
            };
            if id != expected {
                return Err(StrataError::corrupted("leaf chain out of tree order"));
            }
            if self.leaves[id].prev != prev {
                return Err(StrataError::corrupted("leaf prev link mismatch"));
            }
            prev = Some(id);
            cursor = self.leaves[id].next;
        }
        if cursor.is_some() || prev != Some(self.tail) {
            return Err(StrataError::corrupted("leaf chain tail mismatch"));
        }
        Ok(())
    }

    /// Checks the subtree at `id`, whose keys must lie in `(low, high]`.
    fn check_node(
        &self,
        id: NodeId,
        depth: usize,
        is_root: bool,
        low: Option<&K>,
        high: Option<&K>,
        walk: &mut Walk,
    ) -> Result<()> {
        if depth == 1 {
            let leaf = self.leaves.get(id).ok_or_else(|| {
                StrataError::corrupted("dangling leaf handle")
            })?;
            let count = leaf.keys.len();
            if count != leaf.values.len() {
                return Err(StrataError::corrupted("leaf key/value count mismatch"));
            }
            if count > self.leaf_order || (!is_root && count < self.leaf_half()) {
                return Err(StrataError::corrupted(format!(
                    "leaf holds {} entries, allowed {}..={}",
                    count,
                    self.leaf_half(),
                    self.leaf_order
                )));
            }
            if leaf.keys.windows(2).any(|w| w[0] >= w[1]) {
                return Err(StrataError::corrupted("leaf keys not strictly increasing"));
            }
            if let (Some(low), Some(first)) = (low, leaf.keys.first()) {
                if first <= low {
                    return Err(StrataError::corrupted("leaf key below lower separator"));
                }
            }
            if let (Some(high), Some(last)) = (high, leaf.keys.last()) {
                if last > high {
                    return Err(StrataError::corrupted("leaf key above upper separator"));
                }
            }
            walk.entries += count;
            walk.leaves.push(id);
            return Ok(());
        }

        let node = self
            .inner
            .get(id)
            .ok_or_else(|| StrataError::corrupted("dangling inner handle"))?;
        let count = node.children.len();
        if node.level as usize != depth - 1 {
            return Err(StrataError::corrupted(format!(
                "inner node at depth {} has level {}",
                depth, node.level
            )));
        }
        if node.keys.len() + 1 != count {
            return Err(StrataError::corrupted("inner key/child count mismatch"));
        }
        let min = if is_root { 2 } else { self.inner_half() };
        if count > self.inner_order || count < min {
            return Err(StrataError::corrupted(format!(
                "inner node holds {} children, allowed {}..={}",
                count, min, self.inner_order
            )));
        }
        if node.keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StrataError::corrupted("separators not strictly increasing"));
        }
        walk.inner_nodes += 1;

        for (i, &child) in node.children.iter().enumerate() {
            let child_low = if i == 0 { low } else { Some(&node.keys[i - 1]) };
            let child_high = if i + 1 == count { high } else { Some(&node.keys[i]) };
            self.check_node(child, depth - 1, false, child_low, child_high, walk)?;
        }
        Ok(())
    }
}

struct Walk {
    leaves: Vec<NodeId>,
    inner_nodes: usize,
    entries: usize,
}

/// Draining iterator over a dynamic tree, see [`DynamicIndex::drain`].
pub(crate) struct Drain<'a, K: Ord + Copy, V> {
    tree: &'a mut DynamicIndex<K, V>,
    next_leaf: Option<NodeId>,
    current: Option<std::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<V>>>,
}

impl<K: Ord + Copy, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            if let Some(entry) = self.current.as_mut().and_then(Iterator::next) {
                return Some(entry);
            }
            let id = self.next_leaf?;
            let leaf = self.tree.leaves.free(id);
            self.next_leaf = leaf.next;
            self.current = Some(leaf.keys.into_iter().zip(leaf.values));
        }
    }
}

impl<K: Ord + Copy, V> Drop for Drain<'_, K, V> {
    fn drop(&mut self) {
        self.tree.clear();
    }
}
