//! Arena allocation for tree nodes.

use std::ops::{Index, IndexMut};

/// Stable handle to a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot-vector arena for tree nodes.
///
/// Nodes are addressed by [`NodeId`]. Freed slots go on a free-list and are
/// handed out again by later allocations, so a tree that splits and merges
/// repeatedly does not grow its backing storage.
pub struct NodeArena<T> {
    /// Node slots; `None` marks a freed slot.
    slots: Vec<Option<T>>,
    /// Freed slot indexes, reused LIFO.
    free: Vec<u32>,
    /// Number of occupied slots.
    live: usize,
}

impl<T> NodeArena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Stores a node, reusing a freed slot when one is available.
    #[inline]
    pub fn alloc(&mut self, node: T) -> NodeId {
        self.live += 1;
        if let Some(idx) = self.free.pop() {
            debug_assert!(self.slots[idx as usize].is_none());
            self.slots[idx as usize] = Some(node);
            return NodeId(idx);
        }
        let Ok(idx) = u32::try_from(self.slots.len()) else {
            panic!("NodeArena out of handles");
        };
        self.slots.push(Some(node));
        NodeId(idx)
    }

    /// Removes a node and returns it. The handle becomes invalid.
    #[inline]
    pub fn free(&mut self, id: NodeId) -> T {
        let node = self.slots[id.index()]
            .take()
            .unwrap_or_else(|| panic!("double free of node {}", id.0));
        self.free.push(id.0);
        self.live -= 1;
        node
    }

    /// Returns the node for a handle, or `None` if it was freed.
    #[inline(always)]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of live nodes.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated (live plus free).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, id: NodeId) -> &T {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("invalid node handle {}", id.0),
        }
    }
}

impl<T> IndexMut<NodeId> for NodeArena<T> {
    #[inline(always)]
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("invalid node handle {}", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_index() {
        let mut arena = NodeArena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_ne!(a, b);
        assert_eq!(arena[a], "a");
        assert_eq!(arena[b], "b");
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn test_free_list_reuse() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(1);
        let _b = arena.alloc(2);
        assert_eq!(arena.free(a), 1);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.live(), 1);

        // The freed slot is handed out again.
        let c = arena.alloc(3);
        assert_eq!(c, a);
        assert_eq!(arena[c], 3);
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    fn test_index_mut() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(vec![1, 2]);
        arena[a].push(3);
        assert_eq!(arena[a], vec![1, 2, 3]);
    }

    #[test]
    fn test_clear() {
        let mut arena = NodeArena::new();
        for i in 0..10 {
            arena.alloc(i);
        }
        arena.clear();
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    #[should_panic(expected = "invalid node handle")]
    fn test_index_freed_handle_panics() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(1);
        arena.free(a);
        let _ = arena[a];
    }
}
