//! Arena storage for AST nodes and their child lists.
//!
//! Nodes live in fixed-capacity pages that are chained as the tree grows;
//! a [`NodeId`] is the node's global slot index. Variable-length child lists
//! (parameters, arguments, statements, ...) are separate growable buffers
//! tracked in a registry so they can be resized independently of the node
//! records. Nothing is freed individually: [`AstArena::release_all`] is the
//! only release path.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::ast::Node;

/// Default number of node records per page.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Handle to a node allocated in an [`AstArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a tracked child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListId(u32);

impl ListId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct AstArena {
    pages: Vec<Vec<Node>>,
    page_size: usize,
    len: usize,
    lists: Vec<Vec<NodeId>>,
    released: bool,
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

impl AstArena {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            pages: Vec::new(),
            page_size: page_size.max(1),
            len: 0,
            lists: Vec::new(),
            released: false,
        }
    }

    /// Carve the next node slot, opening a new page when the current one is full.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let page_full = self
            .pages
            .last()
            .map_or(true, |page| page.len() == self.page_size);
        if page_full {
            self.pages.push(Vec::with_capacity(self.page_size));
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(node);
        }

        let id = NodeId(self.len as u32);
        self.len += 1;
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        let index = id.index();
        &self.pages[index / self.page_size][index % self.page_size]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let index = id.index();
        &mut self.pages[index / self.page_size][index % self.page_size]
    }

    /// Allocate an empty tracked list with room for `capacity` children.
    pub fn alloc_list(&mut self, capacity: usize) -> ListId {
        let id = ListId(self.lists.len() as u32);
        self.lists.push(Vec::with_capacity(capacity));
        id
    }

    /// Resize a tracked list so it can hold at least `capacity` children.
    pub fn grow(&mut self, list: ListId, capacity: usize) {
        let buffer = &mut self.lists[list.index()];
        if capacity > buffer.capacity() {
            buffer.reserve_exact(capacity - buffer.len());
        }
    }

    /// Append to a tracked list, doubling its capacity when full.
    pub fn push(&mut self, list: ListId, node: NodeId) {
        let (len, capacity) = {
            let buffer = &self.lists[list.index()];
            (buffer.len(), buffer.capacity())
        };
        if len == capacity {
            self.grow(list, (capacity * 2).max(1));
        }
        self.lists[list.index()].push(node);
    }

    pub fn list(&self, list: ListId) -> &[NodeId] {
        &self.lists[list.index()]
    }

    pub fn list_capacity(&self, list: ListId) -> usize {
        self.lists[list.index()].capacity()
    }

    pub fn node_count(&self) -> usize {
        self.len
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release every page and every tracked list in one pass.
    ///
    /// Handles issued before the call must not be used afterwards. Calling
    /// this more than once is a no-op.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!(
            nodes = self.len,
            pages = self.pages.len(),
            lists = self.lists.len(),
            "releasing arena"
        );
        self.pages = Vec::new();
        self.lists = Vec::new();
        self.len = 0;
        self.released = true;
    }
}

impl Index<NodeId> for AstArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id)
    }
}

impl IndexMut<NodeId> for AstArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::span::Span;

    fn literal(value: i64) -> Node {
        Node::new(NodeKind::IntegerLiteral(value), Span::default())
    }

    #[test]
    fn test_alloc_chains_pages() {
        let mut arena = AstArena::with_page_size(4);
        let ids: Vec<_> = (0..10).map(|i| arena.alloc(literal(i))).collect();

        assert_eq!(arena.node_count(), 10);
        assert_eq!(arena.page_count(), 3);
        for (i, id) in ids.iter().enumerate() {
            assert!(matches!(arena[*id].kind, NodeKind::IntegerLiteral(v) if v == i as i64));
        }
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut arena = AstArena::new();
        let id = arena.alloc(literal(1));
        arena[id].kind = NodeKind::IntegerLiteral(2);
        assert!(matches!(arena.get(id).kind, NodeKind::IntegerLiteral(2)));
    }

    #[test]
    fn test_list_doubles_when_full() {
        let mut arena = AstArena::new();
        let node = arena.alloc(literal(0));
        let list = arena.alloc_list(2);

        arena.push(list, node);
        arena.push(list, node);
        assert_eq!(arena.list_capacity(list), 2);

        arena.push(list, node);
        assert!(arena.list_capacity(list) >= 4);
        assert_eq!(arena.list(list).len(), 3);
    }

    #[test]
    fn test_zero_capacity_list_grows() {
        let mut arena = AstArena::new();
        let node = arena.alloc(literal(0));
        let list = arena.alloc_list(0);
        arena.push(list, node);
        assert_eq!(arena.list(list), &[node]);
    }

    #[test]
    fn test_lists_are_independent() {
        let mut arena = AstArena::new();
        let a = arena.alloc(literal(1));
        let b = arena.alloc(literal(2));
        let first = arena.alloc_list(1);
        let second = arena.alloc_list(1);

        for _ in 0..5 {
            arena.push(first, a);
        }
        arena.push(second, b);

        assert_eq!(arena.list(first).len(), 5);
        assert_eq!(arena.list(second), &[b]);
        assert_eq!(arena.list_count(), 2);
    }

    #[test]
    fn test_release_all_is_idempotent() {
        let mut arena = AstArena::with_page_size(2);
        for i in 0..5 {
            arena.alloc(literal(i));
        }
        arena.alloc_list(4);

        arena.release_all();
        assert!(arena.is_released());
        assert_eq!(arena.node_count(), 0);
        assert_eq!(arena.page_count(), 0);
        assert_eq!(arena.list_count(), 0);

        arena.release_all();
        assert!(arena.is_released());
    }
}
