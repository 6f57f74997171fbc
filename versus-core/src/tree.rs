/// Ranking tree: a binary search tree over item identities, ordered by preference.
///
/// Nodes live in an arena indexed by `ItemId`, so every reference (root,
/// parent, left, right) uses the same key regardless of insertion order.
/// After each insertion the whole tree is linearized by in-order traversal
/// and rebuilt by median split, keeping height at `ceil(log2(size + 1))`.
use thiserror::Error;
use tracing::instrument;

use crate::types::ItemId;

/// Which child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// Less preferred than the parent.
    Left,
    /// More preferred than the parent.
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub item: ItemId,
    pub left: Option<ItemId>,
    pub right: Option<ItemId>,
    pub parent: Option<ItemId>,
}

impl Node {
    fn leaf(item: ItemId, parent: Option<ItemId>) -> Self {
        Node { item, left: None, right: None, parent }
    }

    pub fn child(&self, side: Side) -> Option<ItemId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn set_child(&mut self, side: Side, child: Option<ItemId>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

/// A broken structural invariant found by `RankingTree::validate`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeViolation {
    #[error("root {0} is missing or has a parent")]
    BadRoot(ItemId),

    #[error("node {child} is linked from {parent} but records parent {recorded:?}")]
    ParentMismatch { parent: ItemId, child: ItemId, recorded: Option<ItemId> },

    #[error("node {0} is linked but not stored")]
    DanglingLink(ItemId),

    #[error("slot {slot} holds the node for item {item}")]
    Misplaced { slot: ItemId, item: ItemId },

    #[error("node {0} is reachable more than once")]
    Revisited(ItemId),

    #[error("{reachable} of {stored} nodes are reachable from the root")]
    Unreachable { reachable: usize, stored: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankingTree {
    /// `nodes[id]` is the node wrapping item `id`, once inserted.
    nodes: Vec<Option<Node>>,
    root: ItemId,
    len: usize,
}

impl RankingTree {
    /// Tree with a single root node. `capacity` is the total number of items.
    pub fn with_root(capacity: usize, root: ItemId) -> Self {
        let mut nodes = vec![None; capacity.max(root + 1)];
        nodes[root] = Some(Node::leaf(root, None));
        RankingTree { nodes, root, len: 1 }
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.node(item).is_some()
    }

    pub fn node(&self, item: ItemId) -> Option<&Node> {
        self.nodes.get(item).and_then(Option::as_ref)
    }

    /// Attach `item` as a new leaf in the empty `side` slot of `parent`.
    ///
    /// Callers guarantee `parent` is stored, the slot is empty and `item` is new.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn attach(&mut self, parent: ItemId, side: Side, item: ItemId) {
        debug_assert!(!self.contains(item), "item {item} already in tree");
        if item >= self.nodes.len() {
            self.nodes.resize(item + 1, None);
        }
        if let Some(parent_node) = self.nodes[parent].as_mut() {
            debug_assert!(parent_node.child(side).is_none(), "slot already occupied");
            parent_node.set_child(side, Some(item));
        }
        self.nodes[item] = Some(Node::leaf(item, Some(parent)));
        self.len += 1;
    }

    /// Item identities in left-subtree, node, right-subtree order.
    #[instrument(level = "trace", skip(self))]
    pub fn in_order(&self) -> Vec<ItemId> {
        let mut order = Vec::with_capacity(self.len);
        let mut stack = Vec::new();
        let mut current = Some(self.root);

        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = self.node(id).and_then(|n| n.left);
            }
            if let Some(id) = stack.pop() {
                order.push(id);
                current = self.node(id).and_then(|n| n.right);
            }
        }
        order
    }

    /// Rebuild the tree from its in-order sequence by recursive median split.
    ///
    /// The in-order sequence is unchanged; only the shape and root move.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn rebalance(&mut self) {
        let order = self.in_order();
        if let Some(root) = self.build_balanced(&order, None) {
            self.root = root;
        }
    }

    fn build_balanced(&mut self, sorted: &[ItemId], parent: Option<ItemId>) -> Option<ItemId> {
        if sorted.is_empty() {
            return None;
        }
        let mid = sorted.len() / 2;
        let id = sorted[mid];
        let left = self.build_balanced(&sorted[..mid], Some(id));
        let right = self.build_balanced(&sorted[mid + 1..], Some(id));

        if let Some(node) = self.nodes[id].as_mut() {
            node.parent = parent;
            node.left = left;
            node.right = right;
        }
        Some(id)
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            deepest = deepest.max(depth);
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        deepest
    }

    /// Check the rooted binary tree invariants.
    pub fn validate(&self) -> Result<(), TreeViolation> {
        match self.node(self.root) {
            Some(root) if root.parent.is_none() => {}
            _ => return Err(TreeViolation::BadRoot(self.root)),
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut reachable = 0;
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = self.node(id).ok_or(TreeViolation::DanglingLink(id))?;
            if node.item != id {
                return Err(TreeViolation::Misplaced { slot: id, item: node.item });
            }
            if std::mem::replace(&mut visited[id], true) {
                return Err(TreeViolation::Revisited(id));
            }
            reachable += 1;

            for child in [node.left, node.right].into_iter().flatten() {
                let child_node = self.node(child).ok_or(TreeViolation::DanglingLink(child))?;
                if child_node.parent != Some(id) {
                    return Err(TreeViolation::ParentMismatch {
                        parent: id,
                        child,
                        recorded: child_node.parent,
                    });
                }
                stack.push(child);
            }
        }

        let stored = self.nodes.iter().filter(|n| n.is_some()).count();
        if reachable != stored || stored != self.len {
            return Err(TreeViolation::Unreachable { reachable, stored });
        }
        Ok(())
    }
}
