//! Pending structural edits of one root cache.
//!
//! Attach/detach churn between two propagation passes only appends to
//! these lists. They are consumed in one go by the next rebuild, which
//! applies the conflict rule: a node present in both lists is dropped.

use crate::NodeHandle;

#[derive(Debug, Default, Clone)]
pub struct StructuralEditQueue {
    pending_add: Vec<NodeHandle>,
    pending_remove: Vec<NodeHandle>,
}

impl StructuralEditQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn enqueue_add(&mut self, node: NodeHandle) {
        self.pending_add.push(node);
    }

    #[inline]
    pub fn enqueue_remove(&mut self, node: NodeHandle) {
        self.pending_remove.push(node);
    }

    /// Moves every pending edit of `other` into this queue's add list and
    /// returns how many were moved.
    ///
    /// Used when another cache is folded into this one: a node `other` meant
    /// to remove may belong to this tree now, so it is re-sorted rather than
    /// dropped.
    pub fn absorb(&mut self, other: &mut StructuralEditQueue) -> usize {
        let moved = other.pending_add.len() + other.pending_remove.len();
        self.pending_add.append(&mut other.pending_add);
        self.pending_add.append(&mut other.pending_remove);
        moved
    }

    /// `true` when no structural edit is waiting for a rebuild.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_add.is_empty() && self.pending_remove.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn pending_adds(&self) -> &[NodeHandle] {
        &self.pending_add
    }

    #[inline]
    #[must_use]
    pub fn pending_removes(&self) -> &[NodeHandle] {
        &self.pending_remove
    }

    /// Returns `true` if `node` is queued in both lists, i.e. it will be
    /// dropped by the next rebuild.
    #[must_use]
    pub fn is_conflicting(&self, node: NodeHandle) -> bool {
        self.pending_add.contains(&node) && self.pending_remove.contains(&node)
    }

    /// Moves both lists out, leaving the queue empty.
    pub(crate) fn take(&mut self) -> (Vec<NodeHandle>, Vec<NodeHandle>) {
        (
            std::mem::take(&mut self.pending_add),
            std::mem::take(&mut self.pending_remove),
        )
    }
}
