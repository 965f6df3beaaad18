//! Flattened transform cache of one connected tree.
//!
//! A [`RootCache`] stores one [`CacheEntry`] per transform-bearing node
//! under its root, laid out so that a single forward scan visits every
//! parent before its children:
//!
//! ```text
//!   R (no transform)           index  node  parent  children
//!   ├── A                        0     A     -       2..3
//!   │   └── C                    1     B     -       -
//!   └── B                        2     C     0       -
//! ```
//!
//! Entry indices are stable only between rebuilds.

use std::ops::Range;

use rustc_hash::{FxBuildHasher, FxHashMap};
use slotmap::SecondaryMap;

use crate::NodeHandle;
use crate::edit_queue::StructuralEditQueue;
use crate::hierarchy::Hierarchy;
use crate::sorter::{RebuildReport, TopologicalSorter};
use crate::transform::Transform;

/// One flattened slot for a transform-bearing node.
///
/// The entry holds no matrix data: local and world matrices stay in the
/// node's [`Transform`](crate::Transform), reached through `node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub node: NodeHandle,
    /// Index of the nearest transform-bearing ancestor; `None` at the top of the cache.
    pub parent: Option<usize>,
    pub first_child: usize,
    pub num_children: usize,
    pub dirty: bool,
}

impl CacheEntry {
    pub(crate) fn new(node: NodeHandle, parent: Option<usize>) -> Self {
        Self {
            node,
            parent,
            first_child: 0,
            num_children: 0,
            dirty: true,
        }
    }

    /// Contiguous index range of this entry's children.
    #[inline]
    #[must_use]
    pub fn children(&self) -> Range<usize> {
        self.first_child..self.first_child + self.num_children
    }
}

/// Flattened entries, node index and pending edits of one rooted tree.
#[derive(Debug)]
pub struct RootCache {
    root: NodeHandle,
    pub(crate) entries: Vec<CacheEntry>,
    pub(crate) node_to_id: FxHashMap<NodeHandle, usize>,
    pub(crate) queue: StructuralEditQueue,
    pub(crate) rebuilds: u64,
}

impl RootCache {
    #[must_use]
    pub fn new(root: NodeHandle) -> Self {
        Self::with_capacity(root, 0)
    }

    #[must_use]
    pub fn with_capacity(root: NodeHandle, capacity: usize) -> Self {
        Self {
            root,
            entries: Vec::with_capacity(capacity),
            node_to_id: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            queue: StructuralEditQueue::new(),
            rebuilds: 0,
        }
    }

    /// The tree root this cache is keyed by.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of `node`'s entry as of the last rebuild.
    #[inline]
    #[must_use]
    pub fn index_of(&self, node: NodeHandle) -> Option<usize> {
        self.node_to_id.get(&node).copied()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.node_to_id.contains_key(&node)
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &StructuralEditQueue {
        &self.queue
    }

    #[inline]
    pub fn queue_mut(&mut self) -> &mut StructuralEditQueue {
        &mut self.queue
    }

    /// `true` when structural edits are pending.
    #[inline]
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of rebuilds performed since the cache was created.
    #[inline]
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// `true` once the cache holds nothing and expects nothing.
    #[inline]
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.entries.is_empty() && self.queue.is_empty()
    }

    /// Applies the pending edits through `sorter`. See
    /// [`TopologicalSorter::rebuild`].
    pub fn rebuild<H: Hierarchy>(
        &mut self,
        sorter: &mut TopologicalSorter,
        hierarchy: &H,
        transforms: &mut SecondaryMap<NodeHandle, Transform>,
    ) -> RebuildReport {
        sorter.rebuild(self, hierarchy, transforms)
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.dirty = true;
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.dirty)
    }

    /// Checks the layout invariants: parents precede children, children are
    /// contiguous and point back at their parent, and the node index agrees
    /// with entry positions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if self.node_to_id.len() != self.entries.len() {
            return false;
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if self.node_to_id.get(&entry.node) != Some(&i) {
                return false;
            }
            if let Some(p) = entry.parent {
                if p >= i || !self.entries[p].children().contains(&i) {
                    return false;
                }
            }
            if entry.num_children > 0 && entry.first_child <= i {
                return false;
            }
            for child in entry.children() {
                match self.entries.get(child) {
                    Some(c) if c.parent == Some(i) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<NodeHandle> {
        let mut keys: SlotMap<NodeHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| keys.insert(())).collect()
    }

    fn cache_with(root: NodeHandle, entries: Vec<CacheEntry>) -> RootCache {
        let mut cache = RootCache::new(root);
        for (i, e) in entries.iter().enumerate() {
            cache.node_to_id.insert(e.node, i);
        }
        cache.entries = entries;
        cache
    }

    #[test]
    fn well_formed_layout() {
        let h = handles(4);
        let mut a = CacheEntry::new(h[1], None);
        a.first_child = 2;
        a.num_children = 1;
        let b = CacheEntry::new(h[2], None);
        let c = CacheEntry::new(h[3], Some(0));

        let cache = cache_with(h[0], vec![a, b, c]);
        assert!(cache.is_well_formed());
        assert_eq!(cache.index_of(h[3]), Some(2));
        assert!(cache.is_dirty(1));
        assert!(!cache.is_dirty(7));
    }

    #[test]
    fn child_before_parent_is_rejected() {
        let h = handles(3);
        let child = CacheEntry::new(h[2], Some(1));
        let mut parent = CacheEntry::new(h[1], None);
        parent.first_child = 0;
        parent.num_children = 1;

        let cache = cache_with(h[0], vec![child, parent]);
        assert!(!cache.is_well_formed());
    }

    #[test]
    fn stale_index_is_rejected() {
        let h = handles(3);
        let mut cache = cache_with(
            h[0],
            vec![CacheEntry::new(h[1], None), CacheEntry::new(h[2], None)],
        );
        cache.node_to_id.insert(h[2], 0);
        assert!(!cache.is_well_formed());
    }

    #[test]
    fn fresh_cache_is_vacant() {
        let h = handles(2);
        let mut cache = RootCache::new(h[0]);
        assert!(cache.is_vacant());

        cache.queue_mut().enqueue_add(h[1]);
        assert!(!cache.is_vacant());
        assert!(cache.needs_rebuild());
    }
}
