//! Rebuild step: re-flattens a [`RootCache`] after structural edits.
//!
//! The sorter walks the actual tree from the cache root and emits entries
//! block by block: the transform-bearing nodes nearest to a given ancestor
//! are discovered together (looking through nodes without a transform) and
//! appended as one contiguous run, then each of them is expanded in turn.
//! This yields parent-before-child order and contiguous children in one
//! linear pass, with no separate sort.
//!
//! Cost is O(V) in the number of nodes under the root and is only paid on
//! frames with structural edits.

use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;
use smallvec::SmallVec;

use crate::NodeHandle;
use crate::cache::{CacheEntry, RootCache};
use crate::hierarchy::Hierarchy;
use crate::transform::Transform;

/// Outcome of one rebuild.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    /// Entries in the rebuilt array.
    pub materialized: usize,
    /// Previously materialized entries purged by a pending removal.
    pub purged: usize,
    /// Nodes queued for both addition and removal (removal wins).
    pub dropped: usize,
    /// Queued nodes no longer reachable from the cache root.
    pub unreachable: usize,
}

/// Reusable scratch state for rebuilds.
///
/// Buffers are cleared, not freed, between rebuilds.
#[derive(Debug, Default)]
pub struct TopologicalSorter {
    removed: FxHashSet<NodeHandle>,
    working: FxHashSet<NodeHandle>,
    walk: Vec<NodeHandle>,
    expand: Vec<usize>,
}

impl TopologicalSorter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `cache`'s pending edits and rebuilds its entry array.
    ///
    /// Every rebuilt entry comes out dirty. Components that end up without
    /// an entry in this cache lose their cache index.
    pub fn rebuild<H: Hierarchy>(
        &mut self,
        cache: &mut RootCache,
        hierarchy: &H,
        transforms: &mut SecondaryMap<NodeHandle, Transform>,
    ) -> RebuildReport {
        let root = cache.root();
        let mut report = RebuildReport::default();

        // Both lists are consumed here, whatever ends up materialized.
        let (adds, removes) = cache.queue.take();
        self.removed.clear();
        self.removed.extend(removes);
        self.working.clear();

        // 1. Purge removed nodes from the index.
        for node in &self.removed {
            if cache.node_to_id.remove(node).is_some() {
                report.purged += 1;
            }
        }

        // 2. Working set = residual members + newly added nodes.
        self.working.extend(cache.node_to_id.keys().copied());
        let mut dropped: SmallVec<[NodeHandle; 4]> = SmallVec::new();
        for node in adds {
            if !self.removed.contains(&node) {
                self.working.insert(node);
            } else if !dropped.contains(&node) {
                dropped.push(node);
            }
        }
        if !dropped.is_empty() {
            report.dropped = dropped.len();
            log::warn!(
                "Cache {root:?}: {dropped:?} queued for both addition and removal; removal wins"
            );
        }

        // 3. + 4. Walk the real tree and materialize entries in block order.
        cache.entries.clear();
        cache.node_to_id.clear();
        {
            let working = &self.working;
            let is_member =
                |node: NodeHandle| working.contains(&node) && transforms.contains_key(node);

            let top = collect_block(
                hierarchy,
                &mut self.walk,
                root,
                true,
                None,
                &is_member,
                cache,
            );

            self.expand.clear();
            self.expand.extend(top.rev());
            while let Some(index) = self.expand.pop() {
                let node = cache.entries[index].node;
                let block = collect_block(
                    hierarchy,
                    &mut self.walk,
                    node,
                    false,
                    Some(index),
                    &is_member,
                    cache,
                );
                cache.entries[index].first_child = block.start;
                cache.entries[index].num_children = block.len();
                self.expand.extend(block.rev());
            }
        }

        // Publish the new indices back to the components.
        for (index, entry) in cache.entries.iter().enumerate() {
            if let Some(t) = transforms.get_mut(entry.node) {
                t.owner = Some(root);
                t.slot = Some(index);
            }
        }

        // Anything that was meant for this cache but did not materialize
        // loses its registration.
        let mut stranded: SmallVec<[NodeHandle; 8]> = SmallVec::new();
        for node in self.working.iter().chain(self.removed.iter()) {
            if cache.node_to_id.contains_key(node) {
                continue;
            }
            let Some(t) = transforms.get_mut(*node) else {
                continue;
            };
            if t.owner == Some(root) {
                t.owner = None;
                t.slot = None;
                if self.working.contains(node) {
                    stranded.push(*node);
                }
            }
        }
        if !stranded.is_empty() {
            report.unreachable = stranded.len();
            log::warn!(
                "{} queued node(s) are no longer reachable from cache root {root:?}: {stranded:?}",
                stranded.len()
            );
        }

        cache.rebuilds += 1;
        report.materialized = cache.entries.len();
        log::trace!(
            "Rebuilt cache {root:?}: {} entries ({} purged, {} dropped)",
            report.materialized,
            report.purged,
            report.dropped
        );
        report
    }
}

/// Appends the transform-bearing nodes nearest to `start` as one contiguous
/// run of entries and returns its index range.
///
/// With `include_start`, `start` itself is a candidate; otherwise the search
/// begins at its children. Nodes that are not members are looked through,
/// members are not descended into.
fn collect_block<H: Hierarchy>(
    hierarchy: &H,
    walk: &mut Vec<NodeHandle>,
    start: NodeHandle,
    include_start: bool,
    parent: Option<usize>,
    is_member: &impl Fn(NodeHandle) -> bool,
    cache: &mut RootCache,
) -> std::ops::Range<usize> {
    let first = cache.entries.len();

    walk.clear();
    if include_start {
        walk.push(start);
    } else {
        walk.extend(hierarchy.children(start).iter().rev().copied());
    }

    while let Some(node) = walk.pop() {
        if is_member(node) {
            cache.node_to_id.insert(node, cache.entries.len());
            cache.entries.push(CacheEntry::new(node, parent));
        } else {
            walk.extend(hierarchy.children(node).iter().rev().copied());
        }
    }

    first..cache.entries.len()
}
