//! Per-frame propagation pass.
//!
//! One linear scan over a [`RootCache`] in stored order. Because parents are
//! stored before their children, a parent's world matrix is final by the time
//! any child reads it, and marking children dirty never requires a second
//! pass.

use std::ops::AddAssign;

use glam::Mat4;
use slotmap::SecondaryMap;

use crate::NodeHandle;
use crate::cache::RootCache;
use crate::hierarchy::Hierarchy;
use crate::sorter::TopologicalSorter;
use crate::transform::Transform;

/// Work performed by one or more passes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PropagationStats {
    /// Caches rebuilt before scanning.
    pub rebuilds: usize,
    /// Entries materialized by those rebuilds.
    pub materialized: usize,
    /// Dirty entries recomputed.
    pub processed: usize,
    /// World matrices that actually changed value.
    pub writes: usize,
}

impl AddAssign for PropagationStats {
    fn add_assign(&mut self, rhs: Self) {
        self.rebuilds += rhs.rebuilds;
        self.materialized += rhs.materialized;
        self.processed += rhs.processed;
        self.writes += rhs.writes;
    }
}

/// Drives rebuilds and dirty-entry propagation for root caches.
#[derive(Debug, Default)]
pub struct PropagationEngine {
    sorter: TopologicalSorter,
    validate: bool,
}

impl PropagationEngine {
    #[must_use]
    pub fn new(validate: bool) -> Self {
        Self {
            sorter: TopologicalSorter::new(),
            validate,
        }
    }

    /// Runs one pass over `cache`.
    ///
    /// The cache is rebuilt first when it has pending edits or when
    /// `force_rebuild` is set. `on_write` is called once for every world
    /// matrix that changed value, in parent-before-child order.
    pub fn run_cache<H: Hierarchy>(
        &mut self,
        cache: &mut RootCache,
        hierarchy: &H,
        transforms: &mut SecondaryMap<NodeHandle, Transform>,
        force_rebuild: bool,
        mut on_write: impl FnMut(NodeHandle, Mat4),
    ) -> PropagationStats {
        let mut stats = PropagationStats::default();

        if force_rebuild || cache.needs_rebuild() {
            let report = cache.rebuild(&mut self.sorter, hierarchy, transforms);
            stats.rebuilds = 1;
            stats.materialized = report.materialized;
            if self.validate && !cache.is_well_formed() {
                log::error!(
                    "Cache {:?} violates its layout invariants after rebuild",
                    cache.root()
                );
            }
        }

        for index in 0..cache.entries.len() {
            let entry = cache.entries[index];
            if !entry.dirty {
                continue;
            }
            cache.entries[index].dirty = false;
            stats.processed += 1;

            let Some(local) = transforms.get(entry.node).map(|t| t.local) else {
                continue;
            };
            let parent_world = entry
                .parent
                .and_then(|p| transforms.get(cache.entries[p].node))
                .map(|t| t.world);
            let new_world = match parent_world {
                Some(parent_world) => parent_world * local,
                None => local,
            };

            let Some(transform) = transforms.get_mut(entry.node) else {
                continue;
            };
            if transform.world == new_world {
                continue;
            }
            transform.world = new_world;
            stats.writes += 1;
            on_write(entry.node, new_world);

            for child in entry.children() {
                cache.entries[child].dirty = true;
            }
        }

        log::trace!(
            "Propagated cache {:?}: {} processed, {} written",
            cache.root(),
            stats.processed,
            stats.writes
        );
        stats
    }
}
