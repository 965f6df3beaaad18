//! Transform subsystem front-end.
//!
//! [`TransformSystem`] owns every [`Transform`] component and one
//! [`RootCache`] per connected tree that carries transforms. It turns
//! component and topology events into queued edits, and runs the
//! [`PropagationEngine`] over the caches once per frame.
//!
//! # Ownership
//!
//! Every registered component records the root of the cache it belongs to.
//! Structural events keep that record current:
//!
//! - a root joining another tree folds its cache into the surviving one
//!   ([`TransformSystem::on_root_merge`])
//! - a detached subtree moves to a fresh cache keyed by its new root
//! - a move inside one tree only re-sorts the same cache

use glam::Mat4;
use rustc_hash::{FxBuildHasher, FxHashMap};
use slotmap::SecondaryMap;
use strata_core::{Result, StrataError, interner};

use crate::NodeHandle;
use crate::cache::RootCache;
use crate::events::{PropertyChanged, SceneEvent, Subscription, TransformSignals};
use crate::hierarchy::Hierarchy;
use crate::propagation::{PropagationEngine, PropagationStats};
use crate::settings::TransformSettings;
use crate::transform::Transform;

#[derive(Debug)]
pub struct TransformSystem {
    settings: TransformSettings,
    transforms: SecondaryMap<NodeHandle, Transform>,
    caches: FxHashMap<NodeHandle, RootCache>,
    engine: PropagationEngine,
    signals: TransformSignals,
    /// Scratch list of cache roots, sorted for a deterministic pass order.
    roots: Vec<NodeHandle>,
}

impl TransformSystem {
    #[must_use]
    pub fn new(settings: TransformSettings) -> Self {
        Self {
            engine: PropagationEngine::new(settings.validate_rebuilds),
            settings,
            transforms: SecondaryMap::new(),
            caches: FxHashMap::with_hasher(FxBuildHasher),
            signals: TransformSignals::new(),
            roots: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Gives `node` a transform component and queues it with its tree's cache.
    ///
    /// Removing and re-adding the component on the same node between two
    /// passes leaves the node queued for both addition and removal, so the
    /// next rebuild drops it. It stays unregistered until a later structural
    /// event touches the node.
    ///
    /// # Errors
    ///
    /// [`StrataError::DuplicateComponent`] if `node` already has one; the
    /// existing component is left untouched.
    pub fn add_transform<H: Hierarchy>(
        &mut self,
        hierarchy: &H,
        node: NodeHandle,
        local: Mat4,
    ) -> Result<()> {
        if self.transforms.contains_key(node) {
            return Err(StrataError::DuplicateComponent { node });
        }

        let root = hierarchy.root_of(node);
        let mut transform = Transform::new(local);
        transform.owner = Some(root);
        self.transforms.insert(node, transform);
        if !self.transforms.contains_key(node) {
            // Stale key rejected by the secondary map.
            return Err(StrataError::NodeNotFound(node));
        }

        cache_for(&mut self.caches, root, self.settings.cache_capacity)
            .queue
            .enqueue_add(node);
        Ok(())
    }

    /// Removes `node`'s transform component and queues its cache entry for
    /// removal. Transform-bearing descendants fall back to the next
    /// transform-bearing ancestor at the next rebuild.
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn remove_transform(&mut self, node: NodeHandle) -> Result<Transform> {
        let mut transform = self
            .transforms
            .remove(node)
            .ok_or(StrataError::MissingComponent { node })?;

        if let Some(cache) = transform.owner.and_then(|root| self.caches.get_mut(&root)) {
            cache.queue.enqueue_remove(node);
        }
        transform.owner = None;
        transform.slot = None;
        Ok(transform)
    }

    #[inline]
    #[must_use]
    pub fn has_transform(&self, node: NodeHandle) -> bool {
        self.transforms.contains_key(node)
    }

    #[inline]
    #[must_use]
    pub fn transform(&self, node: NodeHandle) -> Option<&Transform> {
        self.transforms.get(node)
    }

    /// Number of transform components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Sets `node`'s local matrix. Value-equal writes are ignored; otherwise
    /// the node's cache entry, if materialized, is marked dirty and a
    /// `"matrix"` change is announced.
    ///
    /// Returns whether the stored value changed.
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn set_local(&mut self, node: NodeHandle, local: Mat4) -> Result<bool> {
        let transform = self
            .transforms
            .get_mut(node)
            .ok_or(StrataError::MissingComponent { node })?;

        if !transform.replace_local(local) {
            return Ok(false);
        }
        let (owner, slot) = (transform.owner, transform.slot);
        if let (Some(root), Some(slot)) = (owner, slot)
            && let Some(cache) = self.caches.get_mut(&root)
        {
            cache.mark_dirty(slot);
        }
        // Unregistered components report themselves as context.
        self.signals
            .emit_local_changed(node, owner.unwrap_or(node), local);
        Ok(true)
    }

    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn local(&self, node: NodeHandle) -> Result<Mat4> {
        self.transforms
            .get(node)
            .map(|t| t.local)
            .ok_or(StrataError::MissingComponent { node })
    }

    /// The world matrix published by the last pass. Stale while edits are
    /// pending; see [`world_forced`](Self::world_forced).
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn world(&self, node: NodeHandle) -> Result<Mat4> {
        self.transforms
            .get(node)
            .map(|t| t.world)
            .ok_or(StrataError::MissingComponent { node })
    }

    /// Runs a pass over the whole cache owning `node`, then returns its world
    /// matrix. The cache is rebuilt first only if it is structurally stale.
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn world_forced<H: Hierarchy>(&mut self, hierarchy: &H, node: NodeHandle) -> Result<Mat4> {
        let owner = self
            .transforms
            .get(node)
            .ok_or(StrataError::MissingComponent { node })?
            .owner;

        if let Some(root) = owner {
            let stale = self.caches.get(&root).is_some_and(RootCache::needs_rebuild);
            self.run_cache(hierarchy, root, stale);
        }
        self.world(node)
    }

    // ========================================================================
    // Structural events
    // ========================================================================

    /// Applies a topology change that has already been made to `hierarchy`.
    pub fn handle_event<H: Hierarchy>(&mut self, hierarchy: &H, event: &SceneEvent) {
        match *event {
            SceneEvent::NodeAttached { parent, node } => {
                let surviving = hierarchy.root_of(parent);
                if self.caches.contains_key(&node) {
                    self.on_root_merge(surviving, node);
                }
                self.adopt_orphans(hierarchy, node, surviving);
            }
            SceneEvent::NodeDetached { node, .. } => {
                self.migrate_subtree(hierarchy, node, node);
            }
            SceneEvent::NodeReparented {
                new_parent, node, ..
            } => {
                let target = hierarchy.root_of(new_parent);
                self.migrate_subtree(hierarchy, node, target);
            }
        }
    }

    /// Folds the cache of `subordinate` into the cache of `surviving`.
    ///
    /// Every entry and every pending edit of the subordinate cache, removals
    /// included, is queued for addition to the surviving cache, and the
    /// subordinate cache is discarded. The next rebuild walks the real tree,
    /// so queued nodes that left it or lost their transform are skipped.
    /// Does nothing if `subordinate` has no cache.
    pub fn on_root_merge(&mut self, surviving: NodeHandle, subordinate: NodeHandle) {
        if surviving == subordinate {
            return;
        }
        let Some(mut absorbed) = self.caches.remove(&subordinate) else {
            return;
        };

        let queued = absorbed
            .queue
            .pending_adds()
            .iter()
            .chain(absorbed.queue.pending_removes())
            .copied();
        let nodes = absorbed.entries.iter().map(|e| e.node).chain(queued);
        for node in nodes {
            if let Some(t) = self.transforms.get_mut(node)
                && t.owner == Some(subordinate)
            {
                t.owner = Some(surviving);
                t.slot = None;
            }
        }

        let target = cache_for(&mut self.caches, surviving, self.settings.cache_capacity);
        for entry in &absorbed.entries {
            target.queue.enqueue_add(entry.node);
        }
        let moved = absorbed.entries.len() + target.queue.absorb(&mut absorbed.queue);

        log::debug!("Merged cache {subordinate:?} into {surviving:?} ({moved} node(s) queued)");
    }

    /// Points every transform under `node` at the cache of `target`.
    fn migrate_subtree<H: Hierarchy>(&mut self, hierarchy: &H, node: NodeHandle, target: NodeHandle) {
        let capacity = self.settings.cache_capacity;
        for descendant in hierarchy.descendants(node) {
            let Some(transform) = self.transforms.get_mut(descendant) else {
                continue;
            };

            if transform.owner != Some(target) {
                if let Some(old) = transform.owner.and_then(|root| self.caches.get_mut(&root)) {
                    old.queue.enqueue_remove(descendant);
                }
                transform.owner = Some(target);
                transform.slot = None;
            }
            // Same cache: queue it again so the move forces a re-sort.
            cache_for(&mut self.caches, target, capacity)
                .queue
                .enqueue_add(descendant);
        }
    }

    /// Registers unowned transforms under `node` with the cache of `root`.
    fn adopt_orphans<H: Hierarchy>(&mut self, hierarchy: &H, node: NodeHandle, root: NodeHandle) {
        let capacity = self.settings.cache_capacity;
        for descendant in hierarchy.descendants(node) {
            if let Some(transform) = self.transforms.get_mut(descendant)
                && transform.owner.is_none()
            {
                transform.owner = Some(root);
                cache_for(&mut self.caches, root, capacity)
                    .queue
                    .enqueue_add(descendant);
            }
        }
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    /// One propagation pass over every cache.
    ///
    /// Caches with pending edits are rebuilt first; `force_all` rebuilds all
    /// of them. Vacant caches are released afterwards when configured.
    pub fn run<H: Hierarchy>(&mut self, hierarchy: &H, force_all: bool) -> PropagationStats {
        let Self {
            caches,
            transforms,
            engine,
            signals,
            roots,
            ..
        } = self;

        roots.clear();
        roots.extend(caches.keys().copied());
        roots.sort_unstable();

        let mut stats = PropagationStats::default();
        for root in roots.iter().copied() {
            if let Some(cache) = caches.get_mut(&root) {
                stats += engine.run_cache(cache, hierarchy, transforms, force_all, |node, world| {
                    signals.emit_world_changed(node, root, world);
                });
            }
        }

        if self.settings.release_empty_caches {
            self.caches.retain(|root, cache| {
                let vacant = cache.is_vacant();
                if vacant {
                    log::debug!("Released empty cache {root:?}");
                }
                !vacant
            });
        }

        stats
    }

    fn run_cache<H: Hierarchy>(
        &mut self,
        hierarchy: &H,
        root: NodeHandle,
        force_rebuild: bool,
    ) -> PropagationStats {
        let Self {
            caches,
            transforms,
            engine,
            signals,
            ..
        } = self;
        let Some(cache) = caches.get_mut(&root) else {
            return PropagationStats::default();
        };
        engine.run_cache(cache, hierarchy, transforms, force_rebuild, |node, world| {
            signals.emit_world_changed(node, root, world);
        })
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The cache keyed by tree root `root`.
    #[must_use]
    pub fn cache(&self, root: NodeHandle) -> Option<&RootCache> {
        self.caches.get(&root)
    }

    /// The cache `node`'s transform is registered with.
    #[must_use]
    pub fn cache_of(&self, node: NodeHandle) -> Option<&RootCache> {
        let root = self.transforms.get(node)?.owner?;
        self.caches.get(&root)
    }

    #[inline]
    #[must_use]
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    pub fn caches(&self) -> impl Iterator<Item = &RootCache> {
        self.caches.values()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Listens to every property change of every transform.
    pub fn on_property_changed(
        &mut self,
        callback: impl FnMut(&PropertyChanged) + 'static,
    ) -> Subscription {
        self.signals.connect_generic(callback)
    }

    /// Listens to changes of the property called `name`.
    pub fn on_property(
        &mut self,
        name: &str,
        callback: impl FnMut(&PropertyChanged) + 'static,
    ) -> Subscription {
        self.signals.connect_named(interner::intern(name), callback)
    }

    /// Listens to world matrix changes.
    pub fn on_world_matrix_changed(
        &mut self,
        callback: impl FnMut(&PropertyChanged) + 'static,
    ) -> Subscription {
        let property = self.signals.model_to_world();
        self.signals.connect_named(property, callback)
    }

    /// Returns `false` if the subscription was already disconnected.
    pub fn disconnect(&mut self, subscription: Subscription) -> bool {
        self.signals.disconnect(subscription)
    }
}

impl Default for TransformSystem {
    fn default() -> Self {
        Self::new(TransformSettings::default())
    }
}

fn cache_for(
    caches: &mut FxHashMap<NodeHandle, RootCache>,
    root: NodeHandle,
    capacity: usize,
) -> &mut RootCache {
    caches.entry(root).or_insert_with(|| {
        log::debug!("Created cache for root {root:?}");
        RootCache::with_capacity(root, capacity)
    })
}
