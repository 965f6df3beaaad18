use std::sync::atomic::{AtomicU32, Ordering};

use glam::Mat4;
use slotmap::SlotMap;
use strata_core::{Connection, Result, Signal, StrataError};

use crate::NodeHandle;
use crate::events::{FrameBegin, SceneEvent};
use crate::hierarchy::Hierarchy;
use crate::node::Node;
use crate::propagation::PropagationStats;
use crate::settings::TransformSettings;
use crate::transform::Transform;
use crate::transform_system::TransformSystem;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Scene graph host.
///
/// Owns the node forest and the [`TransformSystem`], and forwards every
/// topology edit to the latter after applying it. World matrices are
/// refreshed by [`Scene::update`] or, once per frame, by
/// [`Scene::next_frame`].
#[derive(Debug)]
pub struct Scene {
    pub id: u32,

    nodes: SlotMap<NodeHandle, Node>,
    root_nodes: Vec<NodeHandle>,

    transforms: TransformSystem,

    // === Frame scheduling ===
    rendering_begin: Signal<FrameBegin>,
    frame_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(TransformSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: TransformSettings) -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            transforms: TransformSystem::new(settings),
            rendering_begin: Signal::new(),
            frame_id: 0,
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Adds a parentless node.
    pub fn create_node(&mut self) -> NodeHandle {
        self.create_node_with_name("")
    }

    pub fn create_node_with_name(&mut self, name: &str) -> NodeHandle {
        let handle = self.nodes.insert(Node::with_name(name));
        self.root_nodes.push(handle);
        handle
    }

    /// Adds a node directly under `parent`.
    ///
    /// # Errors
    ///
    /// [`StrataError::NodeNotFound`] if `parent` is stale.
    pub fn create_child(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        if !self.nodes.contains_key(parent) {
            return Err(StrataError::NodeNotFound(parent));
        }
        let handle = self.nodes.insert(Node::with_name(name));
        self.root_nodes.push(handle);
        self.attach(handle, parent)?;
        Ok(handle)
    }

    /// Makes `child` the last child of `parent`, detaching it from its
    /// current parent first.
    ///
    /// # Errors
    ///
    /// - [`StrataError::NodeNotFound`] if either handle is stale
    /// - [`StrataError::HierarchyCycle`] if `child` is `parent` or one of its
    ///   ancestors
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        for node in [child, parent] {
            if !self.nodes.contains_key(node) {
                return Err(StrataError::NodeNotFound(node));
            }
        }
        if self.nodes.is_ancestor_of(child, parent) {
            return Err(StrataError::HierarchyCycle { child, parent });
        }

        let old_parent = self.nodes[child].parent;
        if old_parent == Some(parent) {
            return Ok(());
        }

        // 1. Unlink
        match old_parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(p) {
                    n.remove_child(child);
                }
            }
            None => self.root_nodes.retain(|&n| n != child),
        }

        // 2. Link
        self.nodes[parent].push_child(child);
        self.nodes[child].set_parent(Some(parent));

        // 3. Notify
        let event = match old_parent {
            Some(old_parent) => SceneEvent::NodeReparented {
                old_parent,
                new_parent: parent,
                node: child,
            },
            None => SceneEvent::NodeAttached {
                parent,
                node: child,
            },
        };
        self.transforms.handle_event(&self.nodes, &event);
        Ok(())
    }

    /// Detaches `node` from its parent, making it a root. Does nothing for a
    /// node that is already a root.
    ///
    /// # Errors
    ///
    /// [`StrataError::NodeNotFound`] if `node` is stale.
    pub fn detach(&mut self, node: NodeHandle) -> Result<()> {
        let parent = self
            .nodes
            .get(node)
            .ok_or(StrataError::NodeNotFound(node))?
            .parent;
        let Some(parent) = parent else {
            return Ok(());
        };

        if let Some(p) = self.nodes.get_mut(parent) {
            p.remove_child(node);
        }
        self.nodes[node].set_parent(None);
        self.root_nodes.push(node);

        self.transforms
            .handle_event(&self.nodes, &SceneEvent::NodeDetached { parent, node });
        Ok(())
    }

    /// Removes `node` and its whole subtree, transforms included.
    pub fn remove_node(&mut self, node: NodeHandle) {
        if !self.nodes.contains_key(node) {
            log::warn!("remove_node: {node:?} not found");
            return;
        }

        let subtree = self.nodes.descendants(node);
        for &n in &subtree {
            if self.transforms.remove_transform(n).is_ok() {
                log::trace!("remove_node: dropped transform of {n:?}");
            }
        }

        if self.detach(node).is_err() {
            return;
        }
        for n in subtree {
            self.nodes.remove(n);
        }
        self.root_nodes.retain(|&n| n != node);
    }

    #[must_use]
    pub fn get_node(&self, node: NodeHandle) -> Option<&Node> {
        self.nodes.get(node)
    }

    #[must_use]
    pub fn get_name(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(node).map(Node::name)
    }

    pub fn set_name(&mut self, node: NodeHandle, name: &str) {
        match self.nodes.get_mut(node) {
            Some(n) => name.clone_into(&mut n.name),
            None => log::warn!("set_name: {node:?} not found"),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.root_nodes
    }

    /// Read access to the node forest.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &SlotMap<NodeHandle, Node> {
        &self.nodes
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// # Errors
    ///
    /// - [`StrataError::NodeNotFound`] if `node` is stale
    /// - [`StrataError::DuplicateComponent`] if `node` already has a transform
    pub fn add_transform(&mut self, node: NodeHandle, local: Mat4) -> Result<()> {
        if !self.nodes.contains_key(node) {
            return Err(StrataError::NodeNotFound(node));
        }
        self.transforms.add_transform(&self.nodes, node, local)
    }

    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn remove_transform(&mut self, node: NodeHandle) -> Result<Transform> {
        self.transforms.remove_transform(node)
    }

    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn set_local(&mut self, node: NodeHandle, local: Mat4) -> Result<bool> {
        self.transforms.set_local(node, local)
    }

    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn local(&self, node: NodeHandle) -> Result<Mat4> {
        self.transforms.local(node)
    }

    /// Last published world matrix of `node`.
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn world(&self, node: NodeHandle) -> Result<Mat4> {
        self.transforms.world(node)
    }

    /// World matrix of `node` after bringing its cache up to date.
    ///
    /// # Errors
    ///
    /// [`StrataError::MissingComponent`] if `node` has no transform.
    pub fn world_forced(&mut self, node: NodeHandle) -> Result<Mat4> {
        self.transforms.world_forced(&self.nodes, node)
    }

    #[inline]
    #[must_use]
    pub fn transforms(&self) -> &TransformSystem {
        &self.transforms
    }

    /// Mutable access, for listener registration and explicit cache merges.
    #[inline]
    pub fn transforms_mut(&mut self) -> &mut TransformSystem {
        &mut self.transforms
    }

    // ========================================================================
    // Frame pipeline
    // ========================================================================

    /// Runs one propagation pass.
    pub fn update(&mut self) -> PropagationStats {
        self.transforms.run(&self.nodes, false)
    }

    /// Like [`update`](Self::update), but rebuilds every cache.
    pub fn update_forced(&mut self) -> PropagationStats {
        self.transforms.run(&self.nodes, true)
    }

    /// Starts a new frame: runs the propagation pass, then notifies the
    /// rendering-begin listeners.
    pub fn next_frame(&mut self) -> PropagationStats {
        self.frame_id += 1;
        let stats = self.update();
        self.rendering_begin.emit(&FrameBegin {
            frame_id: self.frame_id,
            stats,
        });
        stats
    }

    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Registers a listener for the start of each frame. World matrices are
    /// already up to date when it runs.
    pub fn on_rendering_begin(
        &mut self,
        priority: i32,
        callback: impl FnMut(&FrameBegin) + 'static,
    ) -> Connection {
        self.rendering_begin.connect_with_priority(priority, callback)
    }

    pub fn disconnect_rendering_begin(&mut self, connection: Connection) -> bool {
        self.rendering_begin.disconnect(connection)
    }
}
