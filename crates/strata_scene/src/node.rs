use crate::NodeHandle;

/// A minimal scene node: a name and its place in the hierarchy.
///
/// # Design Principles
///
/// - Only keeps the data every structural traversal needs
/// - Components (such as [`Transform`](crate::Transform)) live in
///   per-subsystem maps keyed by [`NodeHandle`], not inside the node
///
/// # Hierarchy
///
/// Nodes form a forest through parent-child relationships:
/// - `parent`: Optional handle to parent node (None for root nodes)
/// - `children`: Ordered list of child node handles
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
}

impl Node {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent node handle, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Returns a read-only slice of child node handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Sets the parent of this node. Prefer [`Scene::attach`](crate::Scene::attach),
    /// which keeps both sides in sync and notifies the transform system.
    /// Exposed for building hierarchies outside of a `Scene`.
    #[inline]
    pub fn set_parent(&mut self, parent: Option<NodeHandle>) {
        self.parent = parent;
    }

    /// Appends a child handle. Same caveats as [`Node::set_parent`].
    #[inline]
    pub fn push_child(&mut self, child: NodeHandle) {
        self.children.push(child);
    }

    /// Removes a child handle, preserving sibling order.
    pub fn remove_child(&mut self, child: NodeHandle) -> bool {
        if let Some(i) = self.children.iter().position(|&c| c == child) {
            self.children.remove(i);
            true
        } else {
            false
        }
    }
}
