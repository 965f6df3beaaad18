//! Read-only view of a node forest.
//!
//! The transform subsystem never owns the tree. It reads parent/child links
//! through [`Hierarchy`] at the moments it needs them: when a structural
//! edit arrives and when a cache is rebuilt.

use slotmap::SlotMap;

use crate::NodeHandle;
use crate::node::Node;

/// Parent/child access to a forest of nodes.
///
/// Unknown handles must be tolerated: `parent` returns `None` and
/// `children` an empty slice.
pub trait Hierarchy {
    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn children(&self, node: NodeHandle) -> &[NodeHandle];

    /// Topmost ancestor of `node` (the node itself when it has no parent).
    fn root_of(&self, node: NodeHandle) -> NodeHandle {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Returns `true` if `ancestor` is `node` or lies on its parent chain.
    fn is_ancestor_of(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Depth-first pre-order listing of `node` and all of its descendants.
    fn descendants(&self, node: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }
}

impl Hierarchy for SlotMap<NodeHandle, Node> {
    #[inline]
    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.get(node).and_then(|n| n.parent)
    }

    #[inline]
    fn children(&self, node: NodeHandle) -> &[NodeHandle] {
        match self.get(node) {
            Some(n) => &n.children,
            None => &[],
        }
    }
}
