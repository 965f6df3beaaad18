//! Error Types
//!
//! This module defines the error type used throughout the engine.
//!
//! # Overview
//!
//! [`StrataError`] covers the failure modes of the scene hierarchy and of
//! the transform subsystem:
//! - Component misuse (duplicate or missing transform)
//! - Stale node handles
//! - Hierarchy edits that would create a cycle
//!
//! # Usage
//!
//! Fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, StrataError>`.
//!
//! ```rust,ignore
//! use strata_core::{Result, StrataError};
//!
//! fn attach_camera_rig() -> Result<()> {
//!     scene.add_transform(rig, Mat4::IDENTITY)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::handles::NodeHandle;

/// The main error type for the Strata engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrataError {
    // ========================================================================
    // Component Errors
    // ========================================================================
    /// A second transform component was attached to a node that already
    /// carries one.
    ///
    /// This is a programming error: the existing component is left untouched
    /// and retrying the same call will fail the same way.
    #[error("Node {node:?} already carries a transform component")]
    DuplicateComponent {
        /// The node that already owns a transform.
        node: NodeHandle,
    },

    /// A transform operation targeted a node without a transform component.
    #[error("Node {node:?} has no transform component")]
    MissingComponent {
        /// The node that was expected to carry a transform.
        node: NodeHandle,
    },

    // ========================================================================
    // Hierarchy Errors
    // ========================================================================
    /// The handle does not refer to a live node.
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeHandle),

    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("Cannot attach {child:?} under {parent:?}: the hierarchy would contain a cycle")]
    HierarchyCycle {
        /// The node being attached.
        child: NodeHandle,
        /// The requested parent.
        parent: NodeHandle,
    },
}

/// Alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn duplicate_component_message_names_the_node() {
        let mut keys: SlotMap<NodeHandle, ()> = SlotMap::with_key();
        let node = keys.insert(());
        let err = StrataError::DuplicateComponent { node };
        let message = err.to_string();
        assert!(message.contains("already carries a transform"));
        assert!(message.contains(&format!("{node:?}")));
    }
}
