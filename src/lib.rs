//! # Strata
//!
//! Incremental hierarchical transform propagation for scene graphs.
//!
//! Nodes form a forest; the nodes that carry a [`Transform`] get their world
//! matrix recomputed once per frame from a flattened, parent-before-child
//! cache of each connected tree. Unchanged subtrees are skipped and
//! structural edits are batched until the next pass.
//!
//! This crate re-exports the member crates:
//!
//! - `strata_core`: handles, errors, string interner, signals
//! - `strata_scene`: node hierarchy, transform caches, propagation
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut scene = Scene::new();
//! let root = scene.create_node_with_name("root");
//! let child = scene.create_child(root, "child").unwrap();
//! scene.add_transform(child, Mat4::from_translation(Vec3::X)).unwrap();
//!
//! scene.next_frame();
//! assert_eq!(scene.world(child).unwrap(), Mat4::from_translation(Vec3::X));
//! ```

pub use strata_core::{errors, handles, interner, signal};
pub use strata_scene::{
    cache, edit_queue, events, hierarchy, node, propagation, scene, settings, sorter, transform,
    transform_system,
};

pub use strata_core::{Connection, NodeHandle, Result, Signal, StrataError, Symbol};
pub use strata_scene::{
    CacheEntry, FrameBegin, Hierarchy, MATRIX, MODEL_TO_WORLD_MATRIX, Node, PropagationEngine,
    PropagationStats, PropertyChanged, RebuildReport, RootCache, Scene, SceneEvent,
    StructuralEditQueue, Subscription, TopologicalSorter, Transform, TransformSettings,
    TransformSystem,
};

/// Commonly used types, plus the `glam` types of the public API.
pub mod prelude {
    pub use glam::{Mat4, Quat, Vec3};

    pub use crate::{
        Hierarchy, NodeHandle, PropagationStats, PropertyChanged, Result, Scene, SceneEvent,
        StrataError, Transform, TransformSettings, TransformSystem,
    };
}
