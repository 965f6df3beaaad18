//! Strata Scene
//!
//! Scene hierarchy and incremental world-transform propagation.
//!
//! # Pipeline
//!
//! 1. Application code edits local matrices and the node topology
//! 2. Every topology edit lands in the [`StructuralEditQueue`] of the affected
//!    [`RootCache`] (one cache per connected tree carrying transforms)
//! 3. Once per frame the [`PropagationEngine`] rebuilds caches with pending
//!    edits through the [`TopologicalSorter`], then scans each flattened cache
//!    top-down, recomputing only dirty entries
//! 4. Every world matrix that actually changed is announced through the
//!    listeners registered on the [`TransformSystem`]
//!
//! # Example
//!
//! ```rust
//! use glam::{Mat4, Vec3};
//! use strata_scene::Scene;
//!
//! let mut scene = Scene::new();
//! let root = scene.create_node_with_name("root");
//! let arm = scene.create_child(root, "arm").unwrap();
//! let hand = scene.create_child(arm, "hand").unwrap();
//!
//! scene.add_transform(arm, Mat4::from_translation(Vec3::X)).unwrap();
//! scene.add_transform(hand, Mat4::from_translation(Vec3::Y)).unwrap();
//! scene.update();
//!
//! let world = scene.world(hand).unwrap();
//! assert_eq!(world.w_axis.truncate(), Vec3::new(1.0, 1.0, 0.0));
//! ```

pub mod cache;
pub mod edit_queue;
pub mod events;
pub mod hierarchy;
pub mod node;
pub mod propagation;
pub mod scene;
pub mod settings;
pub mod sorter;
pub mod transform;
pub mod transform_system;

pub use strata_core::NodeHandle;

pub use cache::{CacheEntry, RootCache};
pub use edit_queue::StructuralEditQueue;
pub use events::{
    FrameBegin, MATRIX, MODEL_TO_WORLD_MATRIX, PropertyChanged, SceneEvent, Subscription,
};
pub use hierarchy::Hierarchy;
pub use node::Node;
pub use propagation::{PropagationEngine, PropagationStats};
pub use scene::Scene;
pub use settings::TransformSettings;
pub use sorter::{RebuildReport, TopologicalSorter};
pub use transform::Transform;
pub use transform_system::TransformSystem;
