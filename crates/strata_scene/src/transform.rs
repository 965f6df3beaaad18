use glam::{Mat4, Vec3};

use crate::NodeHandle;

/// Transform component
///
/// Owns a node's local matrix and the world (model-to-world) matrix computed
/// by the propagation pass. Exactly one node owns a given component.
///
/// The world matrix is read-only outside this crate: only the
/// [`PropagationEngine`](crate::PropagationEngine) writes it, and every
/// write it performs is announced through the change notifications of the
/// [`TransformSystem`](crate::TransformSystem).
#[derive(Debug)]
pub struct Transform {
    pub(crate) local: Mat4,
    pub(crate) world: Mat4,

    // === Cache bookkeeping ===
    /// Root of the cache this component is registered with.
    pub(crate) owner: Option<NodeHandle>,
    /// Index of the materialized cache entry; stable only between rebuilds.
    pub(crate) slot: Option<usize>,
}

impl Transform {
    #[must_use]
    pub fn new(local: Mat4) -> Self {
        Self {
            local,
            world: Mat4::IDENTITY,
            owner: None,
            slot: None,
        }
    }

    /// Stores `local` unless it is value-equal to the current matrix.
    /// Returns whether the stored value changed.
    pub(crate) fn replace_local(&mut self, local: Mat4) -> bool {
        if self.local == local {
            return false;
        }
        self.local = local;
        true
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// The local matrix, always current.
    #[inline]
    #[must_use]
    pub fn local(&self) -> &Mat4 {
        &self.local
    }

    /// The world matrix published by the last propagation pass.
    #[inline]
    #[must_use]
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Root node of the cache this component belongs to, if registered.
    #[inline]
    #[must_use]
    pub fn cache_root(&self) -> Option<NodeHandle> {
        self.owner
    }

    /// Index of this component's cache entry, if materialized.
    #[inline]
    #[must_use]
    pub fn cache_index(&self) -> Option<usize> {
        self.slot
    }

    // ========================================================================
    // World-space helpers
    // ========================================================================

    /// Transforms a model-space point into world space.
    #[inline]
    #[must_use]
    pub fn model_to_world(&self, point: Vec3) -> Vec3 {
        self.world.transform_point3(point)
    }

    /// Transforms a model-space direction into world space (no translation).
    #[inline]
    #[must_use]
    pub fn delta_model_to_world(&self, vector: Vec3) -> Vec3 {
        self.world.transform_vector3(vector)
    }

    /// Transforms a world-space point into model space.
    ///
    /// The inverse is computed on demand; a singular world matrix yields
    /// non-finite components.
    #[must_use]
    pub fn world_to_model(&self, point: Vec3) -> Vec3 {
        self.world.inverse().transform_point3(point)
    }

    /// Transforms a world-space direction into model space.
    #[must_use]
    pub fn delta_world_to_model(&self, vector: Vec3) -> Vec3 {
        self.world.inverse().transform_vector3(vector)
    }

    /// World-space position of the model origin.
    #[inline]
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY)
    }
}
