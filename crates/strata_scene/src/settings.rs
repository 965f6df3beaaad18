/// Tuning knobs of the [`TransformSystem`](crate::TransformSystem).
///
/// ```rust
/// use strata_scene::TransformSettings;
///
/// let settings = TransformSettings {
///     cache_capacity: 256,
///     ..Default::default()
/// };
/// assert!(settings.release_empty_caches);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSettings {
    /// Drop a root cache after a pass once it has no entries and no pending edits.
    pub release_empty_caches: bool,
    /// Capacity reserved for the entry array and index map of a new cache.
    pub cache_capacity: usize,
    /// Check the flattened-array invariants after every rebuild.
    pub validate_rebuilds: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            release_empty_caches: true,
            cache_capacity: 16,
            validate_rebuilds: cfg!(debug_assertions),
        }
    }
}
