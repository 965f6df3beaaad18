use slotmap::new_key_type;

new_key_type! {
    /// Generational handle of a scene node.
    ///
    /// Ownership of the node itself lies with whatever container issued the
    /// handle (usually a `Scene`). Subsystems only store the handle and must
    /// tolerate it going stale.
    pub struct NodeHandle;
}
