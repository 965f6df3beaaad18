//! Events exchanged between the scene and the transform subsystem.
//!
//! Inbound: [`SceneEvent`] describes a topology change that already happened.
//! Outbound: [`PropertyChanged`] is fired for every local write that changes
//! a value and for every world matrix the propagation pass actually changes.
//! [`FrameBegin`] fires once per frame after the pass.

use glam::Mat4;
use rustc_hash::FxHashMap;
use strata_core::{Connection, Signal, Symbol, interner};

use crate::NodeHandle;
use crate::propagation::PropagationStats;

/// Property name of a transform's local matrix.
pub const MATRIX: &str = "matrix";
/// Property name of a transform's world matrix.
pub const MODEL_TO_WORLD_MATRIX: &str = "modelToWorldMatrix";

/// A structural edit of the node forest, reported after it was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// A parentless node was attached under `parent`.
    NodeAttached { parent: NodeHandle, node: NodeHandle },
    /// `node` was detached from `parent` and is now a root.
    NodeDetached { parent: NodeHandle, node: NodeHandle },
    /// `node` moved from `old_parent` to `new_parent`.
    NodeReparented {
        old_parent: NodeHandle,
        new_parent: NodeHandle,
        node: NodeHandle,
    },
}

impl SceneEvent {
    /// The node whose parent link changed.
    #[must_use]
    pub fn node(&self) -> NodeHandle {
        match *self {
            Self::NodeAttached { node, .. }
            | Self::NodeDetached { node, .. }
            | Self::NodeReparented { node, .. } => node,
        }
    }
}

/// A property of a node's transform changed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyChanged {
    pub node: NodeHandle,
    /// Root of the cache that produced the change.
    pub context: NodeHandle,
    pub property: Symbol,
    pub value: Mat4,
}

impl PropertyChanged {
    /// Name of the changed property.
    #[must_use]
    pub fn property_name(&self) -> &'static str {
        interner::resolve(self.property)
    }
}

/// Emitted once per frame, after the propagation pass of that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBegin {
    pub frame_id: u64,
    pub stats: PropagationStats,
}

/// Listener registration returned by the transform system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// `None` for generic listeners.
    pub(crate) property: Option<Symbol>,
    pub(crate) connection: Connection,
}

/// Outbound change notifications: one generic signal plus one signal per
/// property name.
#[derive(Debug)]
pub(crate) struct TransformSignals {
    generic: Signal<PropertyChanged>,
    named: FxHashMap<Symbol, Signal<PropertyChanged>>,
    matrix: Symbol,
    model_to_world: Symbol,
}

impl TransformSignals {
    pub(crate) fn new() -> Self {
        Self {
            generic: Signal::new(),
            named: FxHashMap::default(),
            matrix: interner::intern(MATRIX),
            model_to_world: interner::intern(MODEL_TO_WORLD_MATRIX),
        }
    }

    pub(crate) fn connect_generic(
        &mut self,
        callback: impl FnMut(&PropertyChanged) + 'static,
    ) -> Subscription {
        Subscription {
            property: None,
            connection: self.generic.connect(callback),
        }
    }

    pub(crate) fn connect_named(
        &mut self,
        property: Symbol,
        callback: impl FnMut(&PropertyChanged) + 'static,
    ) -> Subscription {
        let connection = self.named.entry(property).or_default().connect(callback);
        Subscription {
            property: Some(property),
            connection,
        }
    }

    pub(crate) fn disconnect(&mut self, subscription: Subscription) -> bool {
        match subscription.property {
            None => self.generic.disconnect(subscription.connection),
            Some(property) => {
                let Some(signal) = self.named.get_mut(&property) else {
                    return false;
                };
                let removed = signal.disconnect(subscription.connection);
                if signal.is_empty() {
                    self.named.remove(&property);
                }
                removed
            }
        }
    }

    pub(crate) fn model_to_world(&self) -> Symbol {
        self.model_to_world
    }

    pub(crate) fn emit_local_changed(&mut self, node: NodeHandle, context: NodeHandle, value: Mat4) {
        self.emit(self.matrix, node, context, value);
    }

    pub(crate) fn emit_world_changed(&mut self, node: NodeHandle, context: NodeHandle, value: Mat4) {
        self.emit(self.model_to_world, node, context, value);
    }

    /// Fires the generic notification, then the named one.
    fn emit(&mut self, property: Symbol, node: NodeHandle, context: NodeHandle, value: Mat4) {
        let event = PropertyChanged {
            node,
            context,
            property,
            value,
        };
        self.generic.emit(&event);
        if let Some(signal) = self.named.get_mut(&property) {
            signal.emit(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn generic_fires_before_named() {
        let mut keys: SlotMap<NodeHandle, ()> = SlotMap::with_key();
        let node = keys.insert(());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signals = TransformSignals::new();

        let log = Rc::clone(&seen);
        let world = signals.model_to_world();
        signals.connect_named(world, move |e| log.borrow_mut().push(("named", e.property_name())));
        let log = Rc::clone(&seen);
        signals.connect_generic(move |e| log.borrow_mut().push(("generic", e.property_name())));

        signals.emit_world_changed(node, node, Mat4::IDENTITY);

        assert_eq!(
            *seen.borrow(),
            vec![("generic", MODEL_TO_WORLD_MATRIX), ("named", MODEL_TO_WORLD_MATRIX)]
        );
    }

    #[test]
    fn local_and_world_changes_reach_their_own_listeners() {
        let mut keys: SlotMap<NodeHandle, ()> = SlotMap::with_key();
        let node = keys.insert(());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signals = TransformSignals::new();
        let log = Rc::clone(&seen);
        signals.connect_named(interner::intern(MATRIX), move |e| {
            log.borrow_mut().push(e.property_name());
        });

        signals.emit_world_changed(node, node, Mat4::IDENTITY);
        signals.emit_local_changed(node, node, Mat4::IDENTITY);

        assert_eq!(*seen.borrow(), vec![MATRIX]);
    }

    #[test]
    fn named_signal_is_dropped_with_its_last_listener() {
        let mut signals = TransformSignals::new();
        let sub = signals.connect_named(interner::intern(MATRIX), |_| {});

        assert!(signals.disconnect(sub));
        assert!(signals.named.is_empty());
        assert!(!signals.disconnect(sub));
    }
}
