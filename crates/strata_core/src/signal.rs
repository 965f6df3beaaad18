//! Signal / Slot
//!
//! A minimal, single-threaded observer primitive. Listeners are boxed
//! closures stored in a [`SlotMap`] and addressed by a [`Connection`] key.
//!
//! Listeners run synchronously inside [`Signal::emit`], highest priority
//! first; listeners sharing a priority run in connection order.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use strata_core::Signal;
//!
//! let hits = Rc::new(Cell::new(0));
//! let mut signal: Signal<u32> = Signal::new();
//!
//! let counter = Rc::clone(&hits);
//! let connection = signal.connect(move |value| counter.set(counter.get() + *value));
//!
//! signal.emit(&3);
//! assert_eq!(hits.get(), 3);
//!
//! signal.disconnect(connection);
//! signal.emit(&3);
//! assert_eq!(hits.get(), 3);
//! ```

use std::fmt;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle of a connected listener, used to disconnect it.
    pub struct Connection;
}

struct Slot<E> {
    priority: i32,
    callback: Box<dyn FnMut(&E)>,
}

/// Priority-ordered list of listeners for events of type `E`.
pub struct Signal<E> {
    slots: SlotMap<Connection, Slot<E>>,
    /// Dispatch order: descending priority, stable for equal priorities.
    order: Vec<Connection>,
}

impl<E> Signal<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Connects a listener with the default priority (`0`).
    pub fn connect(&mut self, callback: impl FnMut(&E) + 'static) -> Connection {
        self.connect_with_priority(0, callback)
    }

    /// Connects a listener that runs before every listener of lower priority.
    pub fn connect_with_priority(
        &mut self,
        priority: i32,
        callback: impl FnMut(&E) + 'static,
    ) -> Connection {
        let connection = self.slots.insert(Slot {
            priority,
            callback: Box::new(callback),
        });

        // Insert after the last listener whose priority is >= ours.
        let position = self
            .order
            .iter()
            .position(|c| self.slots[*c].priority < priority)
            .unwrap_or(self.order.len());
        self.order.insert(position, connection);

        connection
    }

    /// Removes a listener. Returns `false` if it was already disconnected.
    pub fn disconnect(&mut self, connection: Connection) -> bool {
        if self.slots.remove(connection).is_none() {
            log::debug!("Signal::disconnect called with a stale connection");
            return false;
        }
        self.order.retain(|c| *c != connection);
        true
    }

    /// Invokes every listener with `event`.
    pub fn emit(&mut self, event: &E) {
        for connection in &self.order {
            if let Some(slot) = self.slots.get_mut(*connection) {
                (slot.callback)(event);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.slots.len())
            .finish_non_exhaustive()
    }
}
