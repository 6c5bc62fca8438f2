//! Event hub shared by components and palettes.
//!
//! Each entity owns an [`EventHub`] and exposes `on` / `off` / `emit` on top
//! of it, plus "handler properties" (`on_change`, `on_click`): assigning a
//! handler to such a property detaches whatever handler it held before.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A shared event handler receiving the event payload.
pub type Handler<E> = Rc<dyn Fn(&E)>;

/// Identifies one attached listener, used to detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E> {
    id: ListenerId,
    handler: Handler<E>,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Listener {
            id: self.id,
            handler: self.handler.clone(),
        }
    }
}

/// Named publish/subscribe channel set, generic over the payload type.
pub struct EventHub<E> {
    listeners: RefCell<IndexMap<String, Vec<Listener<E>>>>,
    properties: RefCell<HashMap<String, Listener<E>>>,
    next_id: Cell<u64>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_map()
            .entries(listeners.iter().map(|(event, list)| (event, list.len())))
            .finish()
    }
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        EventHub {
            listeners: RefCell::new(IndexMap::new()),
            properties: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Attach a handler to `event`.
    pub fn on(&self, event: &str, handler: impl Fn(&E) + 'static) -> ListenerId {
        self.on_handler(event, Rc::new(handler))
    }

    /// Attach a shared handler. Attaching the same `Rc` twice keeps a single
    /// registration and returns its original id.
    pub fn on_handler(&self, event: &str, handler: Handler<E>) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let list = listeners.entry(event.to_string()).or_default();
        if let Some(existing) = list.iter().find(|l| Rc::ptr_eq(&l.handler, &handler)) {
            return existing.id;
        }
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        list.push(Listener { id, handler });
        id
    }

    /// Detach one listener, or every listener of `event` when `id` is `None`.
    ///
    /// Returns whether anything was detached.
    pub fn off(&self, event: &str, id: Option<ListenerId>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let removed = match id {
            None => true,
            Some(id) => match list.iter().position(|l| l.id == id) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            },
        };
        if removed && (id.is_none() || list.is_empty()) {
            listeners.shift_remove(event);
        }
        removed
    }

    /// Call every handler of `event` in attachment order.
    ///
    /// Returns `false` when nothing is listening. Handlers may attach or
    /// detach listeners while running; the set called is the one present
    /// when the emit started.
    pub fn emit(&self, event: &str, payload: &E) -> bool {
        let snapshot = match self.listeners.borrow().get(event) {
            Some(list) => list.clone(),
            None => return false,
        };
        for listener in &snapshot {
            (listener.handler)(payload);
        }
        true
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    /// The handler currently held by a handler property such as `onChange`.
    pub fn handler(&self, property: &str) -> Option<Handler<E>> {
        self.properties
            .borrow()
            .get(property)
            .map(|l| l.handler.clone())
    }

    /// Assign a handler property. The previous handler, if any, is detached
    /// from its event before the new one is attached.
    pub fn set_handler(&self, property: &str, handler: Option<Handler<E>>) {
        let event = property_event(property);
        let previous = self.properties.borrow_mut().remove(property);
        if let Some(previous) = previous {
            self.off(&event, Some(previous.id));
        }
        if let Some(handler) = handler {
            let id = self.on_handler(&event, handler.clone());
            self.properties
                .borrow_mut()
                .insert(property.to_string(), Listener { id, handler });
        }
    }
}

/// `onChange` -> `change`
fn property_event(property: &str) -> String {
    property
        .strip_prefix("on")
        .unwrap_or(property)
        .to_lowercase()
}
