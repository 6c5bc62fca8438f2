//! Rendering surface abstraction.
//!
//! Components never touch a rendering primitive directly; every node they
//! create or mutate goes through a [`Surface`]. Implementations are expected
//! to treat operations on unknown nodes as no-ops.
//!
//! # Node properties
//!
//! Properties are loosely typed [`Value`]s. The keys the engine relies on:
//!
//! - `value`, `checked`, `disabled`: native form state
//! - `text`, `html`: text content and raw markup
//! - `type`, `id`, `for`, `colspan`, `data-id`, `min`, `max`, `step`, ...:
//!   plain attributes

use std::fmt;
use std::rc::Rc;

use super::value::Value;

/// Opaque handle to a node owned by a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback attached to a native node event.
pub type NodeHandler = Rc<dyn Fn()>;

/// The capability set the palette engine needs from a rendering backend.
///
/// All methods take `&self`: a surface is shared between every component of
/// every palette rendered onto it, and handlers subscribed to node events
/// may call back into the surface while an event is being dispatched.
pub trait Surface {
    /// Create a detached node with the given tag.
    fn create_node(&self, tag: &str) -> NodeId;

    /// Read a property; `Value::Null` when unset or the node is unknown.
    fn get_property(&self, node: NodeId, key: &str) -> Value;

    /// Write a property. Writing `Value::Null` is a no-op.
    fn set_property(&self, node: NodeId, key: &str, value: Value);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&self, node: NodeId, class: &str);

    fn remove_class(&self, node: NodeId, class: &str);

    /// Toggle a class. With `state` the class is forced on or off.
    fn toggle_class(&self, node: NodeId, class: &str, state: Option<bool>) {
        let add = state.unwrap_or_else(|| !self.has_class(node, class));
        if add {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Detach a node from its parent.
    fn remove_node(&self, node: NodeId);

    /// Detach every child of a node.
    fn remove_children(&self, node: NodeId);

    fn append_child(&self, parent: NodeId, node: NodeId);

    /// Insert `node` into the parent of `reference`, right before it.
    fn insert_before(&self, reference: NodeId, node: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    /// Subscribe to a native event (`change`, `click`) on a node.
    fn subscribe(&self, node: NodeId, event: &str, handler: NodeHandler);

    /// First node carrying `class`, in document order.
    fn find_by_class(&self, class: &str) -> Option<NodeId>;

    /// The top-level node new mount points are appended to.
    fn body(&self) -> NodeId;

    /// Create a node and apply attributes in order.
    fn create_with(&self, tag: &str, attributes: &[(&str, Value)]) -> NodeId {
        let node = self.create_node(tag);
        for (key, value) in attributes {
            self.set_property(node, key, value.clone());
        }
        node
    }

    /// Create a node with attributes and append it to `parent`.
    fn append_new(&self, parent: NodeId, tag: &str, attributes: &[(&str, Value)]) -> NodeId {
        let node = self.create_with(tag, attributes);
        self.append_child(parent, node);
        node
    }
}
