//! In-memory surface.
//!
//! A headless node tree implementing [`Surface`] with the native form
//! semantics the engine depends on: inputs sanitise their `value` according
//! to their `type` (numbers, ranges clamped to `min`/`max`/`step`, colors
//! normalised to lowercase hex), selects only hold values one of their
//! options carries, `checked`/`disabled` are booleans and `text` is the
//! concatenated text of a subtree.
//!
//! Besides backing the tests, it is the surface the `palette` binary renders
//! onto. [`MemorySurface::edit`] and [`MemorySurface::click`] simulate user
//! interaction by mutating a node and dispatching the native event.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::surface::{NodeHandler, NodeId, Surface};
use super::value::{Value, format_number};

const VOID_TAGS: &[&str] = &["input", "hr", "br", "img"];

struct MemoryNode {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    properties: IndexMap<String, Value>,
    handlers: Vec<(String, NodeHandler)>,
}

impl MemoryNode {
    fn new(tag: &str) -> Self {
        MemoryNode {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            properties: IndexMap::new(),
            handlers: Vec::new(),
        }
    }

    fn input_type(&self) -> String {
        self.properties
            .get("type")
            .map(|t| t.to_string().to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string())
    }

    fn number_attr(&self, key: &str) -> Option<f64> {
        self.properties
            .get(key)
            .map(Value::to_number)
            .filter(|n| n.is_finite())
    }

    /// Sanitise a value written to the `value` property, the way the native
    /// element of this tag and type would.
    fn sanitize_value(&self, value: &Value, options: &[String]) -> Value {
        match self.tag.as_str() {
            "input" => match self.input_type().as_str() {
                "number" => match strict_number(value) {
                    Some(_) if matches!(value, Value::String(_)) => {
                        Value::String(value.to_string().trim().to_string())
                    }
                    Some(n) => Value::String(format_number(n)),
                    None => Value::String(String::new()),
                },
                "range" => self.sanitize_range(value),
                "color" => {
                    let text = value.to_string();
                    let valid = text.len() == 7
                        && text.starts_with('#')
                        && text[1..].chars().all(|c| c.is_ascii_hexdigit());
                    Value::String(if valid {
                        text.to_ascii_lowercase()
                    } else {
                        "#000000".to_string()
                    })
                }
                _ => Value::String(value.to_string()),
            },
            "textarea" => Value::String(value.to_string()),
            "select" => {
                let text = value.to_string();
                if options.contains(&text) {
                    Value::String(text)
                } else {
                    Value::String(String::new())
                }
            }
            _ => value.clone(),
        }
    }

    fn sanitize_range(&self, value: &Value) -> Value {
        let min = self.number_attr("min").unwrap_or(0.0);
        let max = self.number_attr("max").unwrap_or(100.0).max(min);
        let step = self
            .number_attr("step")
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        let n = strict_number(value)
            .unwrap_or(min + (max - min) / 2.0)
            .clamp(min, max);
        let mut snapped = min + ((n - min) / step).round() * step;
        if snapped > max {
            snapped -= step;
        }
        let snapped = (snapped * 1e10).round() / 1e10;
        Value::String(format_number(snapped))
    }

    fn is_range_input(&self) -> bool {
        self.tag == "input" && self.input_type() == "range"
    }
}

/// Parse a value the way number-typed inputs accept it: the whole string
/// must be a finite float.
fn strict_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// Headless [`Surface`] implementation.
pub struct MemorySurface {
    nodes: RefCell<HashMap<NodeId, MemoryNode>>,
    next_id: Cell<u64>,
    body: NodeId,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySurface")
            .field("nodes", &self.nodes.borrow().len())
            .field("body", &self.body)
            .finish()
    }
}

impl MemorySurface {
    /// Create a surface containing only an empty `body` node.
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(body, MemoryNode::new("body"));
        MemorySurface {
            nodes: RefCell::new(nodes),
            next_id: Cell::new(1),
            body,
        }
    }

    /// Call every handler subscribed to `event` on `node`.
    ///
    /// Returns whether any handler ran.
    pub fn dispatch(&self, node: NodeId, event: &str) -> bool {
        let handlers: Vec<NodeHandler> = match self.nodes.borrow().get(&node) {
            Some(n) => n
                .handlers
                .iter()
                .filter(|(e, _)| e == event)
                .map(|(_, h)| h.clone())
                .collect(),
            None => return false,
        };
        for handler in &handlers {
            handler();
        }
        !handlers.is_empty()
    }

    /// Simulate a user edit: write a native property, then fire `change`.
    pub fn edit(&self, node: NodeId, key: &str, value: impl Into<Value>) -> bool {
        self.set_property(node, key, value.into());
        self.dispatch(node, "change")
    }

    /// Simulate a user click.
    pub fn click(&self, node: NodeId) -> bool {
        self.dispatch(node, "click")
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(&node)
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(&node).map(|n| n.tag.clone())
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.classes.clone())
            .unwrap_or_default()
    }

    /// Whether `node` is reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.parent_node(id);
        }
        false
    }

    /// Every node carrying `class` below (and including) `root`, in
    /// document order.
    pub fn find_all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.get(&id) {
                if node.classes.iter().any(|c| c == class) {
                    found.push(id);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        found
    }

    /// Render a subtree as indented HTML-like markup.
    pub fn render(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        render_into(&nodes, node, 0, &mut out);
        out
    }

    fn alloc(&self, node: MemoryNode) -> NodeId {
        let id = NodeId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.nodes.borrow_mut().insert(id, node);
        id
    }

    fn detach(nodes: &mut HashMap<NodeId, MemoryNode>, node: NodeId) {
        let parent = nodes.get_mut(&node).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
    }

    fn is_ancestor(nodes: &HashMap<NodeId, MemoryNode>, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn option_values(nodes: &HashMap<NodeId, MemoryNode>, select: NodeId) -> Vec<String> {
        let Some(node) = nodes.get(&select) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter_map(|c| nodes.get(c))
            .filter(|c| c.tag == "option")
            .map(|option| {
                option
                    .properties
                    .get("value")
                    .or_else(|| option.properties.get("text"))
                    .map(Value::to_string)
                    .unwrap_or_default()
            })
            .collect()
    }

    fn text_content(nodes: &HashMap<NodeId, MemoryNode>, node: NodeId) -> String {
        let Some(n) = nodes.get(&node) else {
            return String::new();
        };
        if let Some(text) = n.properties.get("text") {
            return text.to_string();
        }
        n.children
            .iter()
            .map(|c| Self::text_content(nodes, *c))
            .collect()
    }
}

impl Surface for MemorySurface {
    fn create_node(&self, tag: &str) -> NodeId {
        let id = self.alloc(MemoryNode::new(tag));
        log::trace!("created <{}> {}", tag, id);
        id
    }

    fn get_property(&self, node: NodeId, key: &str) -> Value {
        let nodes = self.nodes.borrow();
        let Some(n) = nodes.get(&node) else {
            return Value::Null;
        };
        match key {
            "checked" | "disabled" | "selected" => {
                Value::Bool(n.properties.get(key).is_some_and(Value::is_truthy))
            }
            "text" => Value::String(Self::text_content(&nodes, node)),
            "value" if n.tag == "select" => {
                let options = Self::option_values(&nodes, node);
                match n.properties.get("value") {
                    Some(v) => v.clone(),
                    None => Value::String(options.first().cloned().unwrap_or_default()),
                }
            }
            "value" if n.tag == "input" || n.tag == "textarea" => match n.properties.get("value") {
                Some(v) => v.clone(),
                None => n.sanitize_value(&Value::Null, &[]),
            },
            _ => n.properties.get(key).cloned().unwrap_or(Value::Null),
        }
    }

    fn set_property(&self, node: NodeId, key: &str, value: Value) {
        if value.is_null() {
            return;
        }
        let mut nodes = self.nodes.borrow_mut();
        let options = if key == "value" {
            Self::option_values(&nodes, node)
        } else {
            Vec::new()
        };
        let Some(n) = nodes.get_mut(&node) else {
            return;
        };
        match key {
            "class" => {
                n.classes = value
                    .to_string()
                    .split_whitespace()
                    .map(String::from)
                    .collect();
            }
            "checked" | "disabled" | "selected" => {
                n.properties
                    .insert(key.to_string(), Value::Bool(value.is_truthy()));
            }
            "text" | "html" => {
                n.properties
                    .insert(key.to_string(), Value::String(value.to_string()));
            }
            "value" => {
                let sanitized = n.sanitize_value(&value, &options);
                n.properties.insert(key.to_string(), sanitized);
            }
            "min" | "max" | "step" => {
                n.properties.insert(key.to_string(), value);
                if n.is_range_input() {
                    if let Some(current) = n.properties.get("value").cloned() {
                        let sanitized = n.sanitize_range(&current);
                        n.properties.insert("value".to_string(), sanitized);
                    }
                }
            }
            _ => {
                n.properties.insert(key.to_string(), value);
            }
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&self, node: NodeId, class: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.classes.retain(|c| c != class);
        }
    }

    fn remove_node(&self, node: NodeId) {
        Self::detach(&mut self.nodes.borrow_mut(), node);
    }

    fn remove_children(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let children = match nodes.get_mut(&node) {
            Some(n) => {
                // A select loses its selection together with its options.
                if n.tag == "select" {
                    n.properties.shift_remove("value");
                }
                std::mem::take(&mut n.children)
            }
            None => return,
        };
        for child in children {
            if let Some(c) = nodes.get_mut(&child) {
                c.parent = None;
            }
        }
    }

    fn append_child(&self, parent: NodeId, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes.contains_key(&parent)
            || !nodes.contains_key(&node)
            || Self::is_ancestor(&nodes, node, parent)
        {
            return;
        }
        Self::detach(&mut nodes, node);
        if let Some(n) = nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.push(node);
        }
    }

    fn insert_before(&self, reference: NodeId, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get(&reference).and_then(|r| r.parent) else {
            return;
        };
        if !nodes.contains_key(&node) || Self::is_ancestor(&nodes, node, parent) {
            return;
        }
        Self::detach(&mut nodes, node);
        if let Some(n) = nodes.get_mut(&node) {
            n.parent = Some(parent);
        }
        if let Some(p) = nodes.get_mut(&parent) {
            let index = p
                .children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(p.children.len());
            p.children.insert(index, node);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(&node).and_then(|n| n.parent)
    }

    fn subscribe(&self, node: NodeId, event: &str, handler: NodeHandler) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.handlers.push((event.to_string(), handler));
        }
    }

    fn find_by_class(&self, class: &str) -> Option<NodeId> {
        self.find_all_by_class(self.body, class).into_iter().next()
    }

    fn body(&self) -> NodeId {
        self.body
    }
}

fn render_into(nodes: &HashMap<NodeId, MemoryNode>, id: NodeId, depth: usize, out: &mut String) {
    let Some(node) = nodes.get(&id) else {
        return;
    };
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}<{}", node.tag);
    if !node.classes.is_empty() {
        let _ = write!(out, " class=\"{}\"", node.classes.join(" "));
    }
    for (key, value) in &node.properties {
        if key == "text" || key == "html" {
            continue;
        }
        match value {
            Value::Bool(true) => {
                let _ = write!(out, " {key}");
            }
            Value::Bool(false) => {}
            other => {
                let _ = write!(out, " {key}=\"{other}\"");
            }
        }
    }
    if VOID_TAGS.contains(&node.tag.as_str()) {
        out.push_str("/>\n");
        return;
    }
    out.push('>');
    let content = node
        .properties
        .get("text")
        .or_else(|| node.properties.get("html"))
        .map(Value::to_string)
        .unwrap_or_default();
    if node.children.is_empty() {
        let _ = writeln!(out, "{content}</{}>", node.tag);
        return;
    }
    out.push('\n');
    if !content.is_empty() {
        let _ = writeln!(out, "{indent}  {content}");
    }
    for child in &node.children {
        render_into(nodes, *child, depth + 1, out);
    }
    let _ = writeln!(out, "{indent}</{}>", node.tag);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn input(surface: &MemorySurface, kind: &str) -> NodeId {
        surface.create_with("input", &[("type", Value::from(kind))])
    }

    #[test]
    fn test_number_input_sanitizes() {
        let surface = MemorySurface::new();
        let node = input(&surface, "number");

        surface.set_property(node, "value", Value::from(5));
        assert_eq!(surface.get_property(node, "value"), Value::from("5"));

        surface.set_property(node, "value", Value::from("abc"));
        assert_eq!(surface.get_property(node, "value"), Value::from(""));

        surface.set_property(node, "value", Value::from(" 2.50 "));
        assert_eq!(surface.get_property(node, "value"), Value::from("2.50"));
    }

    #[test]
    fn test_range_input_clamps_and_snaps() {
        let surface = MemorySurface::new();
        let node = input(&surface, "range");
        assert_eq!(surface.get_property(node, "value"), Value::from("50"));

        surface.set_property(node, "min", Value::from(10));
        surface.set_property(node, "max", Value::from(20));
        surface.set_property(node, "value", Value::from(35));
        assert_eq!(surface.get_property(node, "value"), Value::from("20"));

        surface.set_property(node, "step", Value::from(0.5));
        surface.set_property(node, "value", Value::from(12.3));
        assert_eq!(surface.get_property(node, "value"), Value::from("12.5"));

        surface.set_property(node, "max", Value::from(11));
        assert_eq!(surface.get_property(node, "value"), Value::from("11"));
    }

    #[test]
    fn test_color_input_normalizes() {
        let surface = MemorySurface::new();
        let node = input(&surface, "color");
        assert_eq!(surface.get_property(node, "value"), Value::from("#000000"));

        surface.set_property(node, "value", Value::from("#FF8800"));
        assert_eq!(surface.get_property(node, "value"), Value::from("#ff8800"));

        surface.set_property(node, "value", Value::from("rgb(1,2,3)"));
        assert_eq!(surface.get_property(node, "value"), Value::from("#000000"));
    }

    #[test]
    fn test_select_value_matches_options() {
        let surface = MemorySurface::new();
        let select = surface.create_node("select");
        assert_eq!(surface.get_property(select, "value"), Value::from(""));

        for option in ["a", "b"] {
            surface.append_new(
                select,
                "option",
                &[("value", Value::from(option)), ("text", Value::from(option))],
            );
        }
        assert_eq!(surface.get_property(select, "value"), Value::from("a"));

        surface.set_property(select, "value", Value::from("b"));
        assert_eq!(surface.get_property(select, "value"), Value::from("b"));

        surface.set_property(select, "value", Value::from("z"));
        assert_eq!(surface.get_property(select, "value"), Value::from(""));

        surface.remove_children(select);
        assert!(surface.children(select).is_empty());
        assert_eq!(surface.get_property(select, "value"), Value::from(""));
    }

    #[test]
    fn test_boolean_properties() {
        let surface = MemorySurface::new();
        let node = input(&surface, "checkbox");
        assert_eq!(surface.get_property(node, "checked"), Value::Bool(false));

        surface.set_property(node, "checked", Value::from(1));
        assert_eq!(surface.get_property(node, "checked"), Value::Bool(true));

        surface.set_property(node, "disabled", Value::from(false));
        assert_eq!(surface.get_property(node, "disabled"), Value::Bool(false));
    }

    #[test]
    fn test_null_writes_are_ignored() {
        let surface = MemorySurface::new();
        let node = surface.create_with("span", &[("text", Value::from("hi"))]);
        surface.set_property(node, "text", Value::Null);
        assert_eq!(surface.get_property(node, "text"), Value::from("hi"));

        surface.set_property(NodeId(999), "text", Value::from("x"));
        assert_eq!(surface.get_property(NodeId(999), "text"), Value::Null);
    }

    #[test]
    fn test_tree_operations() {
        let surface = MemorySurface::new();
        let body = surface.body();
        let table = surface.append_new(body, "table", &[]);
        let tbody = surface.append_new(table, "tbody", &[]);
        let caption = surface.create_node("caption");
        surface.insert_before(tbody, caption);

        assert_eq!(surface.children(table), vec![caption, tbody]);
        assert_eq!(surface.parent_node(caption), Some(table));
        assert!(surface.is_attached(tbody));

        surface.remove_node(table);
        assert!(!surface.is_attached(tbody));
        assert!(surface.children(body).is_empty());

        // Appending a node into its own subtree is refused.
        surface.append_child(tbody, table);
        assert_eq!(surface.parent_node(table), None);
    }

    #[test]
    fn test_classes_and_lookup() {
        let surface = MemorySurface::new();
        let a = surface.append_new(surface.body(), "div", &[("class", Value::from("x y"))]);
        let b = surface.append_new(a, "div", &[("class", Value::from("y"))]);

        assert!(surface.has_class(a, "x"));
        assert_eq!(surface.find_by_class("y"), Some(a));
        assert_eq!(surface.find_all_by_class(surface.body(), "y"), vec![a, b]);

        surface.toggle_class(b, "hidden", None);
        assert!(surface.has_class(b, "hidden"));
        surface.toggle_class(b, "hidden", Some(true));
        assert!(surface.has_class(b, "hidden"));
        surface.toggle_class(b, "hidden", None);
        assert!(!surface.has_class(b, "hidden"));
    }

    #[test]
    fn test_text_content_concatenates() {
        let surface = MemorySurface::new();
        let label = surface.create_node("label");
        surface.append_new(label, "span", &[("text", Value::from("a"))]);
        surface.append_new(label, "span", &[("text", Value::from(1))]);
        assert_eq!(surface.get_property(label, "text"), Value::from("a1"));
    }

    #[test]
    fn test_dispatch_and_edit() {
        let surface = Rc::new(MemorySurface::new());
        let node = input(&surface, "text");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (s, r) = (surface.clone(), seen.clone());
        surface.subscribe(
            node,
            "change",
            Rc::new(move || r.borrow_mut().push(s.get_property(node, "value"))),
        );

        assert!(!surface.click(node));
        assert!(surface.edit(node, "value", "typed"));
        assert_eq!(*seen.borrow(), vec![Value::from("typed")]);
    }

    #[test]
    fn test_render() {
        let surface = MemorySurface::new();
        let div = surface.append_new(surface.body(), "div", &[("class", Value::from("pane"))]);
        surface.append_new(div, "input", &[("type", Value::from("checkbox")), ("checked", Value::from(true))]);
        surface.append_new(div, "span", &[("text", Value::from("hello"))]);

        let html = surface.render(div);
        assert_eq!(
            html,
            "<div class=\"pane\">\n  <input type=\"checkbox\" checked/>\n  <span>hello</span>\n</div>\n"
        );
    }
}
