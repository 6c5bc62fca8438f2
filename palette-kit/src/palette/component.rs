//! Palette Components
//!
//! A [`Component`] is either a container laying out child components or a
//! leaf wrapping one native element. Leaves own the value pipeline:
//!
//! ```text
//! set_value(v) ──► kind set-transform ──► element[value key] ──► read back
//!                                                                  │
//!           change event ◄── store if different ◄── float parse ◄──┘
//! ```
//!
//! Containers own the enabled cascade: disabling a container disables every
//! descendant while each one remembers its own state, so re-enabling the
//! container restores exactly what was enabled before.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::description::Description;
use super::emitter::{EventHub, Handler, ListenerId};
use super::instance::{Palette, PaletteEvent, PaletteInner};
use super::layout::{self, Layout, Pane};
use super::registry::{Kind, MetaDescriptor, Tag, TypeRegistry};
use super::surface::{NodeId, Surface};
use super::value::Value;
use super::values::{BoundSlot, Values};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by every component of one palette.
pub(crate) struct Context {
    pub(crate) surface: Rc<dyn Surface>,
    pub(crate) types: Rc<TypeRegistry>,
    pub(crate) palette: Weak<PaletteInner>,
}

/// Payload of component events (`change`, `click`).
#[derive(Clone)]
pub struct ComponentEvent {
    pub component: Component,
    /// New value for `change`, `Null` for `click`
    pub value: Value,
}

impl fmt::Debug for ComponentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEvent")
            .field("component", &self.component.name())
            .field("value", &self.value)
            .finish()
    }
}

struct Leaf {
    kind: Kind,
    meta: MetaDescriptor,
    element: NodeId,
    value: RefCell<Value>,
    default_value: RefCell<Value>,
    options: RefCell<Vec<Value>>,
}

enum Body {
    Container(Pane),
    Leaf(Leaf),
}

pub(crate) struct ComponentInner {
    id: u64,
    name: String,
    context: Rc<Context>,
    parent: Option<Weak<ComponentInner>>,
    /// Row the component's cells live in, or the row a columns container
    /// shares with its children.
    row: Option<NodeId>,
    cell: Option<NodeId>,
    label_cell: Option<NodeId>,
    class_name: String,
    body: Body,
    emitting: Cell<bool>,
    enabled: Cell<bool>,
    previous_enabled: Cell<Option<bool>>,
    visible: Cell<bool>,
    title: RefCell<Option<String>>,
    label: RefCell<Option<String>>,
    suffix: RefCell<Option<String>>,
    title_node: Cell<Option<NodeId>>,
    label_node: Cell<Option<NodeId>>,
    suffix_node: Cell<Option<NodeId>>,
    events: EventHub<ComponentEvent>,
}

/// Construction arguments for one component.
pub(crate) struct Build<'a> {
    pub(crate) context: &'a Rc<Context>,
    pub(crate) parent: Option<Weak<ComponentInner>>,
    pub(crate) name: Option<&'a str>,
    pub(crate) description: &'a Description,
    pub(crate) values: &'a Values,
    /// Row inherited from the parent container
    pub(crate) row: Option<NodeId>,
    /// The parent's running cell counter
    pub(crate) parent_cells: Option<&'a Cell<usize>>,
    /// Skip kind inference (the palette root)
    pub(crate) container: bool,
}

/// Handle to a node of a palette's component tree.
///
/// Cloning yields another handle to the same component.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl Component {
    pub(crate) fn build(args: Build<'_>) -> Component {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let name = args
            .name
            .map_or_else(|| format!("component-{id}"), String::from);
        let description = args.description;
        let initial = args
            .values
            .get(&name)
            .or_else(|| description.get("value").cloned())
            .unwrap_or_default();
        let types = &args.context.types;
        let kind = if args.container {
            None
        } else {
            types.resolve(
                description.get("type").and_then(Value::as_str),
                &initial,
                description.contains("options"),
                description.click_handler().is_some(),
            )
        };
        let surface = args.context.surface.clone();

        let inner = Rc::new_cyclic(|this: &Weak<ComponentInner>| {
            let (body, content, class_name, row) = match kind {
                None => {
                    let layout = Layout::of(description);
                    let pane = layout::build_pane(
                        args.context,
                        this,
                        layout,
                        description,
                        args.values,
                        args.row,
                        args.parent_cells,
                    );
                    // A container only gets its own cell when its table sits
                    // inside a parent row.
                    let content = args.row.and(pane.table);
                    let row = pane.row;
                    (Body::Container(pane), content, format!("layout-{layout}"), row)
                }
                Some(kind) => {
                    if !types.contains(&kind) {
                        log::warn!("No type `{}` registered for `{}`, using a plain input", kind, name);
                    }
                    let meta = types.lookup(&kind);
                    let element = create_element(surface.as_ref(), this, &meta, &name, description);
                    let class_name = format!("type-{kind}");
                    let leaf = Leaf {
                        kind,
                        meta,
                        element,
                        value: RefCell::new(Value::Null),
                        default_value: RefCell::new(Value::Null),
                        options: RefCell::new(Vec::new()),
                    };
                    (Body::Leaf(leaf), Some(element), class_name, args.row)
                }
            };

            let (label_cell, cell) = match (args.row, content) {
                (Some(row), Some(content)) => {
                    let (label_cell, cell) =
                        layout::append_cells(surface.as_ref(), row, &name, &class_name, content);
                    if let Some(counter) = args.parent_cells {
                        counter.set(counter.get() + 2);
                    }
                    (Some(label_cell), Some(cell))
                }
                _ => (None, None),
            };

            ComponentInner {
                id,
                name,
                context: args.context.clone(),
                parent: args.parent.clone(),
                row,
                cell,
                label_cell,
                class_name,
                body,
                emitting: Cell::new(false),
                enabled: Cell::new(true),
                previous_enabled: Cell::new(None),
                visible: Cell::new(true),
                title: RefCell::new(None),
                label: RefCell::new(None),
                suffix: RefCell::new(None),
                title_node: Cell::new(None),
                label_node: Cell::new(None),
                suffix_node: Cell::new(None),
                events: EventHub::new(),
            }
        });

        let component = Component(inner);
        component.initialize(description, initial);
        component
    }

    /// Attach the palette forwarding, apply the description fields and the
    /// initial value, then start emitting.
    fn initialize(&self, description: &Description, initial: Value) {
        self.on("change", |event: &ComponentEvent| {
            let component = &event.component;
            if !component.0.emitting.get() {
                return;
            }
            if let Some(palette) = component.palette() {
                palette.emit(
                    "change",
                    &PaletteEvent {
                        component: component.clone(),
                        name: component.0.name.clone(),
                        value: event.value.clone(),
                    },
                );
            }
        });

        self.0.emitting.set(false);
        let (_, fields) = description.classify();
        for (key, value) in fields {
            if !matches!(key, "name" | "value" | "type" | "layout" | "columns") {
                self.apply_field(key, value);
            }
        }
        if let Some(handler) = description.click_handler() {
            self.set_on_click(Some(handler.clone()));
        }
        if let Some(handler) = description.change_handler() {
            self.set_on_change(Some(handler.clone()));
        }

        if let Body::Leaf(leaf) = &self.0.body {
            *leaf.default_value.borrow_mut() = initial.clone();
        }
        self.set_value(initial);
        self.0.emitting.set(true);
    }

    fn apply_field(&self, key: &str, value: &Value) {
        match key {
            "label" => self.set_label(text_of(value).as_deref()),
            "suffix" => self.set_suffix(text_of(value).as_deref()),
            "title" => self.set_title(text_of(value).as_deref()),
            "min" => self.set_min(value.clone()),
            "max" => self.set_max(value.clone()),
            "step" => self.set_step(value.clone()),
            "range" => match value.as_list() {
                Some([min, max, ..]) => self.set_range(min.clone(), max.clone()),
                _ => log::debug!("Ignoring malformed range on `{}`", self.0.name),
            },
            "visible" => self.set_visible(value.is_truthy()),
            "enabled" => self.set_enabled(value.is_truthy()),
            "rows" => self.set_rows(value.clone()),
            "readonly" => self.set_readonly(value.is_truthy()),
            "placeholder" => self.set_placeholder(text_of(value).as_deref()),
            "text" => self.set_text(value.clone()),
            "options" => self.set_options(options_of(value)),
            other => log::trace!("Ignoring unknown field `{}` on `{}`", other, self.0.name),
        }
    }

    // ============================================================================
    // Identity and structure
    // ============================================================================

    /// Process-wide unique id
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Leaf kind; `None` for containers.
    pub fn kind(&self) -> Option<&Kind> {
        match &self.0.body {
            Body::Leaf(leaf) => Some(&leaf.kind),
            Body::Container(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.0.body, Body::Container(_))
    }

    pub fn layout(&self) -> Option<Layout> {
        match &self.0.body {
            Body::Container(pane) => Some(pane.layout),
            Body::Leaf(_) => None,
        }
    }

    pub fn palette(&self) -> Option<Palette> {
        self.0.context.palette.upgrade().map(Palette::from_inner)
    }

    pub fn parent(&self) -> Option<Component> {
        self.0
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Component)
    }

    /// Child components in declaration order; empty for leaves.
    pub fn children(&self) -> Vec<Component> {
        match &self.0.body {
            Body::Container(pane) => pane.children.values().cloned().collect(),
            Body::Leaf(_) => Vec::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<Component> {
        match &self.0.body {
            Body::Container(pane) => pane.children.get(name).cloned(),
            Body::Leaf(_) => None,
        }
    }

    pub(crate) fn child_map(&self) -> IndexMap<String, Component> {
        match &self.0.body {
            Body::Container(pane) => pane.children.clone(),
            Body::Leaf(_) => IndexMap::new(),
        }
    }

    /// Widest row of a container, in cells.
    pub fn width(&self) -> usize {
        match &self.0.body {
            Body::Container(pane) => pane.width,
            Body::Leaf(_) => 0,
        }
    }

    // ============================================================================
    // Surface nodes
    // ============================================================================

    pub fn surface(&self) -> &Rc<dyn Surface> {
        &self.0.context.surface
    }

    /// The native element of a leaf.
    pub fn element(&self) -> Option<NodeId> {
        match &self.0.body {
            Body::Leaf(leaf) => Some(leaf.element),
            Body::Container(_) => None,
        }
    }

    /// The table of a container, unless it shares its parent's row.
    pub fn table(&self) -> Option<NodeId> {
        match &self.0.body {
            Body::Container(pane) => pane.table,
            Body::Leaf(_) => None,
        }
    }

    pub fn row(&self) -> Option<NodeId> {
        self.0.row
    }

    /// The content cell, for components rendering their own cell.
    pub fn cell(&self) -> Option<NodeId> {
        self.0.cell
    }

    pub fn label_cell(&self) -> Option<NodeId> {
        self.0.label_cell
    }

    pub(crate) fn class_name(&self) -> &str {
        &self.0.class_name
    }

    fn attribute(&self, key: &str) -> Value {
        match self.element() {
            Some(element) => self.surface().get_property(element, key),
            None => Value::Null,
        }
    }

    fn set_attribute(&self, key: &str, value: Value) {
        if let Some(element) = self.element() {
            self.surface().set_property(element, key, value);
        }
    }

    // ============================================================================
    // Value
    // ============================================================================

    /// Current value, through the kind's get-transform. `Null` for
    /// containers.
    pub fn value(&self) -> Value {
        let Body::Leaf(leaf) = &self.0.body else {
            return Value::Null;
        };
        let raw = leaf.value.borrow().clone();
        match leaf.meta.get_value {
            Some(get_value) => get_value(self, raw),
            None => raw,
        }
    }

    /// Assign a value through the pipeline. No-op on containers.
    ///
    /// Fires `change` when the normalised value differs from the stored one
    /// and the component is done constructing. `Null` is neither written to
    /// the element nor read back: the component stores `Null` while the
    /// element keeps its previous content.
    pub fn set_value(&self, value: impl Into<Value>) {
        let Body::Leaf(leaf) = &self.0.body else {
            return;
        };
        let value = value.into();
        let surface = self.surface();
        let transformed = match leaf.meta.set_value {
            Some(set_value) => set_value(self, value),
            None => Some(value),
        };
        let mut value = match (transformed, leaf.meta.value_key) {
            (Some(value), _) if value.is_null() => value,
            (Some(value), Some(key)) => {
                surface.set_property(leaf.element, key, value);
                surface.get_property(leaf.element, key)
            }
            (Some(value), None) => value,
            // The transform wrote the element itself.
            (None, Some(key)) => surface.get_property(leaf.element, key),
            (None, None) => Value::Null,
        };
        if leaf.meta.number {
            value = Value::Number(value.to_number());
        }

        if *leaf.value.borrow() == value {
            return;
        }
        log::trace!("{} = {:?}", self.0.name, value);
        *leaf.value.borrow_mut() = value;
        if self.0.emitting.get() {
            self.emit("change", self.value());
        }
    }

    /// Alias of [`Component::value`], reads better for buttons.
    pub fn text(&self) -> Value {
        self.value()
    }

    pub fn set_text(&self, text: impl Into<Value>) {
        self.set_value(text);
    }

    pub fn default_value(&self) -> Value {
        match &self.0.body {
            Body::Leaf(leaf) => leaf.default_value.borrow().clone(),
            Body::Container(_) => Value::Null,
        }
    }

    /// Restore default values, recursively for containers.
    pub fn reset(&self) {
        match &self.0.body {
            Body::Container(pane) => {
                for child in pane.children.values() {
                    child.reset();
                }
            }
            Body::Leaf(leaf) => {
                let default = leaf.default_value.borrow().clone();
                self.set_value(default);
            }
        }
    }

    pub fn options(&self) -> Vec<Value> {
        match &self.0.body {
            Body::Leaf(leaf) => leaf.options.borrow().clone(),
            Body::Container(_) => Vec::new(),
        }
    }

    /// Replace the options and let the kind re-render them. The current
    /// value is re-applied so the selection follows it.
    pub fn set_options(&self, options: Vec<Value>) {
        let Body::Leaf(leaf) = &self.0.body else {
            return;
        };
        *leaf.options.borrow_mut() = options;
        if let Some(set_options) = leaf.meta.set_options {
            set_options(self);
            let current = leaf.value.borrow().clone();
            self.set_value(current);
        }
    }

    // ============================================================================
    // Enabled / visible
    // ============================================================================

    pub fn enabled(&self) -> bool {
        self.0.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.apply_enabled(enabled, false);
    }

    fn apply_enabled(&self, enabled: bool, from_parent: bool) {
        let mut target = enabled;
        if from_parent {
            let previous = self
                .0
                .previous_enabled
                .get()
                .unwrap_or(self.0.enabled.get());
            self.0
                .previous_enabled
                .set(if enabled { None } else { Some(previous) });
            target = enabled && previous;
        }
        if target == self.0.enabled.get() {
            return;
        }

        let surface = self.surface();
        if let Some(node) = self.0.cell.or(self.0.row) {
            surface.toggle_class(node, "disabled", Some(!target));
        }
        self.0.enabled.set(target);
        match &self.0.body {
            Body::Container(pane) => {
                for child in pane.children.values() {
                    child.apply_enabled(target, true);
                }
            }
            Body::Leaf(leaf) => {
                surface.set_property(leaf.element, "disabled", Value::Bool(!target));
                if let Some(set_enabled) = leaf.meta.set_enabled {
                    set_enabled(self, target);
                }
            }
        }
    }

    pub fn visible(&self) -> bool {
        self.0.visible.get()
    }

    /// Show or hide the component's cells (or its row when it has no cell of
    /// its own).
    pub fn set_visible(&self, visible: bool) {
        let surface = self.surface();
        if let Some(node) = self.0.cell.or(self.0.row) {
            surface.toggle_class(node, "hidden", Some(!visible));
        }
        if let Some(label_cell) = self.0.label_cell {
            surface.toggle_class(label_cell, "hidden", Some(!visible));
        }
        self.0.visible.set(visible);
        if let Body::Leaf(leaf) = &self.0.body {
            if let Some(set_visible) = leaf.meta.set_visible {
                set_visible(self, visible);
            }
        }
    }

    // ============================================================================
    // Labels
    // ============================================================================

    pub fn title(&self) -> Option<String> {
        self.0.title.borrow().clone()
    }

    /// Set the caption of a container's table. Clearing the title removes
    /// the caption.
    pub fn set_title(&self, title: Option<&str>) {
        *self.0.title.borrow_mut() = title.map(String::from);
        let Body::Container(pane) = &self.0.body else {
            return;
        };
        let Some(tbody) = pane.tbody else {
            return;
        };
        let surface = self.surface();
        let title = title.filter(|t| !t.is_empty());
        match (self.0.title_node.get(), title) {
            (None, Some(title)) => {
                let caption = surface.create_node("caption");
                let span = surface.append_new(caption, "span", &[("text", Value::from(title))]);
                surface.insert_before(tbody, caption);
                self.0.title_node.set(Some(span));
            }
            (Some(span), Some(title)) => surface.set_property(span, "text", Value::from(title)),
            (Some(span), None) => {
                if let Some(caption) = surface.parent_node(span) {
                    surface.remove_node(caption);
                }
                self.0.title_node.set(None);
            }
            (None, None) => {}
        }
    }

    pub fn label(&self) -> Option<String> {
        self.0.label.borrow().clone()
    }

    pub fn set_label(&self, label: Option<&str>) {
        *self.0.label.borrow_mut() = label.map(String::from);
        self.place_label(label, &self.0.label_node, self.0.label_cell);
    }

    pub fn suffix(&self) -> Option<String> {
        self.0.suffix.borrow().clone()
    }

    /// Text placed after the element, inside its cell.
    pub fn set_suffix(&self, suffix: Option<&str>) {
        *self.0.suffix.borrow_mut() = suffix.map(String::from);
        self.place_label(suffix, &self.0.suffix_node, self.0.cell);
    }

    fn place_label(&self, text: Option<&str>, slot: &Cell<Option<NodeId>>, parent: Option<NodeId>) {
        let Some(parent) = parent else {
            return;
        };
        let surface = self.surface();
        let node = match slot.get() {
            Some(node) => node,
            None => {
                let labels_input = match &self.0.body {
                    Body::Leaf(leaf) => labels_element(&leaf.meta),
                    Body::Container(_) => false,
                };
                let node = if labels_input {
                    let target = Value::from(input_id(&self.0.name));
                    surface.append_new(parent, "label", &[("for", target)])
                } else {
                    surface.append_new(parent, "label", &[])
                };
                slot.set(Some(node));
                node
            }
        };
        surface.set_property(node, "text", Value::from(text.unwrap_or_default()));
    }

    // ============================================================================
    // Native attributes
    // ============================================================================

    pub fn min(&self) -> f64 {
        self.attribute("min").to_number()
    }

    pub fn set_min(&self, min: impl Into<Value>) {
        self.set_attribute("min", min.into());
    }

    pub fn max(&self) -> f64 {
        self.attribute("max").to_number()
    }

    pub fn set_max(&self, max: impl Into<Value>) {
        self.set_attribute("max", max.into());
    }

    pub fn step(&self) -> f64 {
        self.attribute("step").to_number()
    }

    pub fn set_step(&self, step: impl Into<Value>) {
        self.set_attribute("step", step.into());
    }

    /// `(min, max)`
    pub fn range(&self) -> (f64, f64) {
        (self.min(), self.max())
    }

    pub fn set_range(&self, min: impl Into<Value>, max: impl Into<Value>) {
        self.set_min(min);
        self.set_max(max);
    }

    pub fn rows(&self) -> f64 {
        self.attribute("rows").to_number()
    }

    pub fn set_rows(&self, rows: impl Into<Value>) {
        self.set_attribute("rows", rows.into());
    }

    pub fn readonly(&self) -> bool {
        self.attribute("readonly").is_truthy()
    }

    pub fn set_readonly(&self, readonly: bool) {
        self.set_attribute("readonly", Value::Bool(readonly));
    }

    pub fn placeholder(&self) -> Option<String> {
        self.attribute("placeholder").as_str().map(String::from)
    }

    pub fn set_placeholder(&self, placeholder: Option<&str>) {
        self.set_attribute("placeholder", Value::from(placeholder.unwrap_or_default()));
    }

    // ============================================================================
    // Events
    // ============================================================================

    pub fn on(&self, event: &str, handler: impl Fn(&ComponentEvent) + 'static) -> ListenerId {
        self.0.events.on(event, handler)
    }

    pub fn off(&self, event: &str, id: Option<ListenerId>) -> bool {
        self.0.events.off(event, id)
    }

    pub fn emit(&self, event: &str, value: Value) -> bool {
        let payload = ComponentEvent {
            component: self.clone(),
            value,
        };
        self.0.events.emit(event, &payload)
    }

    pub fn on_change(&self) -> Option<Handler<ComponentEvent>> {
        self.0.events.handler("onChange")
    }

    pub fn set_on_change(&self, handler: Option<Handler<ComponentEvent>>) {
        self.0.events.set_handler("onChange", handler);
    }

    pub fn on_click(&self) -> Option<Handler<ComponentEvent>> {
        self.0.events.handler("onClick")
    }

    pub fn set_on_click(&self, handler: Option<Handler<ComponentEvent>>) {
        self.0.events.set_handler("onClick", handler);
    }
}

impl BoundSlot for Component {
    fn get(&self) -> Value {
        self.value()
    }

    fn set(&self, value: Value) {
        self.set_value(value);
    }
}

/// Inputs get an id so labels can point at them.
fn labels_element(meta: &MetaDescriptor) -> bool {
    matches!(meta.tag, Tag::Input | Tag::Computed(_))
}

fn input_id(name: &str) -> String {
    format!("palettejs-input-{name}")
}

fn create_element(
    surface: &dyn Surface,
    this: &Weak<ComponentInner>,
    meta: &MetaDescriptor,
    name: &str,
    description: &Description,
) -> NodeId {
    let tag = meta.tag.resolve(description);
    let element = surface.create_node(tag);
    if labels_element(meta) {
        surface.set_property(element, "id", Value::from(input_id(name)));
    }
    if let Some(input_type) = meta.input_type.as_deref() {
        if matches!(tag, "input" | "button") {
            surface.set_property(element, "type", Value::from(input_type));
        }
    }

    let key = meta.value_key.unwrap_or("value");
    let weak = this.clone();
    surface.subscribe(
        element,
        "change",
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                let component = Component(inner);
                let value = component.surface().get_property(element, key);
                component.set_value(value);
            }
        }),
    );
    let weak = this.clone();
    surface.subscribe(
        element,
        "click",
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Component(inner).emit("click", Value::Null);
            }
        }),
    );
    element
}

fn text_of(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_string())
    }
}

fn options_of(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}
