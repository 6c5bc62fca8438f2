//! Palette instances.
//!
//! A [`Palette`] owns one root container built from its `components`
//! description, mounts it on a [`Surface`] and forwards every component
//! change as a palette `change` event. Live palettes are registered per
//! thread under their id and name until [`Palette::remove`] is called.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Deserialize;

use super::component::{Build, Component, Context};
use super::description::Description;
use super::emitter::{EventHub, Handler, ListenerId};
use super::registry::TypeRegistry;
use super::surface::{NodeId, Surface};
use super::value::Value;
use super::values::Values;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static INSTANCES: RefCell<Instances> = RefCell::new(Instances::default());
}

#[derive(Default)]
struct Instances {
    by_id: IndexMap<u64, Palette>,
    /// Live ids per name, newest last
    by_name: HashMap<String, Vec<u64>>,
}

/// Payload of palette `change` events.
#[derive(Clone)]
pub struct PaletteEvent {
    pub component: Component,
    pub name: String,
    pub value: Value,
}

impl fmt::Debug for PaletteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaletteEvent")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// Everything needed to build a palette.
///
/// Deserializes from a palette file:
///
/// ```json
/// {
///   "title": "Stroke",
///   "components": {
///     "width": {"type": "slider", "range": [0, 10], "label": "Width"},
///     "dashed": {"value": false, "label": "Dashed"}
///   },
///   "values": {"width": 2}
/// }
/// ```
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PaletteProps {
    pub title: Option<String>,
    pub name: Option<String>,
    pub components: Description,
    pub values: Option<Values>,
    pub enabled: Option<bool>,
    /// Mount point; defaults to the first `.palettejs-root` node
    #[serde(skip)]
    pub parent: Option<NodeId>,
    #[serde(skip)]
    pub on_change: Option<Handler<PaletteEvent>>,
}

impl PaletteProps {
    pub fn new(components: Description) -> Self {
        PaletteProps {
            components,
            ..Default::default()
        }
    }

    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn values(mut self, values: Values) -> Self {
        self.values = Some(values);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn on_change(mut self, handler: impl Fn(&PaletteEvent) + 'static) -> Self {
        self.on_change = Some(Rc::new(handler));
        self
    }
}

pub(crate) struct PaletteInner {
    id: u64,
    name: String,
    surface: Rc<dyn Surface>,
    root: Component,
    values: Values,
    element: NodeId,
    /// Every component by name, first declaration wins
    index: IndexMap<String, Component>,
    events: EventHub<PaletteEvent>,
}

/// A mounted palette.
///
/// # Example
///
/// ```rust,ignore
/// let surface = Rc::new(MemorySurface::new());
/// let values = Values::new().with("size", 5);
/// let components = Description::from_json(json!({
///     "size": {"label": "Size"},
///     "bold": {"value": false, "label": "Bold"}
/// }))?;
///
/// let palette = Palette::new(surface, PaletteProps::new(components).values(values.clone()));
/// palette.on("change", |e| log::info!("{} = {}", e.name, e.value));
///
/// values.set("size", 9.5);
/// ```
#[derive(Clone)]
pub struct Palette(Rc<PaletteInner>);

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Palette")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

impl Palette {
    /// Build and mount a palette using the built-in kinds.
    pub fn new(surface: Rc<dyn Surface>, props: PaletteProps) -> Palette {
        Self::with_types(surface, Rc::new(TypeRegistry::with_standard_kinds()), props)
    }

    /// Build and mount a palette with a custom type registry.
    pub fn with_types(surface: Rc<dyn Surface>, types: Rc<TypeRegistry>, props: PaletteProps) -> Palette {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let name = props
            .name
            .clone()
            .or_else(|| {
                props
                    .title
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(name_from_title)
            })
            .unwrap_or_else(|| format!("palette-{id}"));
        let values = props.values.clone().unwrap_or_default();

        let inner = Rc::new_cyclic(|this| {
            let context = Rc::new(Context {
                surface: surface.clone(),
                types,
                palette: this.clone(),
            });
            let root = Component::build(Build {
                context: &context,
                parent: None,
                name: Some("root"),
                description: &props.components,
                values: &values,
                row: None,
                parent_cells: None,
                container: true,
            });

            let mount = props
                .parent
                .or_else(|| surface.find_by_class("palettejs-root"))
                .unwrap_or_else(|| {
                    surface.append_new(
                        surface.body(),
                        "div",
                        &[("class", Value::from("palettejs-root"))],
                    )
                });
            let element = surface.append_new(
                mount,
                "div",
                &[
                    (
                        "class",
                        Value::from(format!("palettejs-palette palettejs-{}", root.class_name())),
                    ),
                    ("id", Value::from(format!("palettejs-palette-{name}"))),
                    ("data-id", Value::from(id.to_string())),
                ],
            );
            if let Some(table) = root.table() {
                surface.append_child(element, table);
            }

            let mut index = IndexMap::new();
            collect(&root, &mut index);
            for (name, component) in &index {
                if !component.is_container() {
                    values.bind(name, Rc::new(component.clone()));
                    log::trace!("Bound value `{}`", name);
                }
            }

            PaletteInner {
                id,
                name: name.clone(),
                surface: surface.clone(),
                root,
                values: values.clone(),
                element,
                index,
                events: EventHub::new(),
            }
        });
        let palette = Palette(inner);

        if let Some(title) = props.title.as_deref() {
            palette.set_title(Some(title));
        }
        if let Some(enabled) = props.enabled {
            palette.set_enabled(enabled);
        }
        if let Some(handler) = props.on_change {
            palette.set_on_change(Some(handler));
        }

        INSTANCES.with(|instances| {
            let mut instances = instances.borrow_mut();
            instances
                .by_name
                .entry(palette.0.name.clone())
                .or_default()
                .push(id);
            instances.by_id.insert(id, palette.clone());
        });
        log::debug!(
            "Created palette `{}` ({}) with {} components",
            palette.0.name,
            id,
            palette.0.index.len()
        );
        palette
    }

    pub(crate) fn from_inner(inner: Rc<PaletteInner>) -> Palette {
        Palette(inner)
    }

    // ============================================================================
    // Instance registry
    // ============================================================================

    /// Look up a live palette by name, then by numeric id. When several live
    /// palettes share a name the newest one is returned.
    pub fn get(identifier: &str) -> Option<Palette> {
        let id = INSTANCES.with(|instances| {
            instances
                .borrow()
                .by_name
                .get(identifier)
                .and_then(|ids| ids.last().copied())
        });
        match id {
            Some(id) => Self::get_by_id(id),
            None => identifier.parse().ok().and_then(Self::get_by_id),
        }
    }

    pub fn get_by_id(id: u64) -> Option<Palette> {
        INSTANCES.with(|instances| instances.borrow().by_id.get(&id).cloned())
    }

    /// The live palette rendering `node`, found by walking up to the palette
    /// element.
    pub fn find(surface: &dyn Surface, node: NodeId) -> Option<Palette> {
        let mut current = Some(node);
        while let Some(id) = current {
            if surface.has_class(id, "palettejs-palette") {
                let palette_id = surface.get_property(id, "data-id").to_number();
                if palette_id.is_finite() && palette_id >= 0.0 {
                    return Self::get_by_id(palette_id as u64);
                }
                return None;
            }
            current = surface.parent_node(id);
        }
        None
    }

    /// Live palettes in creation order.
    pub fn instances() -> Vec<Palette> {
        INSTANCES.with(|instances| instances.borrow().by_id.values().cloned().collect())
    }

    /// Unmount the palette and drop its registration.
    ///
    /// Returns `false` when it was already removed.
    pub fn remove(&self) -> bool {
        self.0.surface.remove_node(self.0.element);
        let removed = INSTANCES.with(|instances| {
            let mut instances = instances.borrow_mut();
            if let Some(ids) = instances.by_name.get_mut(&self.0.name) {
                ids.retain(|id| *id != self.0.id);
                if ids.is_empty() {
                    instances.by_name.remove(&self.0.name);
                }
            }
            instances.by_id.shift_remove(&self.0.id)
        });
        match removed {
            Some(_) => {
                log::debug!("Removed palette `{}` ({})", self.0.name, self.0.id);
                true
            }
            None => false,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn title(&self) -> Option<String> {
        self.0.root.title()
    }

    pub fn set_title(&self, title: Option<&str>) {
        self.0.root.set_title(title);
    }

    /// The `div.palettejs-palette` node.
    pub fn element(&self) -> NodeId {
        self.0.element
    }

    pub fn surface(&self) -> &Rc<dyn Surface> {
        &self.0.surface
    }

    /// Top-level components by name.
    pub fn components(&self) -> IndexMap<String, Component> {
        self.0.root.child_map()
    }

    /// Any component of the tree by name.
    pub fn component(&self, name: &str) -> Option<Component> {
        self.0.index.get(name).cloned()
    }

    pub fn root(&self) -> Component {
        self.0.root.clone()
    }

    /// The bound values container.
    pub fn values(&self) -> Values {
        self.0.values.clone()
    }

    pub fn enabled(&self) -> bool {
        self.0.root.enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.0.root.set_enabled(enabled);
    }

    /// Restore every component's default value.
    pub fn reset(&self) {
        self.0.root.reset();
    }

    // ============================================================================
    // Events
    // ============================================================================

    pub fn on(&self, event: &str, handler: impl Fn(&PaletteEvent) + 'static) -> ListenerId {
        self.0.events.on(event, handler)
    }

    pub fn off(&self, event: &str, id: Option<ListenerId>) -> bool {
        self.0.events.off(event, id)
    }

    pub fn emit(&self, event: &str, payload: &PaletteEvent) -> bool {
        self.0.events.emit(event, payload)
    }

    pub fn on_change(&self) -> Option<Handler<PaletteEvent>> {
        self.0.events.handler("onChange")
    }

    pub fn set_on_change(&self, handler: Option<Handler<PaletteEvent>>) {
        self.0.events.set_handler("onChange", handler);
    }
}

fn collect(component: &Component, index: &mut IndexMap<String, Component>) {
    for child in component.children() {
        index
            .entry(child.name().to_string())
            .or_insert_with(|| child.clone());
        collect(&child, index);
    }
}

/// `"MyTools"` -> `"my_tools"`: hyphenate lower/upper case pairs, fold
/// non-word characters to `_`, lowercase.
fn name_from_title(title: &str) -> String {
    let mut name = String::with_capacity(title.len() + 4);
    let mut previous: Option<char> = None;
    for c in title.chars() {
        if previous.is_some_and(|p| p.is_ascii_lowercase()) && c.is_ascii_uppercase() {
            name.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c.to_ascii_lowercase());
        } else {
            name.push('_');
        }
        previous = Some(c);
    }
    name
}
