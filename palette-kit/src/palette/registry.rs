//! Palette Type Registry
//!
//! Maps logical value kinds (`number`, `boolean`, `color`, ...) to the
//! meta-descriptors that tell a leaf component which element to render, which
//! native property carries its value and how values are coerced on the way in
//! and out.

use std::collections::HashMap;
use std::fmt;

use super::color::Color;
use super::component::Component;
use super::description::Description;
use super::value::Value;

/// Logical kind of a leaf component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    String,
    Number,
    Button,
    Text,
    Color,
    Slider,
    Ruler,
    Progress,
    Html,
    List,
    /// A kind outside the built-in set, either registered explicitly or
    /// rendered through the pass-through descriptor.
    Custom(String),
}

impl Kind {
    /// Get the kind name as used in descriptions
    pub fn name(&self) -> &str {
        match self {
            Kind::Boolean => "boolean",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Button => "button",
            Kind::Text => "text",
            Kind::Color => "color",
            Kind::Slider => "slider",
            Kind::Ruler => "ruler",
            Kind::Progress => "progress",
            Kind::Html => "html",
            Kind::List => "list",
            Kind::Custom(name) => name,
        }
    }

    /// Parse from a name. Unknown names become [`Kind::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "boolean" => Kind::Boolean,
            "string" => Kind::String,
            "number" => Kind::Number,
            "button" => Kind::Button,
            "text" => Kind::Text,
            "color" => Kind::Color,
            "slider" => Kind::Slider,
            "ruler" => Kind::Ruler,
            "progress" => Kind::Progress,
            "html" => Kind::Html,
            "list" => Kind::List,
            other => Kind::Custom(other.to_string()),
        }
    }

    /// Get all built-in kinds
    pub fn builtin() -> Vec<Kind> {
        vec![
            Kind::Boolean,
            Kind::String,
            Kind::Number,
            Kind::Button,
            Kind::Text,
            Kind::Color,
            Kind::Slider,
            Kind::Ruler,
            Kind::Progress,
            Kind::Html,
            Kind::List,
        ]
    }

    /// The kind a bare value implies. A list without options is rendered
    /// through the pass-through `array` kind.
    pub fn of_value(value: &Value) -> Option<Kind> {
        match value {
            Value::Bool(_) => Some(Kind::Boolean),
            Value::Number(_) => Some(Kind::Number),
            Value::String(_) => Some(Kind::String),
            Value::Color(_) => Some(Kind::Color),
            Value::List(_) => Some(Kind::Custom("array".to_string())),
            Value::Null => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type GetValueHook = fn(&Component, Value) -> Value;
/// Returning `None` means the hook wrote the native element itself.
pub type SetValueHook = fn(&Component, Value) -> Option<Value>;
pub type OptionsHook = fn(&Component);
pub type StateHook = fn(&Component, bool);

/// Which element a leaf renders.
#[derive(Clone, Copy)]
pub enum Tag {
    /// An `<input>` whose `type` attribute comes from the descriptor.
    Input,
    Fixed(&'static str),
    /// Chosen from the component's description.
    Computed(fn(&Description) -> &'static str),
}

impl Tag {
    pub fn resolve(&self, description: &Description) -> &'static str {
        match self {
            Tag::Input => "input",
            Tag::Fixed(tag) => tag,
            Tag::Computed(select) => select(description),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Input => f.write_str("Input"),
            Tag::Fixed(tag) => f.debug_tuple("Fixed").field(tag).finish(),
            Tag::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Static per-kind rendering and coercion record.
#[derive(Clone)]
pub struct MetaDescriptor {
    pub kind: Kind,
    pub tag: Tag,
    /// `type` attribute for `<input>` elements
    pub input_type: Option<String>,
    /// Native property holding the value; `None` keeps the value on the
    /// component only.
    pub value_key: Option<&'static str>,
    /// Parse values as floats after the element round trip
    pub number: bool,
    pub get_value: Option<GetValueHook>,
    pub set_value: Option<SetValueHook>,
    pub set_options: Option<OptionsHook>,
    pub set_enabled: Option<StateHook>,
    pub set_visible: Option<StateHook>,
}

impl fmt::Debug for MetaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaDescriptor")
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("input_type", &self.input_type)
            .field("value_key", &self.value_key)
            .field("number", &self.number)
            .field("get_value", &self.get_value.is_some())
            .field("set_value", &self.set_value.is_some())
            .field("set_options", &self.set_options.is_some())
            .field("set_enabled", &self.set_enabled.is_some())
            .field("set_visible", &self.set_visible.is_some())
            .finish()
    }
}

impl MetaDescriptor {
    /// The pass-through descriptor: an `<input>` whose `type` is the kind
    /// name, value in `value`, no coercion and no hooks.
    pub fn new(kind: Kind) -> Self {
        MetaDescriptor {
            input_type: Some(kind.name().to_string()),
            kind,
            tag: Tag::Input,
            value_key: Some("value"),
            number: false,
            get_value: None,
            set_value: None,
            set_options: None,
            set_enabled: None,
            set_visible: None,
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    pub fn input_type(mut self, input_type: Option<&str>) -> Self {
        self.input_type = input_type.map(String::from);
        self
    }

    pub fn value_key(mut self, key: Option<&'static str>) -> Self {
        self.value_key = key;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.number = true;
        self
    }

    pub fn on_get_value(mut self, hook: GetValueHook) -> Self {
        self.get_value = Some(hook);
        self
    }

    pub fn on_set_value(mut self, hook: SetValueHook) -> Self {
        self.set_value = Some(hook);
        self
    }

    pub fn on_set_options(mut self, hook: OptionsHook) -> Self {
        self.set_options = Some(hook);
        self
    }

    pub fn on_set_enabled(mut self, hook: StateHook) -> Self {
        self.set_enabled = Some(hook);
        self
    }

    pub fn on_set_visible(mut self, hook: StateHook) -> Self {
        self.set_visible = Some(hook);
        self
    }
}

/// Registry of meta-descriptors by kind.
///
/// # Example
///
/// ```rust,ignore
/// let registry = TypeRegistry::with_standard_kinds();
///
/// let kind = registry.resolve(None, &Value::from(5), false, false);
/// assert_eq!(kind, Some(Kind::Number));
/// ```
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    descriptors: HashMap<Kind, MetaDescriptor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_standard_kinds()
    }
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        TypeRegistry {
            descriptors: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in kind
    pub fn with_standard_kinds() -> Self {
        let mut registry = Self::new();

        registry.register(
            MetaDescriptor::new(Kind::Boolean)
                .input_type(Some("checkbox"))
                .value_key(Some("checked")),
        );

        registry.register(
            MetaDescriptor::new(Kind::String)
                .tag(Tag::Computed(string_tag))
                .input_type(Some("text")),
        );

        registry.register(
            MetaDescriptor::new(Kind::Number)
                .input_type(Some("number"))
                .numeric(),
        );

        registry.register(
            MetaDescriptor::new(Kind::Button)
                .tag(Tag::Fixed("button"))
                .input_type(Some("button"))
                .value_key(Some("text")),
        );

        registry.register(
            MetaDescriptor::new(Kind::Text)
                .tag(Tag::Fixed("span"))
                .input_type(None)
                .value_key(Some("text")),
        );

        registry.register(
            MetaDescriptor::new(Kind::Slider)
                .input_type(Some("range"))
                .numeric(),
        );

        registry.register(
            MetaDescriptor::new(Kind::Ruler)
                .tag(Tag::Fixed("hr"))
                .input_type(None)
                .value_key(None),
        );

        registry.register(
            MetaDescriptor::new(Kind::Progress)
                .tag(Tag::Fixed("progress"))
                .input_type(None)
                .value_key(None),
        );

        registry.register(
            MetaDescriptor::new(Kind::Html)
                .tag(Tag::Fixed("div"))
                .input_type(None)
                .value_key(Some("html")),
        );

        registry.register(
            MetaDescriptor::new(Kind::List)
                .tag(Tag::Fixed("select"))
                .input_type(None)
                .on_set_options(render_options),
        );

        registry.register(
            MetaDescriptor::new(Kind::Color)
                .input_type(Some("color"))
                .on_get_value(color_get_value)
                .on_set_value(color_set_value),
        );

        registry
    }

    /// Register a descriptor, replacing any previous one for its kind
    pub fn register(&mut self, descriptor: MetaDescriptor) {
        self.descriptors.insert(descriptor.kind.clone(), descriptor);
    }

    pub fn get(&self, kind: &Kind) -> Option<&MetaDescriptor> {
        self.descriptors.get(kind)
    }

    pub fn contains(&self, kind: &Kind) -> bool {
        self.descriptors.contains_key(kind)
    }

    /// Get all registered kinds
    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.descriptors.keys()
    }

    /// The registered descriptor, or the pass-through one for unknown kinds.
    pub fn lookup(&self, kind: &Kind) -> MetaDescriptor {
        self.get(kind)
            .cloned()
            .unwrap_or_else(|| MetaDescriptor::new(kind.clone()))
    }

    /// Infer the kind of a component.
    ///
    /// In order: a registered explicit type, `list` when options are given,
    /// `button` when a click handler is given, the kind implied by the
    /// initial value, an unregistered explicit type as a pass-through kind.
    /// `None` means the component is a container.
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        sample: &Value,
        has_options: bool,
        has_click: bool,
    ) -> Option<Kind> {
        let explicit = explicit.map(Kind::from_name);
        if let Some(kind) = explicit.as_ref().filter(|k| self.contains(k)) {
            return Some(kind.clone());
        }
        if has_options {
            return Some(Kind::List);
        }
        if has_click {
            return Some(Kind::Button);
        }
        Kind::of_value(sample).or(explicit)
    }
}

fn string_tag(description: &Description) -> &'static str {
    let rows = description.get("rows").map_or(f64::NAN, Value::to_number);
    if rows > 1.0 { "textarea" } else { "input" }
}

fn render_options(component: &Component) {
    let Some(element) = component.element() else {
        return;
    };
    let surface = component.surface();
    surface.remove_children(element);
    for option in component.options() {
        surface.append_new(
            element,
            "option",
            &[("value", option.clone()), ("text", option)],
        );
    }
}

fn color_get_value(_component: &Component, raw: Value) -> Value {
    if raw.is_null() {
        raw
    } else {
        Value::Color(Color::from_value(&raw))
    }
}

/// Hex notation is only enforced when the element really is a color input,
/// so a surface may substitute a richer picker that keeps alpha.
fn color_set_value(component: &Component, value: Value) -> Option<Value> {
    let hex = component
        .element()
        .map(|el| component.surface().get_property(el, "type"))
        .is_some_and(|t| t.as_str() == Some("color"));
    Some(Value::String(Color::from_value(&value).to_css(hex)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_kinds() {
        let registry = TypeRegistry::with_standard_kinds();

        for kind in Kind::builtin() {
            assert!(registry.contains(&kind), "Missing descriptor for {:?}", kind);
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in Kind::builtin() {
            assert_eq!(Kind::from_name(kind.name()), kind);
        }
        assert_eq!(Kind::from_name("date"), Kind::Custom("date".to_string()));
    }

    #[test]
    fn test_resolve_order() {
        let registry = TypeRegistry::with_standard_kinds();
        let none = Value::Null;

        // Registered explicit type wins over everything else.
        assert_eq!(
            registry.resolve(Some("slider"), &Value::from("x"), true, true),
            Some(Kind::Slider)
        );
        assert_eq!(registry.resolve(None, &Value::from(1), true, true), Some(Kind::List));
        assert_eq!(registry.resolve(None, &Value::from(1), false, true), Some(Kind::Button));
        assert_eq!(registry.resolve(None, &Value::from(1), false, false), Some(Kind::Number));
        assert_eq!(registry.resolve(None, &Value::from(true), false, false), Some(Kind::Boolean));
        assert_eq!(registry.resolve(None, &Value::from("a"), false, false), Some(Kind::String));
        assert_eq!(registry.resolve(None, &none, false, false), None);
        assert_eq!(
            registry.resolve(None, &Value::from(vec![1, 2]), false, false),
            Some(Kind::Custom("array".to_string()))
        );
    }

    #[test]
    fn test_resolve_unregistered_explicit_type() {
        let registry = TypeRegistry::with_standard_kinds();

        assert_eq!(
            registry.resolve(Some("date"), &Value::Null, false, false),
            Some(Kind::Custom("date".to_string()))
        );
        // A value sample still takes precedence over an unknown type name.
        assert_eq!(
            registry.resolve(Some("date"), &Value::from("2020-01-01"), false, false),
            Some(Kind::String)
        );
    }

    #[test]
    fn test_lookup_pass_through() {
        let registry = TypeRegistry::with_standard_kinds();
        let meta = registry.lookup(&Kind::Custom("date".to_string()));

        assert!(matches!(meta.tag, Tag::Input));
        assert_eq!(meta.input_type.as_deref(), Some("date"));
        assert_eq!(meta.value_key, Some("value"));
        assert!(!meta.number);
        assert!(meta.set_value.is_none());
    }

    #[test]
    fn test_string_tag_depends_on_rows() {
        let registry = TypeRegistry::with_standard_kinds();
        let meta = registry.lookup(&Kind::String);

        let single = Description::from_json(json!({"value": "a"})).unwrap();
        let multi = Description::from_json(json!({"value": "a", "rows": 4})).unwrap();
        assert_eq!(meta.tag.resolve(&single), "input");
        assert_eq!(meta.tag.resolve(&multi), "textarea");
    }

    #[test]
    fn test_register_custom_kind() {
        let mut registry = TypeRegistry::with_standard_kinds();
        let kind = Kind::Custom("percent".to_string());
        registry.register(MetaDescriptor::new(kind.clone()).input_type(Some("number")).numeric());

        assert_eq!(registry.resolve(Some("percent"), &Value::Null, false, false), Some(kind.clone()));
        assert!(registry.lookup(&kind).number);
    }
}
