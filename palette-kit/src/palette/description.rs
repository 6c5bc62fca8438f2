//! Declarative Component Descriptions
//!
//! A [`Description`] is an ordered map whose entries are either nested
//! descriptions (each one becomes a child component) or plain fields
//! (`type`, `value`, `label`, `min`, ...). Declaration order is layout order.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use super::component::ComponentEvent;
use super::emitter::Handler;
use super::value::Value;

/// One entry of a [`Description`].
#[derive(Debug, Clone)]
pub enum Entry {
    Nested(Description),
    Field(Value),
}

/// Declarative description of a component and its children.
///
/// # Example
///
/// ```rust,ignore
/// let description = Description::new()
///     .nested("size", Description::new().field("value", 12).field("label", "Size"))
///     .nested("go", Description::new().on_click(|_| log::info!("clicked")));
/// ```
#[derive(Clone, Default)]
pub struct Description {
    entries: IndexMap<String, Entry>,
    on_click: Option<Handler<ComponentEvent>>,
    on_change: Option<Handler<ComponentEvent>>,
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("entries", &self.entries)
            .field("on_click", &self.on_click.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a description from a JSON object. Objects become nested
    /// descriptions, anything else a field.
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), Entry::Field(value.into()));
        self
    }

    pub fn nested(mut self, key: impl Into<String>, description: Description) -> Self {
        self.entries.insert(key.into(), Entry::Nested(description));
        self
    }

    /// Attach a click handler. Its presence makes an untyped leaf a button.
    pub fn on_click(mut self, handler: impl Fn(&ComponentEvent) + 'static) -> Self {
        self.on_click = Some(Rc::new(handler));
        self
    }

    pub fn on_change(mut self, handler: impl Fn(&ComponentEvent) + 'static) -> Self {
        self.on_change = Some(Rc::new(handler));
        self
    }

    /// A field value; nested descriptions are not fields.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            Some(Entry::Field(value)) => Some(value),
            _ => None,
        }
    }

    pub fn child(&self, key: &str) -> Option<&Description> {
        match self.entries.get(key) {
            Some(Entry::Nested(description)) => Some(description),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn click_handler(&self) -> Option<&Handler<ComponentEvent>> {
        self.on_click.as_ref()
    }

    pub fn change_handler(&self) -> Option<&Handler<ComponentEvent>> {
        self.on_change.as_ref()
    }

    /// Split entries into nested descriptions and fields, both in
    /// declaration order.
    pub fn classify(&self) -> (Vec<(&str, &Description)>, Vec<(&str, &Value)>) {
        let mut nested = Vec::new();
        let mut fields = Vec::new();
        for (key, entry) in &self.entries {
            match entry {
                Entry::Nested(description) => nested.push((key.as_str(), description)),
                Entry::Field(value) => fields.push((key.as_str(), value)),
            }
        }
        (nested, fields)
    }

    fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let entry = match value {
                    serde_json::Value::Object(map) => Entry::Nested(Self::from_map(map)),
                    other => Entry::Field(Value::from(other)),
                };
                (key, entry)
            })
            .collect();
        Description {
            entries,
            ..Default::default()
        }
    }
}

impl<'de> Deserialize<'de> for Description {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(Self::from_map(map))
    }
}
