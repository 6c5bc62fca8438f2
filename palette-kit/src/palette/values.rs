//! Shared Values Container
//!
//! [`Values`] is the caller-owned `name -> value` map a palette binds to.
//! Once a palette is built, every leaf has a bound slot under its name
//! (rewired in place when the name was already there, appended otherwise):
//! reads return the leaf's current value, writes go through the leaf's value
//! pipeline (and fire its `change` event). Other slots stay plain data.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::value::Value;

/// A slot whose reads and writes are delegated.
pub trait BoundSlot {
    fn get(&self) -> Value;
    fn set(&self, value: Value);
}

#[derive(Clone)]
enum Slot {
    Plain(Value),
    Bound(Rc<dyn BoundSlot>),
}

impl Slot {
    fn read(&self) -> Value {
        match self {
            Slot::Plain(value) => value.clone(),
            Slot::Bound(bound) => bound.get(),
        }
    }
}

/// Shared, ordered values container.
///
/// Cloning yields another handle to the same map.
///
/// # Example
///
/// ```rust,ignore
/// let values = Values::new().with("size", 12).with("visible", true);
/// let palette = Palette::new(surface, PaletteProps::new(components).values(values.clone()));
///
/// values.set("size", 14); // updates the `size` leaf and fires its change event
/// ```
#[derive(Clone, Default)]
pub struct Values {
    slots: Rc<RefCell<IndexMap<String, Slot>>>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Values::insert`].
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Store a plain value, replacing whatever slot held the name (a binding
    /// included).
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots
            .borrow_mut()
            .insert(name.into(), Slot::Plain(value.into()));
    }

    /// Current value of a slot.
    pub fn get(&self, name: &str) -> Option<Value> {
        let slot = self.slots.borrow().get(name).cloned()?;
        Some(slot.read())
    }

    /// Assign a slot. Bound slots forward to their component, others store
    /// the value (adding the name if needed).
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let bound = match self.slots.borrow().get(name) {
            Some(Slot::Bound(bound)) => Some(bound.clone()),
            _ => None,
        };
        match bound {
            Some(bound) => bound.set(value),
            None => {
                self.slots
                    .borrow_mut()
                    .insert(name.to_string(), Slot::Plain(value));
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.borrow().contains_key(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        matches!(self.slots.borrow().get(name), Some(Slot::Bound(_)))
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Drop a slot, returning its last value.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let slot = self.slots.borrow_mut().shift_remove(name)?;
        Some(slot.read())
    }

    /// Rewire a slot into a bound slot. An existing slot keeps its position,
    /// a missing one is appended.
    ///
    /// Returns whether the name already had a slot.
    pub fn bind(&self, name: &str, bound: Rc<dyn BoundSlot>) -> bool {
        let mut slots = self.slots.borrow_mut();
        match slots.get_mut(name) {
            Some(slot) => {
                *slot = Slot::Bound(bound);
                true
            }
            None => {
                slots.insert(name.to_string(), Slot::Bound(bound));
                false
            }
        }
    }

    /// Read every slot.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        let slots: Vec<(String, Slot)> = self
            .slots
            .borrow()
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        slots
            .into_iter()
            .map(|(name, slot)| (name, slot.read()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.snapshot()
                .into_iter()
                .map(|(name, value)| (name, value.to_json()))
                .collect(),
        )
    }

    /// Whether both handles share one map.
    pub fn ptr_eq(&self, other: &Values) -> bool {
        Rc::ptr_eq(&self.slots, &other.slots)
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Values {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = Values::new();
        for (name, value) in iter {
            values.insert(name, value);
        }
        values
    }
}

impl Serialize for Values {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let snapshot = self.snapshot();
        let mut map = serializer.serialize_map(Some(snapshot.len()))?;
        for (name, value) in &snapshot {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Values {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Doubler {
        stored: Cell<f64>,
    }

    impl BoundSlot for Doubler {
        fn get(&self) -> Value {
            Value::from(self.stored.get())
        }

        fn set(&self, value: Value) {
            self.stored.set(value.to_number() * 2.0);
        }
    }

    #[test]
    fn test_plain_slots() {
        let values = Values::new().with("a", 1).with("b", "x");
        assert_eq!(values.get("a"), Some(Value::from(1)));
        assert_eq!(values.get("missing"), None);

        values.set("c", true);
        assert_eq!(values.keys(), vec!["a", "b", "c"]);
        assert_eq!(values.remove("b"), Some(Value::from("x")));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_bind_in_place() {
        let values = Values::new().with("a", 1).with("b", 2);
        let other = values.clone();
        let slot = Rc::new(Doubler {
            stored: Cell::new(0.0),
        });

        assert!(values.bind("a", slot.clone()));
        assert!(other.is_bound("a"));
        assert!(values.ptr_eq(&other));
        assert_eq!(other.keys(), vec!["a", "b"]);

        // Missing names are appended.
        assert!(!values.bind("c", slot.clone()));
        assert_eq!(other.keys(), vec!["a", "b", "c"]);
        assert!(other.is_bound("c"));

        other.set("a", 4);
        assert_eq!(slot.stored.get(), 8.0);
        assert_eq!(values.get("a"), Some(Value::from(8)));

        // Inserting replaces the binding with plain data.
        values.insert("a", 1);
        assert!(!values.is_bound("a"));
    }

    #[test]
    fn test_json() {
        let values: Values = serde_json::from_value(serde_json::json!({"x": 1.5, "y": "s"})).unwrap();
        assert_eq!(values.get("x"), Some(Value::from(1.5)));
        assert_eq!(values.to_json(), serde_json::json!({"x": 1.5, "y": "s"}));
        assert_eq!(serde_json::to_value(&values).unwrap(), values.to_json());
    }
}
