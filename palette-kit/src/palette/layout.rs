//! Container layout.
//!
//! Containers render as tables. Every component that renders its own cell
//! adds a label cell and a content cell to the row it lives in:
//!
//! - `rows`: one table row per child
//! - `columns`: all children share one row; nested in a parent row, the
//!   container has no table and its children join the parent's row
//! - `horizontal`: all children share one row of the container's own table
//!
//! Cell counts are tracked while children are built so a `rows` container
//! can stretch narrow rows across its widest one.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::component::{Build, Component, ComponentInner, Context};
use super::description::Description;
use super::surface::{NodeId, Surface};
use super::value::Value;
use super::values::Values;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Rows,
    Columns,
    Horizontal,
}

impl Layout {
    pub fn name(self) -> &'static str {
        match self {
            Layout::Rows => "rows",
            Layout::Columns => "columns",
            Layout::Horizontal => "horizontal",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rows" => Some(Layout::Rows),
            "columns" => Some(Layout::Columns),
            "horizontal" => Some(Layout::Horizontal),
            _ => None,
        }
    }

    /// The layout a container description asks for. Accepts the older
    /// `columns: true` flag.
    pub fn of(description: &Description) -> Self {
        let named = description
            .get("layout")
            .and_then(Value::as_str)
            .and_then(Layout::from_name);
        match named {
            Some(layout) => layout,
            None if description.get("columns").is_some_and(Value::is_truthy) => Layout::Columns,
            None => Layout::Rows,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The laid out part of a container.
pub(crate) struct Pane {
    pub(crate) layout: Layout,
    pub(crate) table: Option<NodeId>,
    pub(crate) tbody: Option<NodeId>,
    pub(crate) row: Option<NodeId>,
    pub(crate) children: IndexMap<String, Component>,
    pub(crate) width: usize,
}

/// Build a container's table and children.
pub(crate) fn build_pane(
    context: &Rc<Context>,
    this: &Weak<ComponentInner>,
    layout: Layout,
    description: &Description,
    values: &Values,
    row: Option<NodeId>,
    parent_cells: Option<&Cell<usize>>,
) -> Pane {
    let surface = &context.surface;
    let joins_parent_row = layout == Layout::Columns && row.is_some();
    let (table, tbody) = if joins_parent_row {
        (None, None)
    } else {
        let table = surface.create_with("table", &[("class", Value::from("palettejs-pane"))]);
        let tbody = surface.append_new(table, "tbody", &[]);
        (Some(table), Some(tbody))
    };

    let cells = Cell::new(0);
    let mut width = 0;
    let mut current_row = if joins_parent_row { row } else { None };
    let mut shared_row = None;
    let mut children = IndexMap::new();

    let (nested, _) = description.classify();
    for (key, child) in nested {
        if let Some(tbody) = tbody {
            if layout == Layout::Rows || current_row.is_none() {
                let tr = surface.append_new(
                    tbody,
                    "tr",
                    &[
                        ("class", Value::from("palettejs-row")),
                        ("id", Value::from(format!("palettejs-row-{key}"))),
                    ],
                );
                current_row = Some(tr);
                if layout != Layout::Rows {
                    shared_row = Some(tr);
                }
            }
        }

        let component = Component::build(Build {
            context,
            parent: Some(this.clone()),
            name: Some(key),
            description: child,
            values,
            row: current_row,
            parent_cells: Some(&cells),
            container: false,
        });
        width = width.max(cells.get());
        if layout == Layout::Rows {
            cells.set(0);
        }
        children.insert(key.to_string(), component);
    }

    if layout == Layout::Columns {
        if let Some(parent_cells) = parent_cells {
            parent_cells.set(parent_cells.get() + width);
        }
    }
    if layout == Layout::Rows && width > 2 {
        for child in children.values() {
            if let Some(cell) = child.cell() {
                surface.set_property(cell, "colspan", Value::from(width - 1));
            }
        }
    }

    Pane {
        layout,
        table,
        tbody,
        row: row.or(shared_row),
        children,
        width,
    }
}

/// Append the label and content cells of a component to `row`.
pub(crate) fn append_cells(
    surface: &dyn Surface,
    row: NodeId,
    name: &str,
    class_name: &str,
    content: NodeId,
) -> (NodeId, NodeId) {
    let label_cell = surface.append_new(
        row,
        "td",
        &[
            ("class", Value::from("palettejs-label")),
            ("id", Value::from(format!("palettejs-label-{name}"))),
        ],
    );
    let cell = surface.append_new(
        row,
        "td",
        &[
            ("class", Value::from(format!("palettejs-component palettejs-{class_name}"))),
            ("id", Value::from(format!("palettejs-component-{name}"))),
        ],
    );
    surface.append_child(cell, content);
    (label_cell, cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::instance::{Palette, PaletteProps};
    use crate::palette::memory::MemorySurface;
    use serde_json::json;

    fn build(components: serde_json::Value) -> (Rc<MemorySurface>, Palette) {
        let surface = Rc::new(MemorySurface::new());
        let components = Description::from_json(components).unwrap();
        let palette = Palette::new(surface.clone(), PaletteProps::new(components));
        (surface, palette)
    }

    #[test]
    fn test_layout_of() {
        let of = |json| Layout::of(&Description::from_json(json).unwrap());
        assert_eq!(of(json!({})), Layout::Rows);
        assert_eq!(of(json!({"layout": "horizontal"})), Layout::Horizontal);
        assert_eq!(of(json!({"columns": true})), Layout::Columns);
        assert_eq!(of(json!({"layout": "bogus"})), Layout::Rows);
    }

    #[test]
    fn test_rows_layout() {
        let (surface, palette) = build(json!({"a": {"value": 1}, "b": {"value": true}}));
        let root = palette.root();
        let tbody = surface.children(root.table().unwrap())[0];

        assert_eq!(surface.children(tbody).len(), 2);
        assert_eq!(root.width(), 2);
        let a = palette.component("a").unwrap();
        assert_eq!(surface.children(a.row().unwrap()).len(), 2);
        assert_eq!(surface.get_property(a.cell().unwrap(), "colspan"), Value::Null);
        assert_eq!(
            surface.get_property(a.row().unwrap(), "id"),
            Value::from("palettejs-row-a")
        );
    }

    #[test]
    fn test_columns_row_widens_rows_container() {
        let (surface, palette) = build(json!({
            "line": {"layout": "columns", "x": {"value": 1}, "y": {"value": 2}},
            "z": {"value": 3}
        }));
        let root = palette.root();
        let line = palette.component("line").unwrap();
        let x = palette.component("x").unwrap();
        let y = palette.component("y").unwrap();
        let z = palette.component("z").unwrap();

        // The columns container shares the row and renders no table.
        assert!(line.table().is_none());
        assert!(line.cell().is_none());
        assert_eq!(x.row(), line.row());
        assert_eq!(y.row(), line.row());
        assert_eq!(surface.children(line.row().unwrap()).len(), 4);
        assert_eq!(line.width(), 4);
        assert_eq!(root.width(), 4);

        assert_eq!(surface.get_property(z.cell().unwrap(), "colspan"), Value::from(3));
        // Children of the columns row are not stretched.
        assert_eq!(surface.get_property(x.cell().unwrap(), "colspan"), Value::Null);
    }

    #[test]
    fn test_horizontal_nested_container() {
        let (surface, palette) = build(json!({
            "bar": {"layout": "horizontal", "p": {"value": 1}, "q": {"value": 2}, "r": {"value": 3}},
            "s": {"value": 4}
        }));
        let bar = palette.component("bar").unwrap();
        let p = palette.component("p").unwrap();

        let table = bar.table().unwrap();
        assert_eq!(surface.parent_node(table), bar.cell());
        assert_eq!(bar.width(), 6);
        assert_eq!(p.row(), palette.component("r").unwrap().row());
        assert_eq!(surface.children(p.row().unwrap()).len(), 6);
        assert!(surface.has_class(bar.cell().unwrap(), "palettejs-layout-horizontal"));

        // The bar takes two cells of the root's rows layout.
        assert_eq!(palette.root().width(), 2);
    }

    #[test]
    fn test_root_columns_layout() {
        let (surface, palette) = build(json!({
            "layout": "columns",
            "a": {"value": 1},
            "b": {"value": 2}
        }));
        let root = palette.root();
        let tbody = surface.children(root.table().unwrap())[0];

        assert_eq!(surface.children(tbody).len(), 1);
        assert_eq!(root.row(), palette.component("a").unwrap().row());
        assert_eq!(root.width(), 4);
        assert!(surface.has_class(palette.element(), "palettejs-layout-columns"));
    }

    #[test]
    fn test_empty_container() {
        let (surface, palette) = build(json!({"group": {"label": "Empty"}}));
        let group = palette.component("group").unwrap();

        assert!(group.is_container());
        assert!(group.children().is_empty());
        assert_eq!(group.width(), 0);
        let tbody = surface.children(group.table().unwrap())[0];
        assert!(surface.children(tbody).is_empty());
    }

    #[test]
    fn test_leaf_cells() {
        let (surface, palette) = build(json!({"size": {"value": 1}}));
        let size = palette.component("size").unwrap();
        let cell = size.cell().unwrap();

        assert_eq!(surface.parent_node(size.element().unwrap()), Some(cell));
        assert!(surface.has_class(cell, "palettejs-component"));
        assert!(surface.has_class(cell, "palettejs-type-number"));
        assert_eq!(
            surface.get_property(size.label_cell().unwrap(), "id"),
            Value::from("palettejs-label-size")
        );
        assert_eq!(
            surface.get_property(size.element().unwrap(), "id"),
            Value::from("palettejs-input-size")
        );
    }
}
