//! Declarative Palettes
//!
//! A palette is built from a [`Description`]: nested descriptions become
//! containers, the rest become leaf components whose kind is looked up in a
//! [`TypeRegistry`]. Every leaf whose name appears in the palette's
//! [`Values`] container is bound to it, both ways.
//!
//! # Architecture
//!
//! ```text
//! Description + Values
//!        ↓
//!     Palette ──── instance registry (id, name)
//!        ↓
//!   root Component
//!        ↓
//! ┌──────┴──────┐
//! │             │
//! Layout     TypeRegistry
//! (tables,   (kind → MetaDescriptor)
//!  rows)        │
//!    └──────┬──────┘
//!           ↓
//!    dyn Surface (MemorySurface, ...)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use palette_kit::prelude::*;
//!
//! let surface = Rc::new(MemorySurface::new());
//! let values = Values::new().with("a", 5).with("b", true);
//! let components = Description::from_json(json!({
//!     "a": {"label": "A"},
//!     "b": {"label": "B"}
//! }))?;
//!
//! let palette = Palette::new(surface, PaletteProps::new(components).values(values.clone()));
//! values.set("a", 9.5); // palette fires `change` for `a`
//! ```

mod color;
mod component;
mod description;
mod emitter;
mod instance;
mod layout;
mod memory;
mod registry;
mod surface;
mod value;
mod values;

pub use color::*;
pub use component::*;
pub use description::*;
pub use emitter::*;
pub use instance::*;
pub use layout::*;
pub use memory::*;
pub use registry::*;
pub use surface::*;
pub use value::*;
pub use values::*;
