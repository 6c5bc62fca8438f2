//! Common imports for building palettes.

pub use crate::palette::{
    Color, Component, ComponentEvent, Description, Kind, Layout, MemorySurface, Palette,
    PaletteEvent, PaletteProps, Surface, Value, Values,
};
