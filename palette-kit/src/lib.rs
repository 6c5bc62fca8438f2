//! # Description
//!
//! Palette Kit builds palettes: small panels of form components (checkboxes,
//! number fields, sliders, color pickers, lists, buttons) described
//! declaratively and bound two-way to a shared values container.
//!
//! # Features
//!
//! - Nested descriptions become nested containers laid out as rows, columns
//!   or a horizontal strip.
//! - Leaf kinds are inferred from the initial value when no type is given.
//! - Writing to the values container updates the component and fires its
//!   `change` event, and user edits flow back into the container.
//! - Disabling a container disables its subtree and restores each child's
//!   own state when re-enabled.
//! - Rendering goes through the [`Surface`](palette::Surface) trait; a headless
//!   [`MemorySurface`](palette::MemorySurface) ships with the crate.

pub mod palette;

pub mod prelude;
