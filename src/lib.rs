//! Event Timeline Viewer - lane layout for dated events.
//!
//! `core` packs labelled events into a small number of horizontal lanes and
//! folds whatever does not fit into expandable groups. `gui` draws the result
//! with egui.

pub mod core;
pub mod gui;
