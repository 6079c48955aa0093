//! GUI module for the event timeline viewer.
//!
//! This module contains the egui-based user interface: the main window,
//! the timeline renderer and the error dialog.

mod app;
mod dialogs;
mod timeline;

pub use app::EventTimelineApp;
pub use timeline::{PainterMeasure, TimelineView, compute_layout};
