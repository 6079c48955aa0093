//! Core data structures and the layout engine.
//!
//! Nothing in here depends on the GUI: events go in, a `Layout` of lane
//! placements and overflow groups comes out.

pub mod config;
pub mod error;
pub mod event;
pub mod expansion;
pub mod geometry;
pub mod group;
pub mod measure;
pub mod parser;
pub mod placement;
pub mod placer;
pub mod rows;
pub mod scale;
