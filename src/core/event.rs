//! Event data structures.
//!
//! This module defines the inputs to the layout engine: dated events, the
//! named timeline rows that reference them, and the dataset that bundles both.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single dated event.
///
/// The layout engine never mutates events; placement data is produced
/// alongside them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Date the event occurred, mapped to x by a `CoordinateMapper`
    pub date: NaiveDate,
    /// Display label
    pub label: String,
    /// Pre-measured label width in pixels, overriding text measurement
    #[serde(default)]
    pub width: Option<f32>,
}

impl Event {
    /// Create an event without a pre-measured width.
    pub fn new(id: u64, date: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            id: EventId(id),
            date,
            label: label.into(),
            width: None,
        }
    }

    /// Set an explicit display width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }
}

/// A named timeline shown as its own row.
///
/// Row order in a list of timelines determines row index and therefore
/// vertical position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    /// Timeline identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional RGB color for the row
    #[serde(default)]
    pub color: Option<[u8; 3]>,
    /// Events shown in this row, by id
    pub events: Vec<EventId>,
    /// Hidden rows are skipped by the layout
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl TimelineRow {
    /// Create a visible timeline row.
    pub fn new(id: impl Into<String>, events: Vec<EventId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            color: None,
            events,
            is_visible: true,
        }
    }
}

/// A complete dataset: all events plus the timelines built over them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Optional title shown by the viewer
    #[serde(default)]
    pub title: Option<String>,
    /// All events
    pub events: Vec<Event>,
    /// Named timelines, in display order
    #[serde(default)]
    pub timelines: Vec<TimelineRow>,
}

impl Dataset {
    /// Earliest and latest event dates, if there are any events.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.events.iter().map(|e| e.date).min()?;
        let last = self.events.iter().map(|e| e.date).max()?;
        Some((first, last))
    }

    /// Look up an event by id.
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }
}
