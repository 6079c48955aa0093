//! Layout output records.

use serde::{Deserialize, Serialize};

use super::event::EventId;
use super::geometry::Rect;
use super::group::{GroupId, GroupRecord};

/// Where a placement sits vertically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// Lane of the single-row placer
    Lane { lane: usize },
    /// Lane of a named timeline row
    RowLane { row: usize, lane: usize },
    /// Stacking level of the main row
    Main { level: usize },
    /// Main-row event that found no free level below the cap
    MainOverflow,
}

/// What a placement draws.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Subject {
    /// An input event
    Event(EventId),
    /// The marker standing in for a group
    GroupMarker { group: GroupId, member_count: usize },
}

/// The resolved rectangle and slot for one event or group marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub subject: Subject,
    pub slot: Slot,
    pub rect: Rect,
    /// Absorbed into a group; must not be drawn individually
    pub hidden_by_group: bool,
}

impl PlacementRecord {
    /// The event id, for event placements.
    pub fn event_id(&self) -> Option<EventId> {
        match self.subject {
            Subject::Event(id) => Some(id),
            Subject::GroupMarker { .. } => None,
        }
    }

    /// True for placements the render layer should draw.
    pub fn is_visible(&self) -> bool {
        !self.hidden_by_group
    }

    /// Text for a group marker: its member count.
    pub fn marker_label(&self) -> Option<String> {
        match &self.subject {
            Subject::GroupMarker { member_count, .. } => Some(member_count.to_string()),
            Subject::Event(_) => None,
        }
    }
}

/// Result of one layout pass.
///
/// Rebuilt from scratch on every pass; nothing here survives to the next one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// One record per input event, plus one marker per group
    pub placements: Vec<PlacementRecord>,
    pub groups: Vec<GroupRecord>,
}

impl Layout {
    /// Placement of an event.
    pub fn placement_of(&self, id: EventId) -> Option<&PlacementRecord> {
        self.placements.iter().find(|p| p.event_id() == Some(id))
    }

    /// Group an event was folded into.
    pub fn group_of(&self, id: EventId) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.members.contains(&id))
    }

    /// Look up a group by id.
    pub fn group(&self, id: GroupId) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Placements to draw: standalone events and group markers.
    pub fn visible(&self) -> impl Iterator<Item = &PlacementRecord> {
        self.placements.iter().filter(|p| p.is_visible())
    }
}
