//! Overflow groups.
//!
//! A group stands in for events that found no free lane. Its extent is always
//! the union of its members' rectangles grown by the group padding. Group ids
//! are a hash of the sorted member ids, so the same member set gets the same
//! id in every layout pass regardless of zoom, pan or discovery order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::EventId;
use super::geometry::{Rect, Span};
use super::placement::{PlacementRecord, Slot, Subject};

/// Content-derived group identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Id for a member set. Order of `members` does not matter.
    pub fn from_members(members: &[EventId]) -> Self {
        let mut sorted: Vec<EventId> = members.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut hasher = blake3::Hasher::new();
        for id in &sorted {
            hasher.update(&id.0.to_le_bytes());
        }
        let hash = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_le_bytes(prefix))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g-{:016x}", self.0)
    }
}

/// A finished group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    /// Members in discovery order
    pub members: Vec<EventId>,
    /// Union of member rectangles plus padding
    pub extent: Span,
    /// Top of the lane the marker is drawn in
    pub anchor_y: f32,
    /// Timeline row the group belongs to, if any
    pub row: Option<usize>,
    /// Set by the caller from `GroupExpansionManager`; layout always emits `false`
    pub is_expanded: bool,
}

impl GroupRecord {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.members.contains(&id)
    }

    /// Marker placement drawn in place of the members.
    pub fn marker(&self, slot: Slot, lane_height: f32) -> PlacementRecord {
        PlacementRecord {
            subject: Subject::GroupMarker {
                group: self.id,
                member_count: self.members.len(),
            },
            slot,
            rect: Rect::new(self.extent, self.anchor_y, lane_height),
            hidden_by_group: false,
        }
    }
}

/// A group under construction during a layout pass.
#[derive(Clone, Debug)]
pub(crate) struct GroupBuilder {
    members: Vec<EventId>,
    covered: Span,
    padding: f32,
    anchor_y: f32,
}

impl GroupBuilder {
    pub(crate) fn new(id: EventId, span: Span, padding: f32, anchor_y: f32) -> Self {
        Self {
            members: vec![id],
            covered: span,
            padding,
            anchor_y,
        }
    }

    /// Add a member and widen the extent to cover it.
    pub(crate) fn attach(&mut self, id: EventId, span: Span) {
        self.members.push(id);
        self.covered = self.covered.union(&span);
    }

    pub(crate) fn extent(&self) -> Span {
        self.covered.padded(self.padding)
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn finish(self, row: Option<usize>) -> GroupRecord {
        GroupRecord {
            id: GroupId::from_members(&self.members),
            extent: self.covered.padded(self.padding),
            members: self.members,
            anchor_y: self.anchor_y,
            row,
            is_expanded: false,
        }
    }
}
