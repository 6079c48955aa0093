//! Group expansion state.
//!
//! At most one group is expanded into a detail card at a time. The card has
//! its own screen position, initialised at the group's anchor and then moved
//! freely by dragging.
//!
//! This is the only state that outlives a layout pass, so it has to be
//! carried over to each new set of groups with `reconcile`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::EventId;
use super::group::{GroupId, GroupRecord};

/// Screen position of the detail card's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq)]
struct ExpandedGroup {
    id: GroupId,
    /// Member ids at the time of expansion, used to follow the group across passes
    members: Vec<EventId>,
    card: CardPosition,
}

/// What `reconcile` did with the expanded group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was expanded
    Idle,
    /// The expanded group is still present under the same id
    Kept,
    /// The group's membership changed; expansion moved to its successor
    Retargeted { from: GroupId, to: GroupId },
    /// No group shares members with the expanded one any more
    Closed,
}

/// Tracks which group, if any, is expanded.
#[derive(Clone, Debug, Default)]
pub struct GroupExpansionManager {
    expanded: Option<ExpandedGroup>,
}

impl GroupExpansionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand `group`, or collapse it if it is already expanded.
    ///
    /// Expanding a group collapses any other. Returns whether `group` is
    /// expanded afterwards.
    pub fn toggle(&mut self, group: &GroupRecord) -> bool {
        if self.is_expanded(group.id) {
            self.expanded = None;
            return false;
        }
        self.expanded = Some(ExpandedGroup {
            id: group.id,
            members: group.members.clone(),
            card: CardPosition {
                x: group.extent.center(),
                y: group.anchor_y,
            },
        });
        true
    }

    /// Collapse every group.
    pub fn close_all(&mut self) {
        self.expanded = None;
    }

    pub fn is_expanded(&self, id: GroupId) -> bool {
        self.expanded.as_ref().is_some_and(|e| e.id == id)
    }

    /// The expanded group's id.
    pub fn expanded(&self) -> Option<GroupId> {
        self.expanded.as_ref().map(|e| e.id)
    }

    pub fn card_position(&self) -> Option<CardPosition> {
        self.expanded.as_ref().map(|e| e.card)
    }

    /// Drag the card by `(dx, dy)`.
    pub fn move_card(&mut self, dx: f32, dy: f32) {
        if let Some(expanded) = &mut self.expanded {
            expanded.card.x += dx;
            expanded.card.y += dy;
        }
    }

    /// Carry expansion over to a freshly computed set of groups.
    ///
    /// If the expanded id is gone, expansion moves to the group sharing the
    /// most members with it (earliest on ties), keeping the card where it is.
    pub fn reconcile(&mut self, groups: &[GroupRecord]) -> Reconciliation {
        let Some(expanded) = &mut self.expanded else {
            return Reconciliation::Idle;
        };
        if groups.iter().any(|g| g.id == expanded.id) {
            return Reconciliation::Kept;
        }

        let mut best: Option<(&GroupRecord, usize)> = None;
        for group in groups {
            let shared = group
                .members
                .iter()
                .filter(|m| expanded.members.contains(m))
                .count();
            if shared > 0 && best.is_none_or(|(_, most)| shared > most) {
                best = Some((group, shared));
            }
        }

        match best {
            Some((group, _)) => {
                let from = expanded.id;
                expanded.id = group.id;
                expanded.members = group.members.clone();
                debug!(%from, to = %group.id, "expanded group carried over");
                Reconciliation::Retargeted { from, to: group.id }
            }
            None => {
                debug!(id = %expanded.id, "expanded group disappeared");
                self.expanded = None;
                Reconciliation::Closed
            }
        }
    }

    /// Copy the expansion state onto `groups`.
    pub fn apply(&self, groups: &mut [GroupRecord]) {
        for group in groups {
            group.is_expanded = self.is_expanded(group.id);
        }
    }
}
