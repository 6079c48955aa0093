//! Multi-row lane packing.
//!
//! Each visible timeline gets its own row of three lanes and its own
//! collision domain. Events that fit no lane of their row are deferred into
//! horizontal buckets, and each bucket becomes one group once the row is done.
//! Events that belong to no visible timeline go to the main row, which stacks
//! them into levels, avoiding each other and everything placed in the rows.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::config::{LANE_ORDER, LANES_PER_ROW, LayoutSettings, OVERFLOW_LANE};
use super::error::LayoutError;
use super::event::{Event, EventId, TimelineRow};
use super::geometry::{Rect, Span};
use super::group::{GroupBuilder, GroupRecord};
use super::measure::TextMeasure;
use super::placement::{Layout, PlacementRecord, Slot, Subject};
use super::placer::{LaneGeometry, Occupant, Occupied, ResolvedEvent, lane_is_free, resolve_events};
use super::scale::CoordinateMapper;

/// Lays out events across timeline rows plus the main row.
///
/// Holds no state between calls; every call recomputes from its arguments.
#[derive(Clone, Copy, Debug)]
pub struct RowLaneLayoutManager<'a> {
    settings: &'a LayoutSettings,
}

/// Output of one row.
struct RowOutput {
    placements: Vec<PlacementRecord>,
    groups: Vec<GroupRecord>,
}

impl<'a> RowLaneLayoutManager<'a> {
    pub fn new(settings: &'a LayoutSettings) -> Self {
        Self { settings }
    }

    /// Lay out `events` over `rows`.
    ///
    /// Hidden rows are skipped and do not take a row index. An event listed
    /// by several visible rows is laid out in the first of them. Row entries
    /// naming unknown events are ignored.
    pub fn execute_layout<C, M>(
        &self,
        events: &[Event],
        rows: &[TimelineRow],
        mapper: &C,
        measure: &M,
    ) -> Result<Layout, LayoutError>
    where
        C: CoordinateMapper + ?Sized,
        M: TextMeasure + ?Sized,
    {
        self.settings.validate()?;

        let visible: Vec<&TimelineRow> = rows.iter().filter(|r| r.is_visible).collect();
        let mut row_of: HashMap<EventId, usize> = HashMap::new();
        for (index, row) in visible.iter().enumerate() {
            for &id in &row.events {
                row_of.entry(id).or_insert(index);
            }
        }

        let mut per_row: Vec<Vec<&Event>> = vec![Vec::new(); visible.len()];
        let mut main: Vec<&Event> = Vec::new();
        for event in events {
            match row_of.get(&event.id) {
                Some(&index) => per_row[index].push(event),
                None => main.push(event),
            }
        }

        // Resolve everything before placing anything.
        let width = self.settings.default_event_width;
        let resolved_rows = per_row
            .into_iter()
            .map(|row| resolve_events(row, mapper, measure, width))
            .collect::<Result<Vec<_>, _>>()?;
        let resolved_main = resolve_events(main, mapper, measure, width)?;

        let mut layout = Layout::default();
        for (index, row) in resolved_rows.iter().enumerate() {
            let output = self.layout_row(index, row);
            layout.placements.extend(output.placements);
            layout.groups.extend(output.groups);
        }

        let obstacles: Vec<Rect> = layout.visible().map(|p| p.rect).collect();
        let main_placements = self.layout_main_row(&resolved_main, &obstacles);
        layout.placements.extend(main_placements);

        debug!(
            rows = visible.len(),
            events = events.len(),
            main = resolved_main.len(),
            groups = layout.groups.len(),
            "row layout"
        );

        Ok(layout)
    }

    fn layout_row(&self, row: usize, events: &[ResolvedEvent]) -> RowOutput {
        let geometry = LaneGeometry {
            row_top: self.settings.row_y(row),
            lane_height: self.settings.lane_height,
        };
        let bucket_width = self.settings.bucket_width();

        let mut lanes: Vec<Vec<Occupied>> = vec![Vec::new(); LANES_PER_ROW];
        let mut placements = Vec::with_capacity(events.len());
        let mut pending: BTreeMap<i64, Vec<&ResolvedEvent>> = BTreeMap::new();

        for event in events {
            let free = LANE_ORDER
                .iter()
                .copied()
                .find(|&lane| lane_is_free(&lanes[lane], &event.span));
            match free {
                Some(lane) => {
                    lanes[lane].push(Occupied {
                        span: event.span,
                        occupant: Occupant::Event {
                            placement: placements.len(),
                            id: event.id,
                        },
                    });
                    placements.push(PlacementRecord {
                        subject: Subject::Event(event.id),
                        slot: Slot::RowLane { row, lane },
                        rect: Rect::new(event.span, geometry.lane_top(lane), geometry.lane_height),
                        hidden_by_group: false,
                    });
                }
                None => {
                    let bucket = (event.x / bucket_width).floor() as i64;
                    pending.entry(bucket).or_default().push(event);
                }
            }
        }

        let overflow = Slot::RowLane {
            row,
            lane: OVERFLOW_LANE,
        };
        let anchor_y = geometry.lane_top(OVERFLOW_LANE);
        let mut groups = Vec::with_capacity(pending.len());
        for bucket in pending.into_values() {
            let Some((first, rest)) = bucket.split_first() else {
                continue;
            };
            let mut builder =
                GroupBuilder::new(first.id, first.span, self.settings.group_padding, anchor_y);
            for event in rest {
                builder.attach(event.id, event.span);
            }
            for event in &bucket {
                placements.push(PlacementRecord {
                    subject: Subject::Event(event.id),
                    slot: overflow,
                    rect: Rect::new(event.span, anchor_y, geometry.lane_height),
                    hidden_by_group: true,
                });
            }
            groups.push(builder.finish(Some(row)));
        }
        for group in &groups {
            placements.push(group.marker(overflow, geometry.lane_height));
        }

        RowOutput { placements, groups }
    }

    fn layout_main_row(&self, events: &[ResolvedEvent], obstacles: &[Rect]) -> Vec<PlacementRecord> {
        let height = self.settings.lane_height;
        let level_y = |level: usize| self.settings.main_row_y + level as f32 * height;
        let mut levels: Vec<Vec<Span>> = Vec::new();
        let mut placements = Vec::with_capacity(events.len());

        for event in events {
            let free = (0..self.settings.max_main_levels).find(|&level| {
                let taken = levels
                    .get(level)
                    .is_some_and(|spans| spans.iter().any(|s| s.overlaps(&event.span)));
                let rect = Rect::new(event.span, level_y(level), height);
                !taken && !obstacles.iter().any(|o| o.intersects(&rect))
            });

            let (slot, y) = match free {
                Some(level) => {
                    if levels.len() <= level {
                        levels.resize_with(level + 1, Vec::new);
                    }
                    levels[level].push(event.span);
                    (Slot::Main { level }, level_y(level))
                }
                None => {
                    warn!(
                        event = %event.id,
                        cap = self.settings.max_main_levels,
                        "main row full, placing at overflow level"
                    );
                    (Slot::MainOverflow, level_y(self.settings.max_main_levels))
                }
            };

            placements.push(PlacementRecord {
                subject: Subject::Event(event.id),
                slot,
                rect: Rect::new(event.span, y, height),
                hidden_by_group: false,
            });
        }

        placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::measure::Unmeasured;
    use crate::core::scale::LinearTimeScale;
    use chrono::{NaiveDate, TimeDelta};
    use proptest::prelude::*;

    fn origin() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    }

    fn scale() -> LinearTimeScale {
        LinearTimeScale::new(origin(), 1.0)
    }

    fn event_at(id: u64, x: i64) -> Event {
        let date = origin().checked_add_signed(TimeDelta::days(x)).unwrap();
        Event::new(id, date, format!("event {}", id))
    }

    fn row(id: &str, events: &[u64]) -> TimelineRow {
        TimelineRow::new(id, events.iter().map(|&e| EventId(e)).collect())
    }

    fn run(settings: &LayoutSettings, events: &[Event], rows: &[TimelineRow]) -> Layout {
        RowLaneLayoutManager::new(settings)
            .execute_layout(events, rows, &scale(), &Unmeasured)
            .unwrap()
    }

    fn slot_of(layout: &Layout, id: u64) -> Slot {
        layout.placement_of(EventId(id)).unwrap().slot
    }

    #[test]
    fn test_rows_are_independent_collision_domains() {
        let settings = LayoutSettings::default();
        let events = vec![event_at(1, 100), event_at(2, 100)];
        let layout = run(&settings, &events, &[row("a", &[1]), row("b", &[2])]);

        assert!(layout.groups.is_empty());
        assert_eq!(slot_of(&layout, 1), Slot::RowLane { row: 0, lane: 1 });
        assert_eq!(slot_of(&layout, 2), Slot::RowLane { row: 1, lane: 1 });
        assert_eq!(layout.placement_of(EventId(1)).unwrap().rect.y, 24.0);
        assert_eq!(layout.placement_of(EventId(2)).unwrap().rect.y, 72.0 + 24.0);
    }

    #[test]
    fn test_lane_preference_within_row() {
        let settings = LayoutSettings::default();
        let events = vec![event_at(1, 100), event_at(2, 105), event_at(3, 110)];
        let layout = run(&settings, &events, &[row("a", &[1, 2, 3])]);
        assert_eq!(slot_of(&layout, 1), Slot::RowLane { row: 0, lane: 1 });
        assert_eq!(slot_of(&layout, 2), Slot::RowLane { row: 0, lane: 0 });
        assert_eq!(slot_of(&layout, 3), Slot::RowLane { row: 0, lane: 2 });
    }

    #[test]
    fn test_deferred_events_in_one_bucket_form_one_group() {
        let settings = LayoutSettings::default();
        let events: Vec<_> = (1..=5).map(|i| event_at(i, 100 + i as i64)).collect();
        let layout = run(&settings, &events, &[row("a", &[1, 2, 3, 4, 5])]);

        assert_eq!(layout.groups.len(), 1);
        let group = &layout.groups[0];
        assert_eq!(group.members, vec![EventId(4), EventId(5)]);
        assert_eq!(group.row, Some(0));
        assert_eq!(group.anchor_y, 24.0);
        assert_eq!(group.extent, Span { x1: 44.0 - 8.0, x2: 165.0 + 8.0 });
        // The lane occupants stay visible.
        assert!(layout.placement_of(EventId(1)).unwrap().is_visible());
        assert!(!layout.placement_of(EventId(4)).unwrap().is_visible());
    }

    #[test]
    fn test_buckets_split_far_apart_overflow() {
        let settings = LayoutSettings::default();
        let wide = |id| event_at(id, 0).with_width(2000.0);
        let events = vec![wide(1), wide(2), wide(3), event_at(4, 100), event_at(5, 400)];
        let layout = run(&settings, &events, &[row("a", &[1, 2, 3, 4, 5])]);

        assert_eq!(layout.groups.len(), 2);
        assert_eq!(layout.groups[0].members, vec![EventId(4)]);
        assert_eq!(layout.groups[1].members, vec![EventId(5)]);
        let markers = layout.placements.iter().filter(|p| p.event_id().is_none()).count();
        assert_eq!(markers, 2);
    }

    #[test]
    fn test_hidden_rows_do_not_take_an_index() {
        let settings = LayoutSettings::default();
        let mut hidden = row("hidden", &[1]);
        hidden.is_visible = false;
        let events = vec![event_at(1, 0), event_at(2, 0)];
        let layout = run(&settings, &events, &[hidden, row("shown", &[2])]);

        assert_eq!(slot_of(&layout, 2), Slot::RowLane { row: 0, lane: 1 });
        // Event 1 only belongs to a hidden row, so it falls back to the main row.
        assert!(matches!(slot_of(&layout, 1), Slot::Main { .. }));
    }

    #[test]
    fn test_event_in_two_rows_uses_first() {
        let settings = LayoutSettings::default();
        let events = vec![event_at(1, 0)];
        let layout = run(&settings, &events, &[row("a", &[1]), row("b", &[1])]);
        assert_eq!(layout.placements.len(), 1);
        assert_eq!(slot_of(&layout, 1), Slot::RowLane { row: 0, lane: 1 });
    }

    #[test]
    fn test_unknown_row_entries_are_ignored() {
        let settings = LayoutSettings::default();
        let layout = run(&settings, &[event_at(1, 0)], &[row("a", &[1, 99])]);
        assert_eq!(layout.placements.len(), 1);
    }

    #[test]
    fn test_main_row_stacks_levels() {
        let settings = LayoutSettings::default();
        let events = vec![event_at(1, 0), event_at(2, 10), event_at(3, 500)];
        let layout = run(&settings, &events, &[]);

        assert_eq!(slot_of(&layout, 1), Slot::Main { level: 0 });
        assert_eq!(slot_of(&layout, 2), Slot::Main { level: 1 });
        assert_eq!(slot_of(&layout, 3), Slot::Main { level: 0 });
        assert_eq!(layout.placement_of(EventId(2)).unwrap().rect.y, 24.0);
    }

    #[test]
    fn test_main_row_avoids_row_placements() {
        let settings = LayoutSettings {
            first_row_y: 24.0,
            main_row_y: 0.0,
            ..Default::default()
        };
        // Row 0 lanes: 0 at y=24, 1 at y=48, 2 at y=72.
        let events = vec![event_at(1, 0), event_at(2, 0), event_at(3, 0), event_at(4, 0)];
        let layout = run(&settings, &events, &[row("a", &[1])]);

        assert_eq!(layout.placement_of(EventId(1)).unwrap().rect.y, 48.0);
        assert_eq!(slot_of(&layout, 2), Slot::Main { level: 0 });
        assert_eq!(slot_of(&layout, 3), Slot::Main { level: 1 });
        assert_eq!(slot_of(&layout, 4), Slot::Main { level: 3 });
    }

    #[test]
    fn test_main_row_cap_yields_overflow_sentinel() {
        let settings = LayoutSettings {
            max_main_levels: 2,
            ..Default::default()
        };
        let events = vec![event_at(1, 0), event_at(2, 0), event_at(3, 0)];
        let layout = run(&settings, &events, &[]);

        assert_eq!(slot_of(&layout, 2), Slot::Main { level: 1 });
        let overflow = layout.placement_of(EventId(3)).unwrap();
        assert_eq!(overflow.slot, Slot::MainOverflow);
        assert_eq!(overflow.rect.y, 48.0);
        assert!(overflow.is_visible());
    }

    #[test]
    fn test_default_cap_is_fifty_levels() {
        let settings = LayoutSettings::default();
        let events: Vec<_> = (1..=51).map(|i| event_at(i, 0)).collect();
        let layout = run(&settings, &events, &[]);
        assert_eq!(slot_of(&layout, 50), Slot::Main { level: 49 });
        assert_eq!(slot_of(&layout, 51), Slot::MainOverflow);
    }

    #[test]
    fn test_non_finite_coordinate_fails_fast() {
        let settings = LayoutSettings::default();
        let mapper = |_: NaiveDate| f32::INFINITY;
        let result = RowLaneLayoutManager::new(&settings).execute_layout(
            &[event_at(1, 0)],
            &[row("a", &[1])],
            &mapper,
            &Unmeasured,
        );
        assert!(matches!(result, Err(LayoutError::NonFiniteCoordinate { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn row_layout_invariants_hold(
            items in prop::collection::vec((0i64..1500, 10.0f32..180.0, 0usize..4), 0..90),
        ) {
            let settings = LayoutSettings::default();
            let events: Vec<Event> = items
                .iter()
                .enumerate()
                .map(|(i, &(x, w, _))| event_at(i as u64, x).with_width(w))
                .collect();
            // Row 3 means "no timeline".
            let rows: Vec<TimelineRow> = (0..3)
                .map(|r| {
                    let ids: Vec<u64> = items
                        .iter()
                        .enumerate()
                        .filter(|(_, item)| item.2 == r)
                        .map(|(i, _)| i as u64)
                        .collect();
                    row(&format!("row{}", r), &ids)
                })
                .collect();

            let manager = RowLaneLayoutManager::new(&settings);
            let layout = manager.execute_layout(&events, &rows, &scale(), &Unmeasured).unwrap();

            // No overlap among standalone events sharing a slot.
            let standalone: Vec<_> = layout
                .placements
                .iter()
                .filter(|p| p.event_id().is_some() && p.is_visible() && p.slot != Slot::MainOverflow)
                .collect();
            for (i, a) in standalone.iter().enumerate() {
                for b in &standalone[i + 1..] {
                    if a.slot == b.slot {
                        prop_assert!(!a.rect.span().overlaps(&b.rect.span()));
                    }
                }
            }

            // Exhaustiveness and containment.
            for event in &events {
                let records: Vec<_> = layout
                    .placements
                    .iter()
                    .filter(|p| p.event_id() == Some(event.id))
                    .collect();
                prop_assert_eq!(records.len(), 1);
                let holders = layout.groups.iter().filter(|g| g.contains(event.id)).count();
                prop_assert_eq!(holders, usize::from(records[0].hidden_by_group));
            }
            for group in &layout.groups {
                for &member in &group.members {
                    let span = layout.placement_of(member).unwrap().rect.span();
                    prop_assert!(group.extent.contains(&span.padded(settings.group_padding)));
                }
            }

            let again = manager.execute_layout(&events, &rows, &scale(), &Unmeasured).unwrap();
            prop_assert_eq!(layout, again);
        }
    }
}
