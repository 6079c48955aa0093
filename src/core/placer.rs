//! Single-row lane packing.
//!
//! Events are sorted by x and assigned greedily, left to right, to the first
//! free lane in the order centre, above, below. An event that fits nowhere is
//! folded into a group in the centre lane: it joins the group already there,
//! or forms a new group with the single event blocking it.
//!
//! The pass is single and never backtracks, so grouping depends on processing
//! order. That keeps the cost low enough to re-run on every pan or zoom.

use tracing::{debug, trace};

use super::config::{LANE_ORDER, LANES_PER_ROW, LayoutSettings, OVERFLOW_LANE};
use super::error::LayoutError;
use super::event::{Event, EventId};
use super::geometry::{Rect, Span};
use super::group::GroupBuilder;
use super::measure::{TextMeasure, event_width};
use super::placement::{Layout, PlacementRecord, Slot, Subject};
use super::scale::CoordinateMapper;

/// An event with its resolved position and collision span.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedEvent {
    pub(crate) id: EventId,
    pub(crate) x: f32,
    pub(crate) span: Span,
}

/// Map and measure events, then sort them by x.
///
/// Fails on the first non-finite coordinate or invalid width. Ties keep
/// input order.
pub(crate) fn resolve_events<'e, C, M>(
    events: impl IntoIterator<Item = &'e Event>,
    mapper: &C,
    measure: &M,
    default_width: f32,
) -> Result<Vec<ResolvedEvent>, LayoutError>
where
    C: CoordinateMapper + ?Sized,
    M: TextMeasure + ?Sized,
{
    let mut resolved = Vec::new();
    for event in events {
        let x = mapper.x_from_date(event.date);
        if !x.is_finite() {
            return Err(LayoutError::NonFiniteCoordinate {
                event_id: event.id,
                value: x,
            });
        }
        let width = event_width(event, measure, default_width);
        if !width.is_finite() || width <= 0.0 {
            return Err(LayoutError::InvalidWidth {
                event_id: event.id,
                width,
            });
        }
        resolved.push(ResolvedEvent {
            id: event.id,
            x,
            span: Span::centered(x, width),
        });
    }
    resolved.sort_by(|a, b| a.x.total_cmp(&b.x));
    Ok(resolved)
}

/// What holds a stretch of a lane.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Occupant {
    /// A standalone event and its index in the placement list
    Event { placement: usize, id: EventId },
    /// Index into the group builders
    Group(usize),
}

/// One occupied range of a lane.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Occupied {
    pub(crate) span: Span,
    pub(crate) occupant: Occupant,
}

pub(crate) fn lane_is_free(lane: &[Occupied], span: &Span) -> bool {
    lane.iter().all(|o| !o.span.overlaps(span))
}

/// Vertical geometry of the row being packed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneGeometry {
    /// Top of lane 0
    pub row_top: f32,
    pub lane_height: f32,
}

impl LaneGeometry {
    pub fn lane_top(&self, lane: usize) -> f32 {
        self.row_top + lane as f32 * self.lane_height
    }
}

/// Packs the events of one row into three lanes.
#[derive(Clone, Debug)]
pub struct EventPlacer<'a> {
    settings: &'a LayoutSettings,
    geometry: LaneGeometry,
}

impl<'a> EventPlacer<'a> {
    /// Placer for a row whose lane 0 starts at `row_top`.
    pub fn new(settings: &'a LayoutSettings, row_top: f32) -> Self {
        Self {
            settings,
            geometry: LaneGeometry {
                row_top,
                lane_height: settings.lane_height,
            },
        }
    }

    pub fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    /// Lay out `events`.
    ///
    /// Every event gets exactly one placement record; events folded into a
    /// group are marked `hidden_by_group`. One visible marker placement is
    /// appended per group.
    pub fn place<C, M>(&self, events: &[Event], mapper: &C, measure: &M) -> Result<Layout, LayoutError>
    where
        C: CoordinateMapper + ?Sized,
        M: TextMeasure + ?Sized,
    {
        self.settings.validate()?;
        let resolved = resolve_events(events, mapper, measure, self.settings.default_event_width)?;

        let mut lanes: Vec<Vec<Occupied>> = vec![Vec::new(); LANES_PER_ROW];
        let mut placements: Vec<PlacementRecord> = Vec::with_capacity(resolved.len());
        let mut builders: Vec<GroupBuilder> = Vec::new();

        for event in &resolved {
            let span = event.span;
            let blocker = lanes[OVERFLOW_LANE]
                .iter()
                .rposition(|o| o.span.overlaps(&span));

            let Some(hit) = blocker else {
                self.push_standalone(&mut placements, &mut lanes, event.id, span, OVERFLOW_LANE);
                continue;
            };

            let side_lane = LANE_ORDER
                .iter()
                .copied()
                .filter(|&lane| lane != OVERFLOW_LANE)
                .find(|&lane| lane_is_free(&lanes[lane], &span));
            if let Some(lane) = side_lane {
                self.push_standalone(&mut placements, &mut lanes, event.id, span, lane);
                continue;
            }

            let occupied = &mut lanes[OVERFLOW_LANE][hit];
            match occupied.occupant {
                Occupant::Group(g) => {
                    builders[g].attach(event.id, span);
                    occupied.span = builders[g].extent();
                    trace!(event = %event.id, members = builders[g].len(), "attached to group");
                }
                Occupant::Event {
                    placement,
                    id: blocked_id,
                } => {
                    let blocked = &mut placements[placement];
                    blocked.hidden_by_group = true;
                    let mut builder = GroupBuilder::new(
                        blocked_id,
                        blocked.rect.span(),
                        self.settings.group_padding,
                        self.geometry.lane_top(OVERFLOW_LANE),
                    );
                    builder.attach(event.id, span);
                    *occupied = Occupied {
                        span: builder.extent(),
                        occupant: Occupant::Group(builders.len()),
                    };
                    trace!(first = %blocked_id, second = %event.id, "formed group");
                    builders.push(builder);
                }
            }
            placements.push(PlacementRecord {
                subject: Subject::Event(event.id),
                slot: Slot::Lane {
                    lane: OVERFLOW_LANE,
                },
                rect: self.lane_rect(span, OVERFLOW_LANE),
                hidden_by_group: true,
            });
        }

        let groups: Vec<_> = builders.into_iter().map(|b| b.finish(None)).collect();
        for group in &groups {
            placements.push(group.marker(
                Slot::Lane {
                    lane: OVERFLOW_LANE,
                },
                self.geometry.lane_height,
            ));
        }

        debug!(
            events = resolved.len(),
            grouped = groups.iter().map(|g| g.len()).sum::<usize>(),
            groups = groups.len(),
            "single-row layout"
        );

        Ok(Layout { placements, groups })
    }

    fn lane_rect(&self, span: Span, lane: usize) -> Rect {
        Rect::new(span, self.geometry.lane_top(lane), self.geometry.lane_height)
    }

    fn push_standalone(
        &self,
        placements: &mut Vec<PlacementRecord>,
        lanes: &mut [Vec<Occupied>],
        id: EventId,
        span: Span,
        lane: usize,
    ) {
        lanes[lane].push(Occupied {
            span,
            occupant: Occupant::Event {
                placement: placements.len(),
                id,
            },
        });
        placements.push(PlacementRecord {
            subject: Subject::Event(id),
            slot: Slot::Lane { lane },
            rect: self.lane_rect(span, lane),
            hidden_by_group: false,
        });
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

    /// One pixel per day from 2000-01-01.
    fn scale() -> LinearTimeScale {
        LinearTimeScale::new(origin(), 1.0)
    }

    fn event_at(id: u64, x: i64) -> Event {
        let date = origin().checked_add_signed(TimeDelta::days(x)).unwrap();
        Event::new(id, date, format!("event {}", id))
    }

    fn events_at(xs: &[i64]) -> Vec<Event> {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| event_at(i as u64 + 1, x))
            .collect()
    }

    fn lane_of(layout: &Layout, id: u64) -> Option<usize> {
        match layout.placement_of(EventId(id))?.slot {
            Slot::Lane { lane } => Some(lane),
            _ => None,
        }
    }

    fn run(xs: &[i64]) -> Layout {
        let settings = LayoutSettings::default();
        EventPlacer::new(&settings, 0.0)
            .place(&events_at(xs), &scale(), &Unmeasured)
            .unwrap()
    }

    #[test]
    fn test_isolated_events_take_centre_lane() {
        let layout = run(&[100, 500, 900]);
        assert!(layout.groups.is_empty());
        for id in 1..=3 {
            assert_eq!(lane_of(&layout, id), Some(1));
        }
        let rect = layout.placement_of(EventId(1)).unwrap().rect;
        assert_eq!((rect.x1, rect.x2, rect.y, rect.height), (40.0, 160.0, 24.0, 24.0));
    }

    #[test]
    fn test_three_overlapping_events_fill_all_lanes() {
        let layout = run(&[100, 105, 110, 500, 900]);
        assert!(layout.groups.is_empty());
        assert_eq!(lane_of(&layout, 1), Some(1));
        assert_eq!(lane_of(&layout, 2), Some(0));
        assert_eq!(lane_of(&layout, 3), Some(2));
        assert_eq!(lane_of(&layout, 4), Some(1));
        assert_eq!(lane_of(&layout, 5), Some(1));
    }

    #[test]
    fn test_fourth_overlapping_event_forms_group() {
        let layout = run(&[100, 105, 110, 115, 500, 900]);
        assert_eq!(layout.groups.len(), 1);

        let group = &layout.groups[0];
        assert_eq!(group.members, vec![EventId(1), EventId(4)]);
        assert_eq!(group.extent, Span { x1: 32.0, x2: 183.0 });
        assert_eq!(group.anchor_y, 24.0);

        assert!(layout.placement_of(EventId(1)).unwrap().hidden_by_group);
        assert!(layout.placement_of(EventId(4)).unwrap().hidden_by_group);
        assert!(!layout.placement_of(EventId(2)).unwrap().hidden_by_group);
        assert!(!layout.placement_of(EventId(5)).unwrap().hidden_by_group);

        let markers: Vec<_> = layout
            .placements
            .iter()
            .filter(|p| p.event_id().is_none())
            .collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].marker_label(), Some("2".to_string()));
        assert_eq!(markers[0].slot, Slot::Lane { lane: 1 });
    }

    #[test]
    fn test_later_overflow_attaches_to_existing_group() {
        let layout = run(&[100, 105, 110, 115, 120]);
        assert_eq!(layout.groups.len(), 1);
        let group = &layout.groups[0];
        assert_eq!(group.members, vec![EventId(1), EventId(4), EventId(5)]);
        assert_eq!(group.extent, Span { x1: 32.0, x2: 188.0 });
    }

    #[test]
    fn test_identical_positions_grow_one_group() {
        let layout = run(&[0; 10]);
        assert_eq!(layout.groups.len(), 1);
        assert_eq!(layout.groups[0].len(), 8);
        assert_eq!(layout.visible().count(), 3);
        assert_eq!(lane_of(&layout, 2), Some(0));
        assert_eq!(lane_of(&layout, 3), Some(2));
    }

    #[test]
    fn test_touching_events_share_a_lane() {
        let layout = run(&[0, 120, 240]);
        assert!(layout.groups.is_empty());
        assert!((1..=3).all(|id| lane_of(&layout, id) == Some(1)));
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut events = events_at(&[50, 10, 50]);
        events[0].width = Some(10.0);
        events[1].width = Some(10.0);
        events[2].width = Some(10.0);
        let settings = LayoutSettings::default();
        let layout = EventPlacer::new(&settings, 0.0)
            .place(&events, &scale(), &Unmeasured)
            .unwrap();
        assert_eq!(layout.placements[0].event_id(), Some(EventId(2)));
        assert_eq!(layout.placements[1].event_id(), Some(EventId(1)));
        assert_eq!(layout.placements[2].event_id(), Some(EventId(3)));
        assert_eq!(lane_of(&layout, 3), Some(0));
    }

    #[test]
    fn test_row_top_offsets_lanes() {
        let settings = LayoutSettings::default();
        let placer = EventPlacer::new(&settings, 100.0);
        assert_eq!(placer.geometry().lane_top(2), 148.0);
        let layout = placer.place(&events_at(&[0, 1]), &scale(), &Unmeasured).unwrap();
        assert_eq!(layout.placement_of(EventId(1)).unwrap().rect.y, 124.0);
        assert_eq!(layout.placement_of(EventId(2)).unwrap().rect.y, 100.0);
    }

    #[test]
    fn test_non_finite_coordinate_fails_fast() {
        let settings = LayoutSettings::default();
        let mapper = |d: NaiveDate| if d == origin() { f32::NAN } else { 0.0 };
        let result = EventPlacer::new(&settings, 0.0).place(&events_at(&[5, 0]), &mapper, &Unmeasured);
        assert!(matches!(
            result,
            Err(LayoutError::NonFiniteCoordinate {
                event_id: EventId(2),
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_width_fails_fast() {
        let settings = LayoutSettings::default();
        let events = vec![event_at(1, 0).with_width(-5.0)];
        let result = EventPlacer::new(&settings, 0.0).place(&events, &scale(), &Unmeasured);
        assert_eq!(
            result,
            Err(LayoutError::InvalidWidth {
                event_id: EventId(1),
                width: -5.0
            })
        );
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = LayoutSettings {
            lane_height: f32::NAN,
            ..Default::default()
        };
        let result = EventPlacer::new(&settings, 0.0).place(&[], &scale(), &Unmeasured);
        assert!(matches!(result, Err(LayoutError::InvalidSettings { .. })));
    }

    #[test]
    fn test_empty_input() {
        let layout = run(&[]);
        assert!(layout.placements.is_empty());
        assert!(layout.groups.is_empty());
    }

    /// Checks the layout invariants shared by every input.
    fn assert_invariants(events: &[Event], layout: &Layout, padding: f32) {
        // Standalone events in the same lane never overlap.
        let standalone: Vec<_> = layout
            .placements
            .iter()
            .filter(|p| p.event_id().is_some() && !p.hidden_by_group)
            .collect();
        for (i, a) in standalone.iter().enumerate() {
            for b in &standalone[i + 1..] {
                if a.slot == b.slot {
                    assert!(
                        !a.rect.span().overlaps(&b.rect.span()),
                        "{:?} overlaps {:?}",
                        a,
                        b
                    );
                }
            }
        }

        // Every event appears once; hidden exactly when one group holds it.
        for event in events {
            let records: Vec<_> = layout
                .placements
                .iter()
                .filter(|p| p.event_id() == Some(event.id))
                .collect();
            assert_eq!(records.len(), 1);
            let holders = layout.groups.iter().filter(|g| g.contains(event.id)).count();
            assert_eq!(holders, usize::from(records[0].hidden_by_group));
        }

        // Group extents contain every padded member.
        for group in &layout.groups {
            assert!(group.len() >= 2);
            for &member in &group.members {
                let span = layout.placement_of(member).unwrap().rect.span();
                assert!(group.extent.contains(&span.padded(padding)));
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn placement_invariants_hold(
            items in prop::collection::vec((0i64..2000, 10.0f32..200.0), 0..80),
        ) {
            let events: Vec<Event> = items
                .iter()
                .enumerate()
                .map(|(i, &(x, w))| event_at(i as u64, x).with_width(w))
                .collect();
            let settings = LayoutSettings::default();
            let placer = EventPlacer::new(&settings, 0.0);

            let layout = placer.place(&events, &scale(), &Unmeasured).unwrap();
            assert_invariants(&events, &layout, settings.group_padding);

            let again = placer.place(&events, &scale(), &Unmeasured).unwrap();
            prop_assert_eq!(layout, again);
        }
    }
}
