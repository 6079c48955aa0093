//! Timeline rendering module.
//!
//! This module draws the date axis, the timeline rows and the placements the
//! layout engine produced, and turns pointer input into panning, zooming and
//! group expansion.

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, Painter, Pos2, Rect, Stroke, Vec2};
use tracing::debug;

use crate::core::config::LayoutSettings;
use crate::core::error::LayoutError;
use crate::core::event::{Dataset, TimelineRow};
use crate::core::expansion::GroupExpansionManager;
use crate::core::measure::TextMeasure;
use crate::core::placement::{Layout, PlacementRecord, Slot, Subject};
use crate::core::placer::EventPlacer;
use crate::core::rows::RowLaneLayoutManager;
use crate::core::scale::{CoordinateMapper, LinearTimeScale};

/// Width of the label column on the left side.
const LABEL_WIDTH: f32 = 140.0;

/// Height of the date header.
const HEADER_HEIGHT: f32 = 22.0;

/// Padding inside cells.
const CELL_PADDING: f32 = 2.0;

/// Horizontal margin left when fitting the date range to the view.
const FIT_MARGIN: f32 = 80.0;

/// Minimum distance between two date ticks.
const MIN_TICK_SPACING: f32 = 80.0;

/// Candidate tick intervals, in years.
const YEAR_STEPS: [i32; 10] = [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000];

const EVENT_FONT_SIZE: f32 = 12.0;

/// Space left of and right of a label inside its box.
const LABEL_PADDING: f32 = 6.0;

const CARD_WIDTH: f32 = 260.0;
const CARD_LIST_HEIGHT: f32 = 240.0;

const DEFAULT_EVENT_COLOR: Color32 = Color32::from_rgb(96, 125, 139);
const OVERFLOW_COLOR: Color32 = Color32::from_rgb(244, 67, 54);
const EXPANDED_COLOR: Color32 = Color32::from_rgb(255, 193, 7);

/// Label measurement backed by egui's font system.
pub struct PainterMeasure {
    painter: Painter,
    font: egui::FontId,
}

impl PainterMeasure {
    pub fn new(painter: Painter) -> Self {
        Self {
            painter,
            font: egui::FontId::proportional(EVENT_FONT_SIZE),
        }
    }
}

impl TextMeasure for PainterMeasure {
    fn measure(&self, label: &str) -> Option<f32> {
        let galley = self
            .painter
            .layout_no_wrap(label.to_owned(), self.font.clone(), Color32::WHITE);
        Some(galley.size().x + LABEL_PADDING * 2.0)
    }
}

/// View state that survives between frames: zoom, pan and expansion.
#[derive(Debug, Clone)]
pub struct TimelineView {
    pub scale: LinearTimeScale,
    pub expansion: GroupExpansionManager,
    scroll_y: f32,
    needs_fit: bool,
}

impl TimelineView {
    /// Create a view for `dataset`; it is fitted to the width on first render.
    pub fn new(dataset: &Dataset, pixels_per_day: f64) -> Self {
        let origin = dataset
            .date_range()
            .map(|(first, _)| first)
            .unwrap_or_default();
        Self {
            scale: LinearTimeScale::new(origin, pixels_per_day),
            expansion: GroupExpansionManager::new(),
            scroll_y: 0.0,
            needs_fit: true,
        }
    }

    /// Fit the whole date range on the next render.
    pub fn request_fit(&mut self) {
        self.needs_fit = true;
    }

    /// Zoom to `pixels_per_day`, keeping the date at `anchor_x` in place.
    pub fn set_zoom(&mut self, pixels_per_day: f64, anchor_x: f32) {
        let factor = pixels_per_day / self.scale.pixels_per_day();
        self.scale.zoom_about(anchor_x, factor);
    }

    fn fit(&mut self, dataset: &Dataset, width: f32) {
        if let Some((first, last)) = dataset.date_range() {
            self.scale = LinearTimeScale::fit(first, last, (width - FIT_MARGIN * 2.0).max(1.0));
            self.scale.pan_by(FIT_MARGIN);
        }
        self.scroll_y = 0.0;
        self.needs_fit = false;
    }

    fn scroll_by(&mut self, dy: f32, max_scroll: f32) {
        self.scroll_y = (self.scroll_y + dy).clamp(0.0, max_scroll.max(0.0));
    }
}

/// Lay out a dataset the way the viewer shows it.
///
/// Datasets without timelines are packed into a single row. Otherwise each
/// visible timeline gets a row and the main row starts right below them,
/// offset by `main_row_y`.
pub fn compute_layout<M>(
    dataset: &Dataset,
    settings: &LayoutSettings,
    scale: &LinearTimeScale,
    measure: &M,
) -> Result<Layout, LayoutError>
where
    M: TextMeasure + ?Sized,
{
    if dataset.timelines.is_empty() {
        return EventPlacer::new(settings, settings.first_row_y).place(&dataset.events, scale, measure);
    }

    let visible_rows = dataset.timelines.iter().filter(|r| r.is_visible).count();
    let settings = LayoutSettings {
        main_row_y: settings.row_y(visible_rows) + settings.main_row_y,
        ..settings.clone()
    };
    RowLaneLayoutManager::new(&settings).execute_layout(
        &dataset.events,
        &dataset.timelines,
        scale,
        measure,
    )
}

/// Topmost visible placement under a point in layout coordinates.
pub fn placement_at(layout: &Layout, x: f32, y: f32) -> Option<&PlacementRecord> {
    // Markers come after events, so search from the back.
    layout
        .placements
        .iter()
        .rev()
        .filter(|p| p.is_visible())
        .find(|p| p.rect.contains_point(x, y))
}

/// Tick interval in years for the given zoom.
fn year_step(pixels_per_day: f64) -> i32 {
    let pixels_per_year = pixels_per_day * 365.25;
    YEAR_STEPS
        .iter()
        .copied()
        .find(|&step| step as f64 * pixels_per_year >= MIN_TICK_SPACING as f64)
        .unwrap_or(YEAR_STEPS[YEAR_STEPS.len() - 1])
}

fn to_color32(rgb: Option<[u8; 3]>) -> Color32 {
    rgb.map(|c| Color32::from_rgb(c[0], c[1], c[2]))
        .unwrap_or(DEFAULT_EVENT_COLOR)
}

/// Timeline renderer for one frame.
pub struct TimelineRenderer<'a> {
    dataset: &'a Dataset,
    settings: &'a LayoutSettings,
    view: &'a mut TimelineView,
    /// Visible timelines in row order
    rows: Vec<&'a TimelineRow>,
}

impl<'a> TimelineRenderer<'a> {
    pub fn new(dataset: &'a Dataset, settings: &'a LayoutSettings, view: &'a mut TimelineView) -> Self {
        let rows = dataset.timelines.iter().filter(|r| r.is_visible).collect();
        Self {
            dataset,
            settings,
            view,
            rows,
        }
    }

    /// Lay out and draw the timeline, then apply this frame's input.
    pub fn render(&mut self, ui: &mut egui::Ui) -> Result<(), LayoutError> {
        let available = ui.available_size();
        let size = egui::vec2((available.x - 10.0).max(LABEL_WIDTH + 1.0), (available.y - 10.0).max(HEADER_HEIGHT + 1.0));
        if self.view.needs_fit {
            self.view.fit(self.dataset, size.x - LABEL_WIDTH);
        }

        let measure = PainterMeasure::new(ui.painter().clone());
        let mut layout = compute_layout(self.dataset, self.settings, &self.view.scale, &measure)?;
        self.view.expansion.reconcile(&layout.groups);
        self.view.expansion.apply(&mut layout.groups);

        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;
        let timeline_rect = Rect::from_min_max(
            Pos2::new(rect.left() + LABEL_WIDTH, rect.top() + HEADER_HEIGHT),
            rect.max,
        );
        let max_scroll = self.content_height(&layout) - timeline_rect.height();
        self.view.scroll_by(0.0, max_scroll);
        let origin = Pos2::new(timeline_rect.left(), timeline_rect.top() - self.view.scroll_y);

        self.draw_background(&painter, rect);
        self.draw_date_header(&painter, rect, timeline_rect);
        self.draw_rows(&painter, rect, timeline_rect, origin, &layout);
        self.draw_placements(&painter.with_clip_rect(timeline_rect), &layout, origin);

        self.handle_input(ui, &response, &layout, origin, max_scroll);
        self.draw_card(ui.ctx(), &layout, origin);
        Ok(())
    }

    /// Height of everything below the header.
    fn content_height(&self, layout: &Layout) -> f32 {
        let rows = self.rows.len().max(1) as f32 * self.settings.row_height();
        layout
            .placements
            .iter()
            .map(|p| p.rect.y + p.rect.height)
            .fold(rows, f32::max)
            + self.settings.lane_height
    }

    /// Draw the background and border.
    fn draw_background(&self, painter: &Painter, rect: Rect) {
        painter.rect_filled(rect, 0.0, Color32::from_rgb(30, 30, 35));
        painter.rect_stroke(
            rect,
            0.0,
            Stroke::new(1.0, Color32::DARK_GRAY),
            egui::StrokeKind::Inside,
        );
    }

    /// Draw year ticks along the top and faint grid lines below them.
    fn draw_date_header(&self, painter: &Painter, rect: Rect, timeline_rect: Rect) {
        let header_rect = Rect::from_min_max(
            Pos2::new(timeline_rect.left(), rect.top()),
            Pos2::new(rect.right(), timeline_rect.top()),
        );
        painter.rect_filled(header_rect, 0.0, Color32::from_rgb(40, 40, 45));

        let scale = &self.view.scale;
        let (Some(first), Some(last)) = (
            scale.date_from_x(0.0),
            scale.date_from_x(timeline_rect.width()),
        ) else {
            return;
        };

        let step = year_step(scale.pixels_per_day());
        let mut year = first.year().div_euclid(step) * step;
        while year <= last.year() {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 1, 1) {
                let x = timeline_rect.left() + scale.x_from_date(date);
                if x >= timeline_rect.left() && x <= timeline_rect.right() {
                    painter.text(
                        Pos2::new(x + 3.0, header_rect.center().y),
                        egui::Align2::LEFT_CENTER,
                        year.to_string(),
                        egui::FontId::proportional(10.0),
                        Color32::GRAY,
                    );
                    painter.line_segment(
                        [Pos2::new(x, header_rect.top()), Pos2::new(x, rect.bottom())],
                        Stroke::new(0.5, Color32::from_rgb(50, 50, 55)),
                    );
                }
            }
            year += step;
        }

        painter.line_segment(
            [
                Pos2::new(rect.left(), timeline_rect.top()),
                Pos2::new(rect.right(), timeline_rect.top()),
            ],
            Stroke::new(1.0, Color32::DARK_GRAY),
        );
    }

    /// Draw the label column and the row separators.
    fn draw_rows(&self, painter: &Painter, rect: Rect, timeline_rect: Rect, origin: Pos2, layout: &Layout) {
        let label_rect = Rect::from_min_max(
            Pos2::new(rect.left(), timeline_rect.top()),
            Pos2::new(timeline_rect.left(), rect.bottom()),
        );
        painter.rect_filled(label_rect, 0.0, Color32::from_rgb(35, 35, 40));
        painter.line_segment(
            [
                Pos2::new(label_rect.right(), rect.top()),
                Pos2::new(label_rect.right(), rect.bottom()),
            ],
            Stroke::new(1.0, Color32::DARK_GRAY),
        );

        let painter = painter.with_clip_rect(Rect::from_min_max(label_rect.min, rect.max));
        let row_height = self.settings.row_height();
        let label = |y: f32, name: &str, color: Color32| {
            painter.rect_filled(
                Rect::from_min_size(Pos2::new(rect.left() + 6.0, y - 4.0), egui::vec2(8.0, 8.0)),
                2.0,
                color,
            );
            painter.text(
                Pos2::new(rect.left() + 20.0, y),
                egui::Align2::LEFT_CENTER,
                name,
                egui::FontId::proportional(12.0),
                Color32::LIGHT_GRAY,
            );
        };

        if self.rows.is_empty() {
            let name = self.dataset.title.as_deref().unwrap_or("Events");
            label(origin.y + self.settings.row_y(0) + row_height / 2.0, name, DEFAULT_EVENT_COLOR);
            return;
        }

        for (index, row) in self.rows.iter().enumerate() {
            let top = origin.y + self.settings.row_y(index);
            label(top + row_height / 2.0, &row.name, to_color32(row.color));
            painter.line_segment(
                [
                    Pos2::new(rect.left(), top + row_height),
                    Pos2::new(rect.right(), top + row_height),
                ],
                Stroke::new(0.5, Color32::from_rgb(50, 50, 55)),
            );
        }

        let has_main = layout
            .placements
            .iter()
            .any(|p| matches!(p.slot, Slot::Main { .. } | Slot::MainOverflow));
        if has_main {
            let top = origin.y + self.settings.row_y(self.rows.len()) + self.settings.main_row_y;
            label(top + self.settings.lane_height / 2.0, "Other", DEFAULT_EVENT_COLOR);
        }
    }

    /// Draw standalone events and group markers.
    fn draw_placements(&self, painter: &Painter, layout: &Layout, origin: Pos2) {
        for placement in layout.visible() {
            let r = placement.rect;
            let rect = Rect::from_min_size(
                origin + egui::vec2(r.x1, r.y),
                egui::vec2(r.x2 - r.x1, r.height),
            )
            .shrink(CELL_PADDING);
            if !painter.clip_rect().intersects(rect) {
                continue;
            }

            match &placement.subject {
                Subject::Event(id) => {
                    let Some(event) = self.dataset.event(*id) else {
                        continue;
                    };
                    let color = match placement.slot {
                        Slot::RowLane { row, .. } => {
                            to_color32(self.rows.get(row).and_then(|r| r.color))
                        }
                        Slot::MainOverflow => OVERFLOW_COLOR,
                        Slot::Lane { .. } | Slot::Main { .. } => DEFAULT_EVENT_COLOR,
                    };
                    painter.rect_filled(rect, 3.0, color.gamma_multiply(0.85));
                    self.draw_label(painter, rect, &event.label, Color32::WHITE);
                }
                Subject::GroupMarker { group, .. } => {
                    let expanded = layout.group(*group).is_some_and(|g| g.is_expanded);
                    let stroke = if expanded {
                        Stroke::new(2.0, EXPANDED_COLOR)
                    } else {
                        Stroke::new(1.0, Color32::GRAY)
                    };
                    painter.rect_filled(rect, 6.0, Color32::from_rgb(55, 55, 62));
                    painter.rect_stroke(rect, 6.0, stroke, egui::StrokeKind::Inside);
                    let text = placement
                        .marker_label()
                        .map(|count| format!("{} events", count))
                        .unwrap_or_default();
                    self.draw_label(painter, rect, &text, Color32::LIGHT_GRAY);
                }
            }
        }
    }

    fn draw_label(&self, painter: &Painter, rect: Rect, text: &str, color: Color32) {
        painter.with_clip_rect(rect.intersect(painter.clip_rect())).text(
            Pos2::new(rect.left() + LABEL_PADDING - CELL_PADDING, rect.center().y),
            egui::Align2::LEFT_CENTER,
            text,
            egui::FontId::proportional(EVENT_FONT_SIZE),
            color,
        );
    }

    /// Clicks toggle groups, drags pan, the wheel scrolls and ctrl+wheel zooms.
    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        layout: &Layout,
        origin: Pos2,
        max_scroll: f32,
    ) {
        if response.clicked()
            && let Some(pos) = response.interact_pointer_pos()
        {
            let local = pos - origin;
            let group = placement_at(layout, local.x, local.y).and_then(|p| match p.subject {
                Subject::GroupMarker { group, .. } => layout.group(group),
                Subject::Event(_) => None,
            });
            match group {
                Some(group) => {
                    let expanded = self.view.expansion.toggle(group);
                    debug!(group = %group.id, members = group.len(), expanded, "group toggled");
                }
                None => self.view.expansion.close_all(),
            }
        }

        if response.dragged() {
            let delta = response.drag_delta();
            self.view.scale.pan_by(delta.x);
            self.view.scroll_by(-delta.y, max_scroll);
        }

        if response.hovered() {
            let (scroll, zoom) = ui.input(|i| (i.smooth_scroll_delta, i.zoom_delta()));
            if zoom != 1.0 {
                if let Some(pos) = response.hover_pos() {
                    self.view.scale.zoom_about(pos.x - origin.x, zoom as f64);
                }
            } else if scroll != Vec2::ZERO {
                self.view.scale.pan_by(scroll.x);
                self.view.scroll_by(-scroll.y, max_scroll);
            }
        }

        if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.view.expansion.close_all();
        }
    }

    /// Draw the detail card for the expanded group, if any.
    fn draw_card(&mut self, ctx: &egui::Context, layout: &Layout, origin: Pos2) {
        let Some(group) = self.view.expansion.expanded().and_then(|id| layout.group(id)) else {
            return;
        };
        let Some(card) = self.view.expansion.card_position() else {
            return;
        };

        let dataset = self.dataset;
        let pos = origin + egui::vec2(card.x, card.y + self.settings.lane_height);
        let mut drag = Vec2::ZERO;
        let mut close = false;

        egui::Area::new(egui::Id::new("group_card"))
            .order(egui::Order::Foreground)
            .fixed_pos(pos)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(CARD_WIDTH);
                    ui.horizontal(|ui| {
                        let handle = ui
                            .add(
                                egui::Label::new(
                                    egui::RichText::new(format!("{} events", group.len())).strong(),
                                )
                                .sense(egui::Sense::drag()),
                            )
                            .on_hover_cursor(egui::CursorIcon::Grab);
                        if handle.dragged() {
                            drag = handle.drag_delta();
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✕").clicked() {
                                close = true;
                            }
                        });
                    });
                    ui.separator();

                    egui::ScrollArea::vertical()
                        .max_height(CARD_LIST_HEIGHT)
                        .show(ui, |ui| {
                            for id in &group.members {
                                let Some(event) = dataset.event(*id) else {
                                    continue;
                                };
                                ui.horizontal(|ui| {
                                    ui.label(
                                        egui::RichText::new(event.date.format("%Y-%m-%d").to_string())
                                            .monospace()
                                            .color(Color32::GRAY),
                                    );
                                    ui.label(&event.label);
                                });
                            }
                        });
                });
            });

        if close {
            self.view.expansion.close_all();
        } else if drag != Vec2::ZERO {
            self.view.expansion.move_card(drag.x, drag.y);
        }
    }
}
