//! Main application state and GUI logic.
//!
//! This module defines the main application struct and implements the eframe::App trait
//! to provide the core GUI functionality for the event timeline viewer.

use eframe::egui;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::config::AppSettings;
use crate::core::error::{self, AppError};
use crate::core::event::Dataset;
use crate::core::parser;

use super::dialogs::{ErrorDialogAction, ErrorDialogRenderer, ErrorDialogState};
use super::timeline::{TimelineRenderer, TimelineView};

/// Zoom step for the toolbar buttons and keyboard shortcuts.
const ZOOM_STEP: f64 = 1.5;

/// Application state indicating the current loading status.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum AppState {
    /// No file has been loaded yet (initial state)
    #[default]
    NoFileLoaded,
    /// A dataset is loaded and laid out
    Ready,
    /// The error dialog is open
    Error,
}

impl AppState {
    /// Returns true if view controls (fit, zoom, rows) should be enabled.
    pub fn view_controls_enabled(&self) -> bool {
        matches!(self, AppState::Ready)
    }

    /// Returns true if the timeline should be displayed.
    pub fn show_timeline(&self) -> bool {
        matches!(self, AppState::Ready)
    }
}

/// Kind of status message to display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusKind {
    /// Success message (shown in green)
    Success,
    /// Warning message (shown in amber)
    Warning,
}

/// A status message with its kind and timestamp.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    /// When the message was created (for auto-dismiss)
    pub created_at: std::time::Instant,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: std::time::Instant::now(),
        }
    }

    /// Duration to show status messages before auto-dismissing.
    const DISPLAY_DURATION: std::time::Duration = std::time::Duration::from_secs(5);

    /// Check if the message should still be displayed.
    pub fn is_visible(&self) -> bool {
        self.created_at.elapsed() < Self::DISPLAY_DURATION
    }
}

/// Main application state and GUI logic.
pub struct EventTimelineApp {
    state: AppState,
    /// Loaded dataset (Some when a file was loaded successfully)
    dataset: Option<Dataset>,
    /// Zoom, pan and group expansion for the loaded dataset
    view: Option<TimelineView>,
    /// Path to the currently loaded file
    loaded_file_path: Option<PathBuf>,
    status_message: Option<StatusMessage>,
    settings: AppSettings,
    error_dialog: ErrorDialogState,
}

impl EventTimelineApp {
    /// Create a new application instance, optionally loading `initial_file`.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: AppSettings,
        initial_file: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            state: AppState::NoFileLoaded,
            dataset: None,
            view: None,
            loaded_file_path: None,
            status_message: None,
            settings,
            error_dialog: ErrorDialogState::new(),
        };
        if let Some(path) = initial_file {
            app.load_file(path);
        }
        app
    }

    /// Open a file dialog and load the selected dataset.
    fn open_file_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Timeline JSON", &["tlj", "json"])
            .set_title("Open Timeline Dataset")
            .pick_file()
        {
            self.load_file(path);
        }
    }

    /// Load a dataset file from the given path.
    fn load_file(&mut self, path: PathBuf) {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                self.show_error(error::from_io_error(path, e));
                return;
            }
        };
        let dataset = match parser::parse_json(&content) {
            Ok(dataset) => dataset,
            Err(e) => {
                self.show_error(error::from_parse_error(Some(path), &e));
                return;
            }
        };

        info!(
            path = %path.display(),
            events = dataset.events.len(),
            timelines = dataset.timelines.len(),
            "dataset loaded"
        );
        self.status_message = Some(StatusMessage::new(
            format!(
                "Loaded: {} ({} events, {} timelines)",
                file_name(&path),
                dataset.events.len(),
                dataset.timelines.len()
            ),
            StatusKind::Success,
        ));

        self.view = Some(TimelineView::new(&dataset, self.settings.pixels_per_day));
        self.dataset = Some(dataset);
        self.settings.add_recent_file(path.clone());
        self.loaded_file_path = Some(path);
        self.state = AppState::Ready;
        self.save_settings();
    }

    fn save_settings(&mut self) {
        if let Err(e) = self.settings.save() {
            warn!(error = %e.brief_description(), "settings not saved");
            self.status_message = Some(StatusMessage::new(e.brief_description(), StatusKind::Warning));
        }
    }

    /// Open the error dialog.
    fn show_error(&mut self, error: AppError) {
        warn!(error = %error.detailed_info(), "showing error");
        self.state = AppState::Error;
        self.error_dialog.show(error);
    }

    /// Return to the state matching what is loaded.
    fn clear_error(&mut self) {
        self.state = if self.dataset.is_some() {
            AppState::Ready
        } else {
            AppState::NoFileLoaded
        };
    }

    /// Remember zoom and window size when the window is closing.
    fn remember_view(&mut self, ctx: &egui::Context) {
        let (closing, inner) = ctx.input(|i| (i.viewport().close_requested(), i.viewport().inner_rect));
        if !closing {
            return;
        }
        if let Some(view) = &self.view {
            self.settings.pixels_per_day = view.scale.pixels_per_day();
        }
        if let Some(rect) = inner {
            self.settings.set_window_size(rect.width(), rect.height());
        }
        self.save_settings();
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string())
}

impl eframe::App for EventTimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.handle_keyboard_shortcuts(ctx);

        self.render_toolbar(ctx);
        self.render_timeline(ctx);
        self.render_error_dialog(ctx);

        self.remember_view(ctx);
    }
}

impl EventTimelineApp {
    /// Load the first file dropped onto the window.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.load_file(path);
        }
    }

    /// Ctrl+O opens a file; F fits; +/- zoom; 0 restores the saved zoom.
    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        if self.error_dialog.has_error() || ctx.wants_keyboard_input() {
            return;
        }

        let (open, fit, zoom_in, zoom_out, reset) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::O),
                i.key_pressed(egui::Key::F),
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::Num0),
            )
        });

        if open {
            self.open_file_dialog();
        }
        let center = ctx.input(|i| i.viewport_rect().width()) / 2.0;
        if let Some(view) = self.view.as_mut().filter(|_| self.state.view_controls_enabled()) {
            if fit {
                view.request_fit();
            }
            if zoom_in {
                view.scale.zoom_about(center, ZOOM_STEP);
            }
            if zoom_out {
                view.scale.zoom_about(center, 1.0 / ZOOM_STEP);
            }
            if reset {
                view.set_zoom(self.settings.pixels_per_day, center);
            }
        }
    }

    /// Render the top toolbar section.
    fn render_toolbar(&mut self, ctx: &egui::Context) {
        let controls_enabled = self.state.view_controls_enabled();
        let mut open_path: Option<PathBuf> = None;
        let mut open_dialog = false;

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Event Timeline Viewer");
                ui.separator();

                if ui.button("📂 Open File").clicked() {
                    open_dialog = true;
                }

                ui.add_enabled_ui(!self.settings.recent_files.is_empty(), |ui| {
                    ui.menu_button("Recent", |ui| {
                        for path in &self.settings.recent_files {
                            if ui.button(file_name(path)).on_hover_text(path.display().to_string()).clicked() {
                                open_path = Some(path.clone());
                                ui.close();
                            }
                        }
                    });
                });

                ui.separator();

                ui.add_enabled_ui(controls_enabled, |ui| {
                    if let Some(view) = self.view.as_mut() {
                        if ui.button("Fit").on_hover_text("Show the whole date range (F)").clicked() {
                            view.request_fit();
                        }
                        let center = ui.ctx().input(|i| i.viewport_rect().width()) / 2.0;
                        if ui.button("➕").on_hover_text("Zoom in (+)").clicked() {
                            view.scale.zoom_about(center, ZOOM_STEP);
                        }
                        if ui.button("➖").on_hover_text("Zoom out (-)").clicked() {
                            view.scale.zoom_about(center, 1.0 / ZOOM_STEP);
                        }
                    }

                    if let Some(dataset) = self.dataset.as_mut()
                        && !dataset.timelines.is_empty()
                    {
                        ui.menu_button("Rows", |ui| {
                            for timeline in &mut dataset.timelines {
                                ui.checkbox(&mut timeline.is_visible, timeline.name.as_str());
                            }
                        });
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    self.render_status_message(ui);
                });
            });
        });

        if open_dialog {
            self.open_file_dialog();
        } else if let Some(path) = open_path {
            self.load_file(path);
        }
    }

    /// Render the status message if one is active.
    fn render_status_message(&mut self, ui: &mut egui::Ui) {
        if self
            .status_message
            .as_ref()
            .is_some_and(|msg| !msg.is_visible())
        {
            self.status_message = None;
            return;
        }

        let msg_info = self.status_message.as_ref().map(|msg| {
            let color = match msg.kind {
                StatusKind::Success => egui::Color32::from_rgb(76, 175, 80),
                StatusKind::Warning => egui::Color32::from_rgb(255, 193, 7),
            };
            (color, msg.text.clone())
        });

        if let Some((color, text)) = msg_info {
            let mut dismiss_clicked = false;
            ui.horizontal(|ui| {
                if ui.small_button("✕").clicked() {
                    dismiss_clicked = true;
                }
                ui.colored_label(color, &text);
            });
            if dismiss_clicked {
                self.status_message = None;
            }
        }
    }

    /// Render the center timeline section.
    fn render_timeline(&mut self, ctx: &egui::Context) {
        let mut layout_error = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            match (&self.dataset, self.view.as_mut()) {
                (Some(dataset), Some(view)) if self.state.show_timeline() => {
                    Self::render_header(ui, dataset, self.loaded_file_path.as_deref());
                    let mut renderer = TimelineRenderer::new(dataset, &self.settings.layout, view);
                    if let Err(e) = renderer.render(ui) {
                        layout_error = Some(e);
                    }
                }
                _ => Self::render_no_file_placeholder(ui),
            }
        });

        if let Some(e) = layout_error {
            // The dataset cannot be shown with these settings; drop it.
            self.dataset = None;
            self.view = None;
            self.show_error(AppError::from(e));
        }
    }

    /// Render the dataset summary above the timeline.
    fn render_header(ui: &mut egui::Ui, dataset: &Dataset, path: Option<&std::path::Path>) {
        ui.horizontal(|ui| {
            ui.heading(dataset.title.as_deref().unwrap_or("Timeline"));
            ui.separator();

            if let Some(path) = path {
                ui.label(format!("File: {}", file_name(path)));
                ui.separator();
            }

            ui.label(format!("Events: {}", dataset.events.len()));
            if let Some((first, last)) = dataset.date_range() {
                ui.separator();
                ui.label(format!("{} – {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d")));
            }
        });
        ui.separator();
        ui.add_space(5.0);
    }

    /// Render the placeholder view when no file is loaded.
    fn render_no_file_placeholder(ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("📁 No Dataset Loaded");
            ui.add_space(10.0);
            ui.label("Drag and drop a timeline file (.tlj) to get started.");
            ui.label("Or use the \"Open File\" button in the toolbar.");
        });
    }

    /// Render the error dialog and act on its buttons.
    fn render_error_dialog(&mut self, ctx: &egui::Context) {
        let retry_path = self
            .error_dialog
            .error
            .as_ref()
            .and_then(|e| e.file_path().cloned());

        let action = ErrorDialogRenderer::new(&mut self.error_dialog).render(ctx);
        match action {
            Some(ErrorDialogAction::Retry) => {
                self.clear_error();
                if let Some(path) = retry_path {
                    self.load_file(path);
                }
            }
            Some(ErrorDialogAction::OpenOther) => {
                self.clear_error();
                self.open_file_dialog();
            }
            Some(ErrorDialogAction::Close) => self.clear_error(),
            None => {}
        }
    }
}
