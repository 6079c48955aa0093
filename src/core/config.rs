//! Configuration and settings module.
//!
//! `LayoutSettings` collects every constant the layout engine uses so callers
//! can tune grouping behaviour without touching the algorithms.
//! `AppSettings` is the viewer's persistent configuration, saved to the
//! user's config directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{AppError, LayoutError};
use super::scale::DEFAULT_PIXELS_PER_DAY;

/// Settings filename for persistence.
const SETTINGS_FILENAME: &str = "config.json";

/// Maximum number of recent files to track.
const MAX_RECENT_FILES: usize = 10;

/// Number of lanes in every row.
pub const LANES_PER_ROW: usize = 3;

/// Lane preference order: centre, above, below.
pub const LANE_ORDER: [usize; LANES_PER_ROW] = [1, 0, 2];

/// The lane groups live in.
pub const OVERFLOW_LANE: usize = 1;

/// Stacking cap for the main row.
pub const MAX_MAIN_LEVELS: usize = 50;

/// Geometry and tuning constants for the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Height of one lane in pixels
    pub lane_height: f32,
    /// Width used when an event has no explicit width and measurement is unavailable
    pub default_event_width: f32,
    /// Padding added around the union of a group's members
    pub group_padding: f32,
    /// Horizontal gap added to the event width when bucketing deferred events
    pub bucket_gap: f32,
    /// Top of the first timeline row
    pub first_row_y: f32,
    /// Top of the main row's first level
    pub main_row_y: f32,
    /// Stacking cap for events that belong to no timeline
    pub max_main_levels: usize,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            lane_height: 24.0,
            default_event_width: 120.0,
            group_padding: 8.0,
            bucket_gap: 16.0,
            first_row_y: 0.0,
            main_row_y: 0.0,
            max_main_levels: MAX_MAIN_LEVELS,
        }
    }
}

impl LayoutSettings {
    /// Height of one timeline row.
    pub fn row_height(&self) -> f32 {
        self.lane_height * LANES_PER_ROW as f32
    }

    /// Top of row `row_index`.
    pub fn row_y(&self, row_index: usize) -> f32 {
        self.first_row_y + row_index as f32 * self.row_height()
    }

    /// Width of one deferral bucket.
    pub fn bucket_width(&self) -> f32 {
        self.default_event_width + self.bucket_gap
    }

    /// Reject settings the layout cannot work with.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let positive = [
            ("lane_height", self.lane_height),
            ("default_event_width", self.default_event_width),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutError::InvalidSettings { field, value });
            }
        }

        let non_negative = [
            ("group_padding", self.group_padding),
            ("bucket_gap", self.bucket_gap),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidSettings { field, value });
            }
        }

        for (field, value) in [("first_row_y", self.first_row_y), ("main_row_y", self.main_row_y)] {
            if !value.is_finite() {
                return Err(LayoutError::InvalidSettings { field, value });
            }
        }

        Ok(())
    }
}

/// Application settings persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Layout tuning
    #[serde(default)]
    pub layout: LayoutSettings,

    /// Zoom level to open datasets at
    #[serde(default = "default_pixels_per_day")]
    pub pixels_per_day: f64,

    /// Recently opened files (most recent first).
    #[serde(default)]
    pub recent_files: Vec<PathBuf>,

    /// Window size to restore on startup (width, height).
    #[serde(default)]
    pub window_size: Option<(f32, f32)>,
}

fn default_pixels_per_day() -> f64 {
    DEFAULT_PIXELS_PER_DAY
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            pixels_per_day: default_pixels_per_day(),
            recent_files: Vec::new(),
            window_size: None,
        }
    }
}

impl AppSettings {
    /// Get the settings file path in the user's config directory.
    fn get_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("event-timeline-viewer");
            path.push(SETTINGS_FILENAME);
            path
        })
    }

    /// Load settings from disk, returning defaults if loading fails.
    pub fn load() -> Self {
        let Some(path) = Self::get_settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk.
    pub fn save(&self) -> Result<(), AppError> {
        let path = Self::get_settings_path().ok_or_else(|| AppError::SettingsSaveError {
            reason: "Could not determine config directory".to_string(),
        })?;

        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::SettingsSaveError {
                reason: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| AppError::SettingsSaveError {
                reason: format!("Failed to serialize settings: {}", e),
            })?;

        std::fs::write(&path, content).map_err(|e| AppError::SettingsSaveError {
            reason: format!("Failed to write settings file: {}", e),
        })?;

        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Add a file to the recent files list.
    ///
    /// The file is moved to the front of the list. The list is capped at
    /// MAX_RECENT_FILES entries.
    pub fn add_recent_file(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    /// Set the window size.
    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.window_size = Some((width, height));
    }
}
