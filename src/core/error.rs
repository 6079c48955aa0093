//! Error types.
//!
//! `LayoutError` is returned by the layout entry points when their inputs
//! violate a precondition. `AppError` is what the viewer shows to users in
//! its error dialog, with detailed information and recovery options.

use std::path::PathBuf;
use thiserror::Error;

use super::event::EventId;

/// Rejected layout input.
///
/// Layout fails fast: inputs are validated before any placement work, so an
/// error never comes with a partial layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The coordinate mapper produced NaN or an infinity for an event
    #[error("event {event_id} mapped to a non-finite x coordinate ({value})")]
    NonFiniteCoordinate { event_id: EventId, value: f32 },

    /// An event width is non-finite, zero or negative
    #[error("event {event_id} has invalid width {width}")]
    InvalidWidth { event_id: EventId, width: f32 },

    /// A layout setting is out of range
    #[error("invalid layout setting {field} = {value}")]
    InvalidSettings { field: &'static str, value: f32 },
}

/// Application-level errors that can be displayed to users.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// File was not found at the specified path
    #[error("File not found")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// File exists but cannot be read (permissions, locked, etc.)
    #[error("Cannot read file")]
    FileReadError {
        /// Path to the file that could not be read
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// File format is invalid or corrupted
    #[error("Invalid file format")]
    InvalidFormat {
        /// Path to the file with invalid format
        path: Option<PathBuf>,
        /// Description of what's wrong
        message: String,
        /// Line number where the error occurred (1-indexed)
        line: Option<usize>,
        /// Column where the error occurred
        column: Option<usize>,
    },

    /// File version is not supported
    #[error("Unsupported version")]
    UnsupportedVersion {
        path: Option<PathBuf>,
        found: u32,
        supported: u32,
    },

    /// The loaded data could not be laid out
    #[error("Layout failed")]
    Layout(#[from] LayoutError),

    /// Settings could not be saved
    #[error("Settings save error")]
    SettingsSaveError {
        /// Description of the failure
        reason: String,
    },
}

impl AppError {
    /// Returns true if this error supports retry operation.
    pub fn supports_retry(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::FileReadError { .. }
        )
    }

    /// Get the file path associated with this error, if any.
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            Self::FileNotFound { path } | Self::FileReadError { path, .. } => Some(path),
            Self::InvalidFormat { path, .. } | Self::UnsupportedVersion { path, .. } => {
                path.as_ref()
            }
            Self::Layout(_) | Self::SettingsSaveError { .. } => None,
        }
    }

    /// Get the title for the error dialog.
    pub fn dialog_title(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "File Not Found",
            Self::FileReadError { .. } => "Cannot Read File",
            Self::InvalidFormat { .. } => "Invalid File Format",
            Self::UnsupportedVersion { .. } => "Unsupported Version",
            Self::Layout(_) => "Layout Error",
            Self::SettingsSaveError { .. } => "Settings Error",
        }
    }

    /// Get a brief description of the error suitable for display.
    pub fn brief_description(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!("The file '{}' could not be found.", display_name(path))
            }
            Self::FileReadError { path, .. } => {
                format!("Could not read the file '{}'.", display_name(path))
            }
            Self::InvalidFormat { message, .. } => message.clone(),
            Self::UnsupportedVersion {
                found, supported, ..
            } => {
                format!(
                    "File version {} is not supported. This viewer supports version {}.",
                    found, supported
                )
            }
            Self::Layout(e) => e.to_string(),
            Self::SettingsSaveError { reason } => format!("Could not save settings: {}", reason),
        }
    }

    /// Get detailed error information for bug reports.
    pub fn detailed_info(&self) -> String {
        let mut lines = vec![
            format!("Error Type: {}", self.dialog_title()),
            format!("Description: {}", self.brief_description()),
        ];

        match self {
            Self::FileNotFound { path } => {
                lines.push(format!("Full Path: {}", path.display()));
            }
            Self::FileReadError { path, reason } => {
                lines.push(format!("Full Path: {}", path.display()));
                lines.push(format!("Reason: {}", reason));
            }
            Self::InvalidFormat {
                path, line, column, ..
            } => {
                if let Some(p) = path {
                    lines.push(format!("File: {}", p.display()));
                }
                if let Some(l) = line {
                    lines.push(format!("Line: {}", l));
                }
                if let Some(c) = column {
                    lines.push(format!("Column: {}", c));
                }
            }
            Self::UnsupportedVersion { path, found, .. } => {
                if let Some(p) = path {
                    lines.push(format!("File: {}", p.display()));
                }
                lines.push(format!("Found Version: {}", found));
            }
            Self::Layout(e) => {
                lines.push(format!("Details: {:?}", e));
            }
            Self::SettingsSaveError { reason } => {
                lines.push(format!("Details: {}", reason));
            }
        }

        lines.join("\n")
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Create an AppError from a file path and I/O error.
pub fn from_io_error(path: PathBuf, error: std::io::Error) -> AppError {
    match error.kind() {
        std::io::ErrorKind::NotFound => AppError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => AppError::FileReadError {
            path,
            reason: "Permission denied".to_string(),
        },
        _ => AppError::FileReadError {
            path,
            reason: error.to_string(),
        },
    }
}

/// Create an AppError from a dataset parse error with optional path context.
pub fn from_parse_error(path: Option<PathBuf>, error: &super::parser::ParseError) -> AppError {
    use super::parser::ParseError;

    match error {
        ParseError::JsonSyntax(e) => {
            // serde_json reports line 0 when no position applies
            let line = Some(e.line()).filter(|&l| l > 0);
            let column = Some(e.column()).filter(|&c| c > 0);
            AppError::InvalidFormat {
                path,
                message: e.to_string(),
                line,
                column,
            }
        }
        ParseError::UnsupportedVersion { version } => AppError::UnsupportedVersion {
            path,
            found: *version,
            supported: super::parser::SUPPORTED_VERSION,
        },
        other => AppError::InvalidFormat {
            path,
            message: other.to_string(),
            line: None,
            column: None,
        },
    }
}
