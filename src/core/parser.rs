//! JSON parser for timeline dataset files (.tlj format).
//!
//! Parses a dataset into `Dataset`, checking cross references between
//! timelines and events so the layout never sees a dangling id.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use super::event::{Dataset, Event, EventId, TimelineRow};

/// Only format version this build reads.
pub const SUPPORTED_VERSION: u32 = 1;

/// Errors that can occur during dataset parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON syntax error
    #[error("Invalid JSON syntax: {0}")]
    JsonSyntax(#[from] serde_json::Error),

    /// Unsupported format version
    #[error("Unsupported format version {version}: expected version 1")]
    UnsupportedVersion { version: u32 },

    /// Invalid hex color format
    #[error("Invalid color format '{value}': expected hex color like #RRGGBB")]
    InvalidColor { value: String },

    /// Date not in YYYY-MM-DD form
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// Width that is not a finite positive number
    #[error("Invalid width {width} for event {id}")]
    InvalidWidth { id: u64, width: f32 },

    /// Two events share an id
    #[error("Duplicate event id {id}")]
    DuplicateEventId { id: u64 },

    /// A timeline references an event that does not exist
    #[error("Timeline '{timeline}' references unknown event {id}")]
    UnknownEvent { timeline: String, id: u64 },
}

/// Top-level JSON structure for .tlj files.
#[derive(Debug, Deserialize)]
struct JsonDataset {
    version: u32,
    #[serde(default)]
    title: Option<String>,
    events: Vec<JsonEvent>,
    #[serde(default)]
    timelines: Vec<JsonTimeline>,
}

#[derive(Debug, Deserialize)]
struct JsonEvent {
    id: u64,
    date: String,
    label: String,
    #[serde(default)]
    width: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct JsonTimeline {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    events: Vec<u64>,
    #[serde(default)]
    visible: Option<bool>,
}

/// Parse a JSON string into a `Dataset`.
///
/// # Example
/// ```ignore
/// let json = r#"{"version": 1, "events": [...], "timelines": [...]}"#;
/// let dataset = parse_json(json)?;
/// ```
pub fn parse_json(content: &str) -> Result<Dataset, ParseError> {
    let json: JsonDataset = serde_json::from_str(content)?;

    if json.version != SUPPORTED_VERSION {
        return Err(ParseError::UnsupportedVersion {
            version: json.version,
        });
    }

    let mut seen = HashSet::with_capacity(json.events.len());
    let mut events = Vec::with_capacity(json.events.len());
    for event in json.events {
        if !seen.insert(event.id) {
            return Err(ParseError::DuplicateEventId { id: event.id });
        }
        events.push(convert_event(event)?);
    }

    let timelines = json
        .timelines
        .into_iter()
        .map(|timeline| convert_timeline(timeline, &seen))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dataset {
        title: json.title,
        events,
        timelines,
    })
}

fn convert_event(json: JsonEvent) -> Result<Event, ParseError> {
    let date = parse_date(&json.date)?;
    if let Some(width) = json.width.filter(|w| !(w.is_finite() && *w > 0.0)) {
        return Err(ParseError::InvalidWidth { id: json.id, width });
    }

    Ok(Event {
        id: EventId(json.id),
        date,
        label: json.label,
        width: json.width,
    })
}

fn convert_timeline(json: JsonTimeline, known: &HashSet<u64>) -> Result<TimelineRow, ParseError> {
    if let Some(&id) = json.events.iter().find(|id| !known.contains(id)) {
        return Err(ParseError::UnknownEvent {
            timeline: json.id,
            id,
        });
    }

    let color = match json.color {
        Some(hex) => Some(parse_hex_color(&hex)?),
        None => None,
    };

    Ok(TimelineRow {
        name: json.name.unwrap_or_else(|| json.id.clone()),
        id: json.id,
        color,
        events: json.events.into_iter().map(EventId).collect(),
        is_visible: json.visible.unwrap_or(true),
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ParseError::InvalidDate {
        value: value.to_string(),
    })
}

/// Parse a hex color string (e.g., "#FF5555") into RGB bytes.
fn parse_hex_color(hex: &str) -> Result<[u8; 3], ParseError> {
    let digits = hex.trim_start_matches('#');
    let invalid = || ParseError::InvalidColor {
        value: hex.to_string(),
    };

    if digits.len() != 6 || !digits.is_ascii() {
        return Err(invalid());
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color_valid() {
        assert_eq!(parse_hex_color("#FF5555").unwrap(), [255, 85, 85]);
        assert_eq!(parse_hex_color("#4CAF50").unwrap(), [76, 175, 80]);
        // Without leading #
        assert_eq!(parse_hex_color("2196F3").unwrap(), [33, 150, 243]);
    }

    #[test]
    fn test_parse_hex_color_invalid() {
        assert!(parse_hex_color("#FFF").is_err()); // Too short
        assert!(parse_hex_color("#FFFFFFF").is_err()); // Too long
        assert!(parse_hex_color("#GGGGGG").is_err()); // Invalid hex
        assert!(parse_hex_color("#ÄÄÄ").is_err()); // Multi-byte
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("1969-07-20").unwrap(),
            NaiveDate::from_ymd_opt(1969, 7, 20).unwrap()
        );
        assert!(matches!(
            parse_date("20/07/1969"),
            Err(ParseError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_json_minimal() {
        let json = r#"{ "version": 1, "events": [] }"#;
        let dataset = parse_json(json).unwrap();
        assert!(dataset.title.is_none());
        assert!(dataset.events.is_empty());
        assert!(dataset.timelines.is_empty());
    }

    #[test]
    fn test_parse_json_with_timelines() {
        let json = r##"{
            "version": 1,
            "title": "Space race",
            "events": [
                { "id": 1, "date": "1957-10-04", "label": "Sputnik 1" },
                { "id": 2, "date": "1961-04-12", "label": "Vostok 1", "width": 80.0 },
                { "id": 3, "date": "1969-07-20", "label": "Apollo 11" }
            ],
            "timelines": [
                { "id": "ussr", "name": "Soviet Union", "color": "#CC0000", "events": [1, 2] },
                { "id": "usa", "events": [3], "visible": false }
            ]
        }"##;

        let dataset = parse_json(json).unwrap();
        assert_eq!(dataset.title.as_deref(), Some("Space race"));
        assert_eq!(dataset.events.len(), 3);
        assert_eq!(dataset.events[1].width, Some(80.0));
        assert_eq!(dataset.events[2].label, "Apollo 11");

        let ussr = &dataset.timelines[0];
        assert_eq!(ussr.name, "Soviet Union");
        assert_eq!(ussr.color, Some([204, 0, 0]));
        assert_eq!(ussr.events, vec![EventId(1), EventId(2)]);
        assert!(ussr.is_visible);

        let usa = &dataset.timelines[1];
        assert_eq!(usa.name, "usa");
        assert!(!usa.is_visible);
    }

    #[test]
    fn test_parse_json_invalid_syntax() {
        let result = parse_json("{ invalid json }");
        assert!(matches!(result.unwrap_err(), ParseError::JsonSyntax(_)));
    }

    #[test]
    fn test_parse_json_unsupported_version() {
        let json = r#"{ "version": 99, "events": [] }"#;
        assert!(matches!(
            parse_json(json).unwrap_err(),
            ParseError::UnsupportedVersion { version: 99 }
        ));
    }

    #[test]
    fn test_parse_json_duplicate_event() {
        let json = r#"{
            "version": 1,
            "events": [
                { "id": 4, "date": "2000-01-01", "label": "a" },
                { "id": 4, "date": "2000-01-02", "label": "b" }
            ]
        }"#;
        assert!(matches!(
            parse_json(json).unwrap_err(),
            ParseError::DuplicateEventId { id: 4 }
        ));
    }

    #[test]
    fn test_parse_json_unknown_event_reference() {
        let json = r#"{
            "version": 1,
            "events": [{ "id": 1, "date": "2000-01-01", "label": "a" }],
            "timelines": [{ "id": "t", "events": [1, 9] }]
        }"#;
        match parse_json(json).unwrap_err() {
            ParseError::UnknownEvent { timeline, id } => {
                assert_eq!(timeline, "t");
                assert_eq!(id, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_json_invalid_width() {
        let json = r#"{
            "version": 1,
            "events": [{ "id": 1, "date": "2000-01-01", "label": "a", "width": -5.0 }]
        }"#;
        assert!(matches!(
            parse_json(json).unwrap_err(),
            ParseError::InvalidWidth { id: 1, .. }
        ));
    }

    #[test]
    fn test_parse_json_invalid_color() {
        let json = r#"{
            "version": 1,
            "events": [],
            "timelines": [{ "id": "t", "color": "invalid" }]
        }"#;
        assert!(matches!(
            parse_json(json).unwrap_err(),
            ParseError::InvalidColor { .. }
        ));
    }

    #[test]
    fn test_parse_sample_tlj() {
        let content = include_str!("../../assets/sample.tlj");
        let dataset = parse_json(content).expect("Failed to parse sample.tlj");

        assert_eq!(dataset.title.as_deref(), Some("Early spaceflight"));
        assert_eq!(dataset.events.len(), 12);
        assert_eq!(dataset.timelines.len(), 3);
        // Every referenced event resolves
        for timeline in &dataset.timelines {
            for id in &timeline.events {
                assert!(dataset.event(*id).is_some());
            }
        }
    }
}
