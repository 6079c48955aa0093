//! Label width measurement.

use super::event::Event;

/// Measures the rendered width of a label in pixels.
pub trait TextMeasure {
    /// Width of `label`, or `None` when measurement is unavailable.
    fn measure(&self, label: &str) -> Option<f32>;
}

/// Measurement that is never available; every event gets the default width.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unmeasured;

impl TextMeasure for Unmeasured {
    fn measure(&self, _label: &str) -> Option<f32> {
        None
    }
}

/// Approximate measurement: a fixed advance per character plus side padding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvance {
    pub char_width: f32,
    pub padding: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            padding: 12.0,
        }
    }
}

impl TextMeasure for FixedAdvance {
    fn measure(&self, label: &str) -> Option<f32> {
        Some(label.chars().count() as f32 * self.char_width + self.padding * 2.0)
    }
}

/// Collision width of an event.
///
/// An explicit `Event::width` wins, then the measurer, then `default_width`.
pub fn event_width<M: TextMeasure + ?Sized>(event: &Event, measure: &M, default_width: f32) -> f32 {
    event
        .width
        .or_else(|| measure.measure(&event.label))
        .unwrap_or(default_width)
}
