//! Date to pixel coordinate mapping.
//!
//! The layout engine only sees this through the `CoordinateMapper` trait.
//! `LinearTimeScale` is the mapping the viewer uses: a fixed origin date,
//! a zoom level in pixels per day and a horizontal pan offset.

use chrono::{NaiveDate, TimeDelta};

/// Smallest allowed zoom (about 1 pixel per 27 years).
pub const MIN_PIXELS_PER_DAY: f64 = 1.0e-4;

/// Largest allowed zoom.
pub const MAX_PIXELS_PER_DAY: f64 = 2000.0;

/// Default zoom (roughly one year per 180 pixels).
pub const DEFAULT_PIXELS_PER_DAY: f64 = 0.5;

/// Maps dates to horizontal pixel coordinates and back.
pub trait CoordinateMapper {
    /// Horizontal pixel coordinate of `date`.
    fn x_from_date(&self, date: NaiveDate) -> f32;

    /// Date at pixel `x`, or `None` if it falls outside the representable range.
    fn date_from_x(&self, x: f32) -> Option<NaiveDate>;
}

impl<F> CoordinateMapper for F
where
    F: Fn(NaiveDate) -> f32,
{
    fn x_from_date(&self, date: NaiveDate) -> f32 {
        self(date)
    }

    fn date_from_x(&self, _x: f32) -> Option<NaiveDate> {
        None
    }
}

/// Linear mapping: `x = days_since(origin) * pixels_per_day + pan_offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearTimeScale {
    origin: NaiveDate,
    pixels_per_day: f64,
    pan_offset: f64,
}

impl LinearTimeScale {
    /// Create a scale anchored at `origin` (which maps to x = 0 before panning).
    pub fn new(origin: NaiveDate, pixels_per_day: f64) -> Self {
        Self {
            origin,
            pixels_per_day: clamp_zoom(pixels_per_day),
            pan_offset: 0.0,
        }
    }

    /// Scale that fits `[first, last]` into `width` pixels.
    pub fn fit(first: NaiveDate, last: NaiveDate, width: f32) -> Self {
        let days = (last - first).num_days().max(1) as f64;
        Self::new(first, width.max(1.0) as f64 / days)
    }

    pub fn pixels_per_day(&self) -> f64 {
        self.pixels_per_day
    }

    pub fn pan_offset(&self) -> f64 {
        self.pan_offset
    }

    /// Shift the view horizontally by `dx` pixels.
    pub fn pan_by(&mut self, dx: f32) {
        self.pan_offset += dx as f64;
    }

    /// Zoom by `factor`, keeping the date under pixel `x` fixed.
    pub fn zoom_about(&mut self, x: f32, factor: f64) {
        let x = x as f64;
        let day_at_x = (x - self.pan_offset) / self.pixels_per_day;
        self.pixels_per_day = clamp_zoom(self.pixels_per_day * factor);
        self.pan_offset = x - day_at_x * self.pixels_per_day;
    }
}

fn clamp_zoom(pixels_per_day: f64) -> f64 {
    if pixels_per_day.is_finite() {
        pixels_per_day.clamp(MIN_PIXELS_PER_DAY, MAX_PIXELS_PER_DAY)
    } else {
        DEFAULT_PIXELS_PER_DAY
    }
}

impl CoordinateMapper for LinearTimeScale {
    fn x_from_date(&self, date: NaiveDate) -> f32 {
        let days = (date - self.origin).num_days() as f64;
        (days * self.pixels_per_day + self.pan_offset) as f32
    }

    fn date_from_x(&self, x: f32) -> Option<NaiveDate> {
        let days = ((x as f64 - self.pan_offset) / self.pixels_per_day).round();
        if !days.is_finite() {
            return None;
        }
        let delta = TimeDelta::try_days(days as i64)?;
        self.origin.checked_add_signed(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let scale = LinearTimeScale::new(date(2000, 1, 1), 2.0);
        assert_eq!(scale.x_from_date(date(2000, 1, 1)), 0.0);
        assert_eq!(scale.x_from_date(date(2000, 1, 11)), 20.0);
        assert_eq!(scale.x_from_date(date(1999, 12, 31)), -2.0);
    }

    #[test]
    fn test_inverse_mapping() {
        let mut scale = LinearTimeScale::new(date(1900, 1, 1), 0.25);
        scale.pan_by(-300.0);
        let d = date(1950, 5, 17);
        let x = scale.x_from_date(d);
        assert_eq!(scale.date_from_x(x), Some(d));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut scale = LinearTimeScale::new(date(2000, 1, 1), 1.0);
        let anchor = date(2000, 4, 10);
        let x = scale.x_from_date(anchor);
        scale.zoom_about(x, 4.0);
        assert_eq!(scale.pixels_per_day(), 4.0);
        assert!((scale.x_from_date(anchor) - x).abs() < 0.01);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut scale = LinearTimeScale::new(date(2000, 1, 1), 1.0);
        scale.zoom_about(0.0, 1.0e9);
        assert_eq!(scale.pixels_per_day(), MAX_PIXELS_PER_DAY);
        let scale = LinearTimeScale::new(date(2000, 1, 1), f64::NAN);
        assert_eq!(scale.pixels_per_day(), DEFAULT_PIXELS_PER_DAY);
    }

    #[test]
    fn test_fit_spans_width() {
        let scale = LinearTimeScale::fit(date(2000, 1, 1), date(2000, 4, 10), 1000.0);
        assert_eq!(scale.x_from_date(date(2000, 1, 1)), 0.0);
        assert!((scale.x_from_date(date(2000, 4, 10)) - 1000.0).abs() < 0.01);
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |d: NaiveDate| if d > date(2000, 12, 31) { 10.0_f32 } else { 0.0 };
        assert_eq!(mapper.x_from_date(date(2001, 1, 1)), 10.0);
        assert!(mapper.date_from_x(10.0).is_none());
    }
}
