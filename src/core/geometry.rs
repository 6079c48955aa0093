//! Horizontal spans and placement rectangles.

use serde::{Deserialize, Serialize};

/// A horizontal pixel range `[x1, x2)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub x1: f32,
    pub x2: f32,
}

impl Span {
    /// Span of width `width` centred on `x`.
    pub fn centered(x: f32, width: f32) -> Self {
        Self {
            x1: x - width / 2.0,
            x2: x + width / 2.0,
        }
    }

    /// Half-open overlap test: touching spans do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.x1 < other.x2 && self.x2 > other.x1
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &Span) -> Span {
        Span {
            x1: self.x1.min(other.x1),
            x2: self.x2.max(other.x2),
        }
    }

    /// Grow both ends by `padding`.
    pub fn padded(&self, padding: f32) -> Span {
        Span {
            x1: self.x1 - padding,
            x2: self.x2 + padding,
        }
    }

    /// True if `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.x1 <= other.x1 && self.x2 >= other.x2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn center(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }
}

/// A resolved placement rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub x2: f32,
    /// Top edge
    pub y: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(span: Span, y: f32, height: f32) -> Self {
        Self {
            x1: span.x1,
            x2: span.x2,
            y,
            height,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            x1: self.x1,
            x2: self.x2,
        }
    }

    /// Two-dimensional half-open overlap test.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.span().overlaps(&other.span())
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Point hit test, half-open like `intersects`.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y && y < self.y + self.height
    }
}
