use std::time::Instant;

/// Position in tablet area units (millimeters once scaled).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Move `weight` of the way toward `target`.
    pub fn approach(&self, target: Point, weight: f64) -> Point {
        Point {
            x: self.x + (target.x - self.x) * weight,
            y: self.y + (target.y - self.y) * weight,
        }
    }
}

/// Pointer snapshot published per accepted report and produced by filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub position: Point,
    /// Normalized pressure; nominally in [0, 1] but not clamped.
    pub pressure: f64,
    /// Destination button bits after remapping.
    pub buttons: u32,
    pub time: Instant,
    pub is_valid: bool,
}

impl PointerState {
    /// An invalid, zeroed state stamped at `time`.
    pub fn empty(time: Instant) -> Self {
        Self {
            position: Point::default(),
            pressure: 0.0,
            buttons: 0,
            time,
            is_valid: false,
        }
    }

    #[inline]
    pub fn tip_down(&self) -> bool {
        self.buttons & 1 != 0
    }
}
