//! Measurement mode: raw positions go to a sink instead of the filters.

use std::sync::{Arc, Mutex};

use crate::state::Point;

/// Receives decoded positions while a measurement is running.
///
/// While `is_active` holds, every report that passes the masks is forwarded
/// here and the decoder reports it as `Invalid` to keep it off the pipeline.
pub trait MeasurementSink {
    fn is_active(&self) -> bool;
    /// `buttons` are the raw low four button bits, before remapping.
    fn update(&mut self, buttons: u8, position: Point);
}

impl<T: MeasurementSink + ?Sized> MeasurementSink for Box<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
    fn update(&mut self, buttons: u8, position: Point) {
        (**self).update(buttons, position);
    }
}

/// Shared sink so the caller can read results while a reader thread feeds it.
impl<T: MeasurementSink + ?Sized> MeasurementSink for Arc<Mutex<T>> {
    fn is_active(&self) -> bool {
        self.lock().map(|m| m.is_active()).unwrap_or(false)
    }
    fn update(&mut self, buttons: u8, position: Point) {
        if let Ok(mut m) = self.lock() {
            m.update(buttons, position);
        }
    }
}

/// Records the bounding box of every position seen, e.g. to calibrate the
/// active area by tracing its corners.
#[derive(Debug, Clone, Default)]
pub struct BoundsMeasurement {
    active: bool,
    min: Option<Point>,
    max: Option<Point>,
    reports: u64,
    buttons_seen: u8,
}

impl BoundsMeasurement {
    /// A measurement that starts out running.
    pub fn started() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Clear previous results and start recording.
    pub fn start(&mut self) {
        *self = Self::started();
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }

    /// Union of the button bits seen during the measurement.
    pub fn buttons_seen(&self) -> u8 {
        self.buttons_seen
    }

    /// `(min, max)` corners, once at least one report arrived.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        self.min.zip(self.max)
    }

    pub fn width(&self) -> f64 {
        self.bounds().map_or(0.0, |(lo, hi)| hi.x - lo.x)
    }

    pub fn height(&self) -> f64 {
        self.bounds().map_or(0.0, |(lo, hi)| hi.y - lo.y)
    }
}

impl MeasurementSink for BoundsMeasurement {
    fn is_active(&self) -> bool {
        self.active
    }

    fn update(&mut self, buttons: u8, position: Point) {
        self.reports += 1;
        self.buttons_seen |= buttons;
        self.min = Some(match self.min {
            Some(m) => Point::new(m.x.min(position.x), m.y.min(position.y)),
            None => position,
        });
        self.max = Some(match self.max {
            Some(m) => Point::new(m.x.max(position.x), m.y.max(position.y)),
            None => position,
        });
        tracing::trace!(x = position.x, y = position.y, buttons, "measurement update");
    }
}
