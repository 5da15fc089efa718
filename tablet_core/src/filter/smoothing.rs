//! Time-gated exponential smoothing.
//!
//! Each tick moves the output `weight` of the remaining way toward the target.
//! The weight is derived from a latency (ms to cover `threshold` of the
//! distance) and the tick interval, so the feel stays the same when the tick
//! rate changes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tablet_traits::clock::Clock;

use super::{Filter, FilterKind};
use crate::config::SmoothingCfg;
use crate::state::{Point, PointerState};

/// Target updates further apart than this reset the output to the target,
/// and updates stop moving the output once the target is this old.
pub const STALE_GAP: Duration = Duration::from_millis(100);

/// Output closer than this to the target snaps onto it.
pub const SNAP_DISTANCE: f64 = 0.01;

/// Per-tick weight that covers `threshold` of a step in `latency_ms`.
///
/// `weight = 1 - 1 / (1 / (1 - threshold))^(interval / latency)`. A latency
/// of 0 gives weight 1 (no smoothing).
pub fn weight_from_latency(latency_ms: f64, interval_ms: f64, threshold: f64) -> f64 {
    let step_count = latency_ms / interval_ms;
    let remaining = 1.0 - threshold;
    1.0 - 1.0 / (1.0 / remaining).powf(1.0 / step_count)
}

/// Inverse of `weight_from_latency`.
pub fn latency_from_weight(weight: f64, interval_ms: f64, threshold: f64) -> f64 {
    let remaining = 1.0 - threshold;
    let step_count = -(1.0 / remaining).ln() / (1.0 - weight).ln();
    step_count * interval_ms
}

pub struct SmoothingFilter {
    clock: Arc<dyn Clock + Send + Sync>,
    target: Point,
    output_position: Point,
    output_state: Option<PointerState>,
    weight: f64,
    latency_ms: f64,
    threshold: f64,
    interval_ms: f64,
    last_target_time: Instant,
}

impl std::fmt::Debug for SmoothingFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmoothingFilter")
            .field("target", &self.target)
            .field("output_position", &self.output_position)
            .field("weight", &self.weight)
            .field("latency_ms", &self.latency_ms)
            .field("threshold", &self.threshold)
            .field("interval_ms", &self.interval_ms)
            .finish()
    }
}

impl SmoothingFilter {
    pub fn new(cfg: &SmoothingCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last_target_time = clock.now();
        let mut filter = Self {
            clock,
            target: Point::default(),
            output_position: Point::default(),
            output_state: None,
            weight: 1.0,
            latency_ms: cfg.latency_ms,
            threshold: cfg.threshold,
            interval_ms: cfg.interval_ms,
            last_target_time,
        };
        filter.set_latency(cfg.latency_ms);
        filter
    }

    /// Set the latency and derive the weight for the current interval.
    pub fn set_latency(&mut self, latency_ms: f64) {
        self.weight = weight_from_latency(latency_ms, self.interval_ms, self.threshold);
        self.latency_ms = latency_ms;
    }

    /// Set the weight directly; the latency is derived from it.
    pub fn set_weight(&mut self, weight: f64) {
        self.latency_ms = latency_from_weight(weight, self.interval_ms, self.threshold);
        self.weight = weight;
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency_ms
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn output_position(&self) -> Point {
        self.output_position
    }
}

impl Filter for SmoothingFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Smoothing
    }

    fn set_target(&mut self, state: &PointerState) {
        self.target = state.position;
        self.output_state = Some(*state);
        if state.time.saturating_duration_since(self.last_target_time) > STALE_GAP {
            self.output_position = self.target;
        }
        self.last_target_time = state.time;
    }

    fn update(&mut self) {
        let Some(state) = self.output_state.as_mut() else {
            return;
        };
        let distance = self.target.distance(self.output_position);
        if distance > SNAP_DISTANCE {
            let age = self.clock.now().saturating_duration_since(state.time);
            if age < STALE_GAP {
                self.output_position = self.output_position.approach(self.target, self.weight);
            }
            tracing::trace!(
                target_x = self.target.x,
                target_y = self.target.y,
                out_x = self.output_position.x,
                out_y = self.output_position.y,
                distance,
                weight = self.weight,
                "smoothing step"
            );
        } else {
            self.output_position = self.target;
        }
        state.position = self.output_position;
    }

    fn output(&self) -> Option<PointerState> {
        self.output_state
    }

    fn on_tick_interval_changed(&mut self, _old_ms: f64, new_ms: f64) {
        self.interval_ms = new_ms;
        self.set_latency(self.latency_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablet_traits::clock::test_clock::TestClock;

    fn filter(clock: &TestClock) -> SmoothingFilter {
        SmoothingFilter::new(&SmoothingCfg::default(), Arc::new(clock.clone()))
    }

    fn state_at(x: f64, time: Instant) -> PointerState {
        PointerState {
            position: Point::new(x, 0.0),
            pressure: 0.0,
            buttons: 0,
            time,
            is_valid: true,
        }
    }

    #[test]
    fn zero_latency_passes_through() {
        assert_eq!(weight_from_latency(0.0, 4.0, 0.9), 1.0);
        assert_eq!(latency_from_weight(1.0, 4.0, 0.9), 0.0);
    }

    #[test]
    fn default_weight_matches_latency() {
        let f = filter(&TestClock::new());
        let expected = 1.0 - 1.0 / 10f64.powf(2.0);
        assert!((f.weight() - expected).abs() < 1e-12);
    }

    #[test]
    fn update_before_target_is_a_noop() {
        let mut f = filter(&TestClock::new());
        f.update();
        assert!(f.output().is_none());
    }

    #[test]
    fn output_freezes_once_target_is_stale() {
        let clock = TestClock::new();
        let mut f = filter(&clock);
        f.set_weight(0.5);
        f.set_target(&state_at(0.0, clock.now()));
        f.update();
        f.set_target(&state_at(100.0, clock.now()));
        clock.advance(STALE_GAP);
        f.update();
        assert_eq!(f.output_position(), Point::new(0.0, 0.0));
    }

    #[test]
    fn close_output_snaps_to_target() {
        let clock = TestClock::new();
        let mut f = filter(&clock);
        f.set_weight(0.5);
        f.set_target(&state_at(0.0, clock.now()));
        f.update();
        f.set_target(&state_at(0.005, clock.now()));
        f.update();
        assert_eq!(f.output_position().x, 0.005);
    }

    #[test]
    fn interval_change_keeps_latency() {
        let mut f = filter(&TestClock::new());
        let latency = f.latency_ms();
        let before = f.weight();
        f.on_tick_interval_changed(4.0, 1.0);
        assert_eq!(f.latency_ms(), latency);
        assert_eq!(f.interval_ms(), 1.0);
        assert!(f.weight() < before);
    }
}
