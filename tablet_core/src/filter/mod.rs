//! Filter contract and the two filter chains.
//!
//! Report filters run on the read thread once per valid report, in order.
//! Timed filters run on the tick thread once per tick whether or not a new
//! report arrived. Report states cross to the tick thread as immutable
//! snapshots over a channel (`TargetPublisher` -> `TimedFilterChain`), so
//! timed filter state is only ever touched by the tick thread.

pub mod smoothing;

use crossbeam_channel as xch;

use crate::state::PointerState;

pub use smoothing::{SmoothingFilter, latency_from_weight, weight_from_latency};

/// Known filter implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Smoothing,
    AntiSmoothing,
    NoiseFilter,
    Gravity,
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Smoothing => "smoothing",
            FilterKind::AntiSmoothing => "anti-smoothing",
            FilterKind::NoiseFilter => "noise",
            FilterKind::Gravity => "gravity",
        }
    }
}

/// Shared interface of every filter.
pub trait Filter: Send {
    fn kind(&self) -> FilterKind;

    /// New input state. Called once per accepted report (or per upstream output).
    fn set_target(&mut self, state: &PointerState);

    /// Advance the filter one step.
    fn update(&mut self);

    /// Current output; `None` until the first target.
    fn output(&self) -> Option<PointerState>;

    /// The tick interval changed; intervals are in milliseconds.
    fn on_tick_interval_changed(&mut self, old_ms: f64, new_ms: f64);
}

/// Filters applied synchronously per valid report.
#[derive(Default)]
pub struct ReportFilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl ReportFilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn kinds(&self) -> Vec<FilterKind> {
        self.filters.iter().map(|f| f.kind()).collect()
    }

    /// Run `state` through every filter in order and return the final output.
    pub fn on_report(&mut self, state: PointerState) -> PointerState {
        let mut current = state;
        for filter in &mut self.filters {
            filter.set_target(&current);
            filter.update();
            if let Some(out) = filter.output() {
                current = out;
            }
        }
        current
    }
}

/// Producer side of the timed chain, held by the read thread.
#[derive(Debug, Clone)]
pub struct TargetPublisher {
    tx: xch::Sender<PointerState>,
}

impl TargetPublisher {
    /// Returns false once the timed chain is gone.
    pub fn publish(&self, state: PointerState) -> bool {
        self.tx.send(state).is_ok()
    }
}

/// Filters advanced once per scheduler tick.
pub struct TimedFilterChain {
    filters: Vec<Box<dyn Filter>>,
    rx: xch::Receiver<PointerState>,
    last_target: Option<PointerState>,
    interval_ms: f64,
}

impl TimedFilterChain {
    pub fn new(interval_ms: f64) -> (Self, TargetPublisher) {
        let (tx, rx) = xch::unbounded();
        (
            Self {
                filters: Vec::new(),
                rx,
                last_target: None,
                interval_ms,
            },
            TargetPublisher { tx },
        )
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn kinds(&self) -> Vec<FilterKind> {
        self.filters.iter().map(|f| f.kind()).collect()
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Most recent snapshot received from the read side.
    pub fn last_target(&self) -> Option<PointerState> {
        self.last_target
    }

    /// Hand every pending snapshot, oldest first, to the first filter.
    /// Returns how many were consumed.
    pub fn drain_targets(&mut self) -> usize {
        let mut n = 0;
        for state in self.rx.try_iter() {
            if let Some(first) = self.filters.first_mut() {
                first.set_target(&state);
            }
            self.last_target = Some(state);
            n += 1;
        }
        n
    }

    /// One scheduler tick. With no filters the latest target passes through.
    pub fn on_tick(&mut self) -> Option<PointerState> {
        self.drain_targets();
        let mut output = self.last_target;
        for (i, filter) in self.filters.iter_mut().enumerate() {
            if i > 0
                && let Some(upstream) = output
            {
                filter.set_target(&upstream);
            }
            filter.update();
            output = filter.output().or(output);
        }
        output
    }

    /// Propagate a new tick interval to every filter.
    pub fn on_tick_interval_changed(&mut self, new_ms: f64) {
        let old_ms = self.interval_ms;
        self.interval_ms = new_ms;
        for filter in &mut self.filters {
            filter.on_tick_interval_changed(old_ms, new_ms);
        }
        tracing::debug!(old_ms, new_ms, "tick interval changed");
    }
}
