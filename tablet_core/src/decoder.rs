//! Report validation and conversion to `PointerState`.
//!
//! `decode_report` is a pure function of the raw bytes, the settings and the
//! per-session `DecoderState` passed by `&mut`. It performs no I/O.

use std::time::Instant;

use crate::config::{ButtonMap, DeviceSettings};
use crate::measurement::MeasurementSink;
use crate::report;
use crate::state::{Point, PointerState};

/// Reports rejected unconditionally after a session opens.
pub const DEFAULT_WARMUP_REPORTS: u32 = 5;

/// Without `click_pressure`, raw pressure above this forces the tip down.
pub const TIP_PRESSURE_FLOOR: u32 = 10;

/// Outcome of decoding one report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportStatus {
    Valid(PointerState),
    /// Warm-up, report id mismatch or measurement mode.
    Invalid,
    /// Detect mask not satisfied: pen out of range.
    PositionInvalid,
    /// Ignore mask matched.
    Ignore,
}

impl ReportStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ReportStatus::Valid(_))
    }

    pub fn state(&self) -> Option<&PointerState> {
        match self {
            ReportStatus::Valid(s) => Some(s),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportStatus::Valid(_) => "valid",
            ReportStatus::Invalid => "invalid",
            ReportStatus::PositionInvalid => "position_invalid",
            ReportStatus::Ignore => "ignore",
        }
    }
}

/// Counters carried between reports of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderState {
    warmup_remaining: u32,
    tip_down_counter: i32,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP_REPORTS)
    }
}

impl DecoderState {
    pub fn new(warmup_reports: u32) -> Self {
        Self {
            warmup_remaining: warmup_reports,
            tip_down_counter: 0,
        }
    }

    pub fn warmup_remaining(&self) -> u32 {
        self.warmup_remaining
    }

    pub fn tip_down_counter(&self) -> i32 {
        self.tip_down_counter
    }

    /// Tip hold: reload on tip down, then force the tip while the counter,
    /// checked before its decrement, is non-negative. The counter starts at 0,
    /// so the first report after open is held too.
    fn hold_tip(&mut self, buttons: u8, keep_tip_down: i32) -> u8 {
        if buttons & 0x01 != 0 {
            self.tip_down_counter = keep_tip_down;
        }
        let held = self.tip_down_counter >= 0;
        self.tip_down_counter = self.tip_down_counter.saturating_sub(1);
        if held { buttons | 0x01 } else { buttons }
    }
}

/// Decode `raw` (the first `report_length` bytes read) into a pointer state.
///
/// Steps run in a fixed order: warm-up skip, format decode, report id check,
/// detect mask, ignore mask, tip synthesis, tip hold, button remap, geometry,
/// then measurement interception.
pub fn decode_report(
    raw: &[u8],
    settings: &DeviceSettings,
    button_map: &ButtonMap,
    state: &mut DecoderState,
    sink: Option<&mut dyn MeasurementSink>,
    now: Instant,
) -> ReportStatus {
    if state.warmup_remaining > 0 {
        state.warmup_remaining -= 1;
        return ReportStatus::Invalid;
    }

    let mut report = report::decode(raw, settings);

    if settings.report_id > 0 && report.report_id != settings.report_id {
        return ReportStatus::Invalid;
    }
    if settings.detect_mask > 0 && report.buttons & settings.detect_mask != settings.detect_mask {
        return ReportStatus::PositionInvalid;
    }
    if settings.ignore_mask > 0 && report.buttons & settings.ignore_mask == settings.ignore_mask {
        return ReportStatus::Ignore;
    }

    if settings.click_pressure > 0 {
        report.buttons &= !0x01;
        if report.pressure > settings.click_pressure {
            report.buttons |= 0x01;
        }
    } else if report.pressure > TIP_PRESSURE_FLOOR {
        report.buttons |= 0x01;
    }

    if settings.keep_tip_down > 0 {
        report.buttons = state.hold_tip(report.buttons, settings.keep_tip_down);
    }

    let raw_buttons = report.buttons & 0x0F;
    let position = scale_position(report.x, report.y, settings);

    if let Some(sink) = sink
        && sink.is_active()
    {
        sink.update(raw_buttons, position);
        return ReportStatus::Invalid;
    }

    ReportStatus::Valid(PointerState {
        position,
        pressure: f64::from(report.pressure) / f64::from(settings.max_pressure),
        buttons: button_map.remap(raw_buttons),
        time: now,
        is_valid: true,
    })
}

/// Map raw axis counts into the configured area, applying skew.
pub fn scale_position(x: u32, y: u32, settings: &DeviceSettings) -> Point {
    let mut p = Point::new(
        f64::from(x) / f64::from(settings.max_x) * settings.width,
        f64::from(y) / f64::from(settings.max_y) * settings.height,
    );
    if settings.skew != 0.0 {
        p.x += p.y * settings.skew;
    }
    p
}
