//! `From` implementations bridging `tablet_config` types to `tablet_core` types.

use crate::config::{ButtonMap, DataFormat, DeviceSettings, InitCfg, SmoothingCfg};

// ── DataFormat ───────────────────────────────────────────────────────────────

impl From<tablet_config::DataFormat> for DataFormat {
    fn from(f: tablet_config::DataFormat) -> Self {
        match f {
            tablet_config::DataFormat::Default => DataFormat::Default,
            tablet_config::DataFormat::WacomIntuosV2 => DataFormat::WacomIntuosV2,
            tablet_config::DataFormat::WacomIntuosV3 => DataFormat::WacomIntuosV3,
            tablet_config::DataFormat::SkipFirstDataByte => DataFormat::SkipFirstDataByte,
        }
    }
}

// ── DeviceSettings ───────────────────────────────────────────────────────────

impl From<&tablet_config::Settings> for DeviceSettings {
    fn from(c: &tablet_config::Settings) -> Self {
        Self {
            max_x: c.max_x,
            max_y: c.max_y,
            max_pressure: c.max_pressure,
            width: c.width,
            height: c.height,
            skew: c.skew,
            report_length: c.report_length,
            data_format: c.data_format.into(),
            vendor_wrapped: c.vendor_wrapped,
            report_id: c.report_id,
            detect_mask: c.detect_mask,
            ignore_mask: c.ignore_mask,
            click_pressure: c.click_pressure,
            keep_tip_down: c.keep_tip_down,
        }
    }
}

// ── ButtonMap ────────────────────────────────────────────────────────────────

impl From<&tablet_config::Buttons> for ButtonMap {
    fn from(c: &tablet_config::Buttons) -> Self {
        ButtonMap::new(&c.map)
    }
}

// ── InitCfg ──────────────────────────────────────────────────────────────────

impl From<&tablet_config::Init> for InitCfg {
    fn from(c: &tablet_config::Init) -> Self {
        Self {
            strings: c.strings.clone(),
            feature: c.feature.clone(),
            report: c.report.clone(),
        }
    }
}

// ── SmoothingCfg ─────────────────────────────────────────────────────────────

impl From<&tablet_config::Smoothing> for SmoothingCfg {
    fn from(c: &tablet_config::Smoothing) -> Self {
        Self {
            enabled: c.enabled,
            latency_ms: c.latency_ms,
            threshold: c.threshold,
            interval_ms: c.interval_ms,
        }
    }
}
