//! Runtime configuration for a tablet session.
//!
//! These are the structs the decoder and filters read. They are separate from
//! the TOML-deserialized schema in `tablet_config`; see `conversions`.

/// Largest report the session buffer can hold.
pub const MAX_REPORT_LENGTH: usize = 1024;

/// Number of source bits a `ButtonMap` can route.
pub const BUTTON_MAP_LEN: usize = 8;

/// Byte layout of the reports a tablet sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// reportId, buttons, x, y, pressure; 16-bit fields little-endian.
    #[default]
    Default,
    /// Wacom Intuos 14-bit packed layout with x/y extension bits in byte 9.
    WacomIntuosV2,
    /// Wacom 24-bit coordinate layout.
    WacomIntuosV3,
    /// Default layout preceded by one extra byte after the report id.
    SkipFirstDataByte,
}

/// Decoding and geometry parameters of one tablet.
///
/// Immutable while a session is open.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub max_x: u32,
    pub max_y: u32,
    pub max_pressure: u32,
    /// Active area width in millimeters.
    pub width: f64,
    /// Active area height in millimeters.
    pub height: f64,
    /// Horizontal shear applied as `x += y * skew`.
    pub skew: f64,
    pub report_length: usize,
    pub data_format: DataFormat,
    /// Reports arrive wrapped by a vendor driver with one leading byte.
    /// Only consulted for `DataFormat::Default`.
    pub vendor_wrapped: bool,
    /// Expected report id; 0 accepts any.
    pub report_id: u8,
    /// All these button bits must be set for the position to be valid; 0 disables.
    pub detect_mask: u8,
    /// Reports with all these button bits set are ignored; 0 disables.
    pub ignore_mask: u8,
    /// Tip is down iff raw pressure exceeds this; 0 uses the hardware bit.
    pub click_pressure: u32,
    /// Reports to keep the tip held after release; 0 disables.
    pub keep_tip_down: i32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            max_x: 1,
            max_y: 1,
            max_pressure: 1,
            width: 1.0,
            height: 1.0,
            skew: 0.0,
            report_length: 8,
            data_format: DataFormat::Default,
            vendor_wrapped: false,
            report_id: 0,
            detect_mask: 0,
            ignore_mask: 0,
            click_pressure: 0,
            keep_tip_down: 0,
        }
    }
}

impl DeviceSettings {
    /// Geometry is usable: every axis maximum and the area dimensions exceed 1.
    pub fn is_configured(&self) -> bool {
        self.max_x > 1 && self.max_y > 1 && self.max_pressure > 1 && self.width > 1.0 && self.height > 1.0
    }
}

/// Source button bit to 1-based destination button number (0 = unmapped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMap([u8; BUTTON_MAP_LEN]);

impl Default for ButtonMap {
    /// Tip to 1, barrel to 2, second barrel to 3.
    fn default() -> Self {
        Self::new(&[1, 2, 3])
    }
}

impl ButtonMap {
    /// Build from up to `BUTTON_MAP_LEN` entries; missing entries are unmapped
    /// and extra ones are dropped.
    pub fn new(entries: &[u8]) -> Self {
        let mut map = [0u8; BUTTON_MAP_LEN];
        for (dst, src) in map.iter_mut().zip(entries) {
            *dst = *src;
        }
        Self(map)
    }

    pub fn entries(&self) -> &[u8; BUTTON_MAP_LEN] {
        &self.0
    }

    /// Route the low four source bits to their destination buttons.
    pub fn remap(&self, buttons: u8) -> u32 {
        let buttons = buttons & 0x0F;
        self.0
            .iter()
            .enumerate()
            .filter(|&(i, &dst)| dst > 0 && buttons & (1u8 << i) != 0)
            .filter_map(|(_, &dst)| 1u32.checked_shl(u32::from(dst) - 1))
            .fold(0, |acc, bit| acc | bit)
    }
}

/// Commands sent to the device right after it opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitCfg {
    /// String descriptors read for their side effects only.
    pub strings: Vec<u8>,
    /// Feature report; takes precedence over `report`.
    pub feature: Option<Vec<u8>>,
    /// Output report.
    pub report: Option<Vec<u8>>,
}

/// Smoothing filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingCfg {
    pub enabled: bool,
    /// Time to cover `threshold` of the distance to a new target, in ms.
    pub latency_ms: f64,
    /// Fraction of the distance considered "arrived", in (0, 1).
    pub threshold: f64,
    /// Tick interval of the timed chain, in ms.
    pub interval_ms: f64,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            latency_ms: 2.0,
            threshold: 0.9,
            interval_ms: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_routes_first_three_buttons() {
        let map = ButtonMap::default();
        assert_eq!(map.remap(0b0001), 0b001);
        assert_eq!(map.remap(0b0110), 0b110);
        // Bit 3 has no entry.
        assert_eq!(map.remap(0b1000), 0);
    }

    #[test]
    fn remap_only_sees_low_nibble() {
        let map = ButtonMap::new(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(map.remap(0xF0), 0);
        assert_eq!(map.remap(0xFF), 0x0F);
    }

    #[test]
    fn remap_can_swap_and_reach_high_buttons() {
        let map = ButtonMap::new(&[2, 1, 0, 32]);
        assert_eq!(map.remap(0b0001), 0b10);
        assert_eq!(map.remap(0b0010), 0b01);
        assert_eq!(map.remap(0b0100), 0);
        assert_eq!(map.remap(0b1000), 1 << 31);
    }

    #[test]
    fn out_of_range_destination_is_dropped() {
        let map = ButtonMap::new(&[33]);
        assert_eq!(map.remap(1), 0);
    }

    #[test]
    fn default_settings_are_not_configured() {
        assert!(!DeviceSettings::default().is_configured());
        let s = DeviceSettings {
            max_x: 15200,
            max_y: 9500,
            max_pressure: 2047,
            width: 152.0,
            height: 95.0,
            ..DeviceSettings::default()
        };
        assert!(s.is_configured());
    }
}
