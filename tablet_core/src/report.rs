//! Raw report buffers and per-format field extraction.
//!
//! Every decoder reads through `byte()`, so a window shorter than its format
//! needs yields zeros for the missing bytes instead of panicking.

use crate::config::{DataFormat, DeviceSettings, MAX_REPORT_LENGTH};

/// Size of the structured layout: id, buttons, x, y, pressure.
pub const STRUCTURED_LEN: usize = 8;

/// Smallest `report_length` `SkipFirstDataByte` decodes.
pub const SKIP_FIRST_MIN_LEN: usize = STRUCTURED_LEN + 1;

/// Fixed-capacity buffer holding the last report read.
#[derive(Clone)]
pub struct RawReport {
    buf: Box<[u8; MAX_REPORT_LENGTH]>,
    len: usize,
}

impl Default for RawReport {
    fn default() -> Self {
        Self {
            buf: Box::new([0u8; MAX_REPORT_LENGTH]),
            len: 0,
        }
    }
}

impl std::fmt::Debug for RawReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawReport")
            .field("len", &self.len)
            .field("bytes", &crate::util::hex(self.as_slice()))
            .finish()
    }
}

impl RawReport {
    /// Writable region of `len` bytes for the next read (clamped to capacity).
    pub fn fill_slice(&mut self, len: usize) -> &mut [u8] {
        let len = len.min(MAX_REPORT_LENGTH);
        self.len = 0;
        &mut self.buf[..len]
    }

    /// Record how many bytes the last read transferred.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(MAX_REPORT_LENGTH);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Fields extracted from one report before validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodedReport {
    pub report_id: u8,
    pub buttons: u8,
    pub x: u32,
    pub y: u32,
    pub pressure: u32,
}

#[inline]
fn byte(window: &[u8], i: usize) -> u8 {
    window.get(i).copied().unwrap_or(0)
}

#[inline]
fn wide(window: &[u8], i: usize) -> u32 {
    u32::from(byte(window, i))
}

/// Offset of the decode window: 1 when a vendor driver prefixes the report.
pub fn window_offset(settings: &DeviceSettings) -> usize {
    match settings.data_format {
        DataFormat::Default if settings.vendor_wrapped => 1,
        DataFormat::WacomIntuosV2 if settings.report_length == 11 => 1,
        DataFormat::WacomIntuosV3 if settings.report_length == 193 => 1,
        _ => 0,
    }
}

/// Extract report fields from `raw` according to `settings.data_format`.
pub fn decode(raw: &[u8], settings: &DeviceSettings) -> DecodedReport {
    let window = raw.get(window_offset(settings)..).unwrap_or(&[]);
    match settings.data_format {
        DataFormat::Default => decode_structured(window),
        DataFormat::WacomIntuosV2 => decode_intuos_v2(window),
        DataFormat::WacomIntuosV3 => decode_intuos_v3(window),
        DataFormat::SkipFirstDataByte => {
            decode_skip_first_byte(window, settings.report_length)
        }
    }
}

/// id, buttons, then 16-bit little-endian x, y, pressure.
pub fn decode_structured(window: &[u8]) -> DecodedReport {
    DecodedReport {
        report_id: byte(window, 0),
        buttons: byte(window, 1),
        x: wide(window, 2) | wide(window, 3) << 8,
        y: wide(window, 4) | wide(window, 5) << 8,
        pressure: wide(window, 6) | wide(window, 7) << 8,
    }
}

/// Big-endian 16-bit coordinates shifted left once; the low bits come from
/// byte 9. Pressure is 11 bits spread over bytes 6, 7 and bit 0 of byte 1.
pub fn decode_intuos_v2(window: &[u8]) -> DecodedReport {
    let b1 = byte(window, 1);
    let b9 = wide(window, 9);
    DecodedReport {
        report_id: byte(window, 0),
        buttons: b1 & !0x01,
        x: ((wide(window, 2) << 8 | wide(window, 3)) << 1) | ((b9 >> 1) & 1),
        y: ((wide(window, 4) << 8 | wide(window, 5)) << 1) | (b9 & 1),
        pressure: (wide(window, 6) << 3)
            | ((wide(window, 7) & 0xC0) >> 5)
            | u32::from(b1 & 0x01),
    }
}

/// 24-bit little-endian x and y, 16-bit little-endian pressure.
pub fn decode_intuos_v3(window: &[u8]) -> DecodedReport {
    DecodedReport {
        report_id: byte(window, 0),
        buttons: byte(window, 1) & !0x01,
        x: wide(window, 2) | wide(window, 3) << 8 | wide(window, 4) << 16,
        y: wide(window, 5) | wide(window, 6) << 8 | wide(window, 7) << 16,
        pressure: wide(window, 8) | wide(window, 9) << 8,
    }
}

/// Report id at byte 0, structured fields from byte 1 on. Reports configured
/// shorter than `SKIP_FIRST_MIN_LEN` decode to all zeros.
pub fn decode_skip_first_byte(window: &[u8], report_length: usize) -> DecodedReport {
    if report_length < SKIP_FIRST_MIN_LEN {
        return DecodedReport::default();
    }
    let mut report = decode_structured(window.get(1..).unwrap_or(&[]));
    report.report_id = byte(window, 0);
    report
}
