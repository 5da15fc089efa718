#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use tablet_core::{ButtonMap, DataFormat, DecoderState, DeviceSettings, decode_report};

#[derive(Debug, Arbitrary)]
struct Input {
    format: u8,
    report_length: u16,
    vendor_wrapped: bool,
    report_id: u8,
    detect_mask: u8,
    ignore_mask: u8,
    click_pressure: u16,
    keep_tip_down: u8,
    buttons: [u8; 8],
    reports: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let data_format = match input.format % 4 {
        0 => DataFormat::Default,
        1 => DataFormat::WacomIntuosV2,
        2 => DataFormat::WacomIntuosV3,
        _ => DataFormat::SkipFirstDataByte,
    };
    let settings = DeviceSettings {
        max_x: 15200,
        max_y: 9500,
        max_pressure: 2047,
        width: 152.0,
        height: 95.0,
        report_length: usize::from(input.report_length % 1024) + 1,
        data_format,
        vendor_wrapped: input.vendor_wrapped,
        report_id: input.report_id,
        detect_mask: input.detect_mask,
        ignore_mask: input.ignore_mask,
        click_pressure: u32::from(input.click_pressure),
        keep_tip_down: i32::from(input.keep_tip_down),
        ..DeviceSettings::default()
    };
    let map = ButtonMap::new(&input.buttons);
    let mut state = DecoderState::new(1);
    let now = std::time::Instant::now();
    for raw in &input.reports {
        let _ = decode_report(raw, &settings, &map, &mut state, None, now);
    }
});
