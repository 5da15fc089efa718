use std::time::Instant;

use rstest::{fixture, rstest};
use tablet_core::{ButtonMap, DecoderState, DeviceSettings, ReportStatus, decode_report};

fn report(buttons: u8, x: u16, y: u16, pressure: u16) -> Vec<u8> {
    let mut r = vec![2, buttons];
    r.extend_from_slice(&x.to_le_bytes());
    r.extend_from_slice(&y.to_le_bytes());
    r.extend_from_slice(&pressure.to_le_bytes());
    r
}

#[fixture]
fn settings() -> DeviceSettings {
    DeviceSettings {
        max_x: 20000,
        max_y: 12500,
        max_pressure: 2047,
        width: 160.0,
        height: 100.0,
        ..DeviceSettings::default()
    }
}

fn decode(raw: &[u8], settings: &DeviceSettings) -> ReportStatus {
    decode_report(
        raw,
        settings,
        &ButtonMap::default(),
        &mut DecoderState::new(0),
        None,
        Instant::now(),
    )
}

#[rstest]
fn first_five_reports_are_invalid(settings: DeviceSettings) {
    let mut state = DecoderState::default();
    let raw = report(1, 100, 100, 500);
    for n in 0..5 {
        let out = decode_report(&raw, &settings, &ButtonMap::default(), &mut state, None, Instant::now());
        assert_eq!(out, ReportStatus::Invalid, "report {n}");
    }
    assert_eq!(state.warmup_remaining(), 0);
    let out = decode_report(&raw, &settings, &ButtonMap::default(), &mut state, None, Instant::now());
    assert!(out.is_valid());
}

#[rstest]
#[case(0x01, ReportStatus::PositionInvalid)]
#[case(0x02, ReportStatus::PositionInvalid)]
#[case(0x00, ReportStatus::PositionInvalid)]
fn detect_mask_requires_every_bit(
    mut settings: DeviceSettings,
    #[case] buttons: u8,
    #[case] expected: ReportStatus,
) {
    settings.detect_mask = 0x03;
    assert_eq!(decode(&report(buttons, 10, 10, 0), &settings), expected);
}

#[rstest]
fn detect_mask_satisfied_proceeds(mut settings: DeviceSettings) {
    settings.detect_mask = 0x03;
    assert!(decode(&report(0x03, 10, 10, 0), &settings).is_valid());
}

#[rstest]
#[case(0x04, false)]
#[case(0x05, false)]
#[case(0x00, true)]
#[case(0x02, true)]
fn ignore_mask_drops_matching_reports(
    mut settings: DeviceSettings,
    #[case] buttons: u8,
    #[case] valid: bool,
) {
    settings.ignore_mask = 0x04;
    let out = decode(&report(buttons, 10, 10, 0), &settings);
    if valid {
        assert!(out.is_valid());
    } else {
        assert_eq!(out, ReportStatus::Ignore);
    }
}

#[rstest]
#[case(150, 0x00, true)]
#[case(50, 0x01, false)]
#[case(100, 0x01, false)]
#[case(101, 0x00, true)]
fn click_pressure_overrides_hardware_tip(
    mut settings: DeviceSettings,
    #[case] pressure: u16,
    #[case] hw_buttons: u8,
    #[case] tip: bool,
) {
    settings.click_pressure = 100;
    let out = decode(&report(hw_buttons, 10, 10, pressure), &settings);
    assert_eq!(out.state().map(|s| s.tip_down()), Some(tip));
}

#[rstest]
fn report_id_filter_only_when_configured(mut settings: DeviceSettings) {
    let raw = report(0, 10, 10, 0);
    assert!(decode(&raw, &settings).is_valid());
    settings.report_id = 7;
    assert_eq!(decode(&raw, &settings), ReportStatus::Invalid);
}

#[rstest]
fn remap_routes_barrel_to_configured_button(settings: DeviceSettings) {
    let map = ButtonMap::new(&[1, 3, 2]);
    let out = decode_report(
        &report(0b010, 10, 10, 0),
        &settings,
        &map,
        &mut DecoderState::new(0),
        None,
        Instant::now(),
    );
    assert_eq!(out.state().map(|s| s.buttons), Some(0b100));
}

#[rstest]
fn position_scales_into_area(settings: DeviceSettings) {
    let out = decode(&report(0, 10000, 12500, 2047), &settings);
    let state = out.state().copied().unwrap();
    assert_eq!(state.position.x, 80.0);
    assert_eq!(state.position.y, 100.0);
    assert_eq!(state.pressure, 1.0);
}
