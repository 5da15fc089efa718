use proptest::prelude::*;
use tablet_core::config::{DataFormat, DeviceSettings};
use tablet_core::report::{self, DecodedReport};

/// Pack 17-bit coordinates into an Intuos V2 report (10 bytes, no prefix).
fn encode_v2(x: u32, y: u32, pressure: u32, buttons: u8) -> [u8; 10] {
    let mut r = [0u8; 10];
    r[0] = 2;
    r[1] = (buttons & !1) | (pressure & 1) as u8;
    r[2] = (x >> 9) as u8;
    r[3] = (x >> 1) as u8;
    r[4] = (y >> 9) as u8;
    r[5] = (y >> 1) as u8;
    r[6] = (pressure >> 3) as u8;
    r[7] = (((pressure >> 1) & 0b11) << 6) as u8;
    r[9] = (((x & 1) << 1) | (y & 1)) as u8;
    r
}

fn v2(report_length: usize) -> DeviceSettings {
    DeviceSettings {
        data_format: DataFormat::WacomIntuosV2,
        report_length,
        ..DeviceSettings::default()
    }
}

proptest! {
    #[test]
    fn intuos_v2_coordinates_round_trip(
        x in 0u32..(1 << 17),
        y in 0u32..(1 << 17),
        pressure in 0u32..(1 << 11),
        buttons in any::<u8>(),
    ) {
        let raw = encode_v2(x, y, pressure, buttons);
        let r = report::decode(&raw, &v2(10));
        prop_assert_eq!(r.x, x);
        prop_assert_eq!(r.y, y);
        prop_assert_eq!(r.pressure, pressure);
        prop_assert_eq!(r.buttons, buttons & !1);
    }

    #[test]
    fn intuos_v2_driver_prefix_is_skipped_at_length_11(
        x in 0u32..(1 << 17),
        y in 0u32..(1 << 17),
    ) {
        let mut raw = vec![0xEE];
        raw.extend_from_slice(&encode_v2(x, y, 0, 0));
        let r = report::decode(&raw, &v2(11));
        prop_assert_eq!((r.report_id, r.x, r.y), (2, x, y));
    }

    #[test]
    fn intuos_v3_fields_are_little_endian(
        x in 0u32..(1 << 24),
        y in 0u32..(1 << 24),
        pressure in any::<u16>(),
        buttons in any::<u8>(),
    ) {
        let mut raw = [0u8; 10];
        raw[0] = 3;
        raw[1] = buttons;
        raw[2..5].copy_from_slice(&x.to_le_bytes()[..3]);
        raw[5..8].copy_from_slice(&y.to_le_bytes()[..3]);
        raw[8..10].copy_from_slice(&pressure.to_le_bytes());
        let settings = DeviceSettings {
            data_format: DataFormat::WacomIntuosV3,
            report_length: 10,
            ..DeviceSettings::default()
        };
        let r = report::decode(&raw, &settings);
        prop_assert_eq!(
            r,
            DecodedReport { report_id: 3, buttons: buttons & !1, x, y, pressure: u32::from(pressure) }
        );
    }

    #[test]
    fn any_buffer_decodes_without_panicking(
        raw in proptest::collection::vec(any::<u8>(), 0..256),
        format in 0usize..4,
        report_length in 0usize..256,
        vendor_wrapped in any::<bool>(),
    ) {
        let data_format = [
            DataFormat::Default,
            DataFormat::WacomIntuosV2,
            DataFormat::WacomIntuosV3,
            DataFormat::SkipFirstDataByte,
        ][format];
        let settings = DeviceSettings {
            data_format,
            report_length,
            vendor_wrapped,
            ..DeviceSettings::default()
        };
        let _ = report::decode(&raw, &settings);
    }
}
