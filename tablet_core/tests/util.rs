// Focused tests for the util module: string narrowing, hex dumps, intervals.
use std::time::Duration;

use tablet_core::util::{hex, interval_from_ms, interval_ms, narrow_string};

#[test]
fn narrow_string_keeps_even_bytes() {
    assert_eq!(narrow_string(&[b'C', 0, b'T', 0, b'L', 0]), "CTL");
    // Odd length: the last byte is still even-indexed.
    assert_eq!(narrow_string(&[b'A', 0, b'B']), "AB");
    assert_eq!(narrow_string(&[]), "");
}

#[test]
fn narrow_string_keeps_zero_low_bytes_mid_string() {
    // U+4E00 has a zero low byte; the characters after it must survive.
    let narrowed = narrow_string(&[b'A', 0, 0x00, 0x4E, b'B', 0]);
    assert_eq!(narrowed, "A\0B");
    assert_eq!(narrowed.chars().count(), 3);
}

#[test]
fn narrow_string_drops_trailing_nuls() {
    assert_eq!(narrow_string(&[b'P', 0, b'X', 0, 0, 0, 0, 0]), "PX");
}

#[test]
fn hex_is_space_separated() {
    assert_eq!(hex(&[0x02, 0xAB, 0x00]), "02 ab 00");
    assert_eq!(hex(&[]), "");
}

#[test]
fn interval_round_trips_through_duration() {
    assert_eq!(interval_from_ms(4.0), Duration::from_millis(4));
    assert_eq!(interval_ms(Duration::from_micros(2500)), 2.5);
}

#[test]
fn interval_clamps_nonsense() {
    assert_eq!(interval_from_ms(0.0), Duration::from_micros(1));
    assert_eq!(interval_from_ms(-3.0), Duration::from_micros(1));
    assert_eq!(interval_from_ms(f64::NAN), Duration::from_micros(1));
    assert_eq!(interval_from_ms(1e300), Duration::MAX);
}
