use proptest::prelude::*;
use rstest::rstest;
use tablet_core::filter::{latency_from_weight, weight_from_latency};

#[rstest]
fn weight_survives_latency_round_trip(
    #[values(0.5, 0.8, 0.95)] threshold: f64,
    #[values(1.0, 8.0, 16.0)] interval_ms: f64,
) {
    for i in 1..=99 {
        let w = f64::from(i) / 100.0;
        let latency = latency_from_weight(w, interval_ms, threshold);
        let back = weight_from_latency(latency, interval_ms, threshold);
        assert!(
            (back - w).abs() < 1e-9,
            "w={w} threshold={threshold} interval={interval_ms}: got {back}"
        );
    }
}

#[rstest]
#[case(4.0, 0.9)]
#[case(1.0, 0.5)]
fn zero_latency_means_no_smoothing(#[case] interval_ms: f64, #[case] threshold: f64) {
    assert_eq!(weight_from_latency(0.0, interval_ms, threshold), 1.0);
}

#[test]
fn latency_of_one_tick_covers_threshold_in_one_step() {
    // Latency equal to the interval: one step must cover exactly `threshold`.
    let w = weight_from_latency(4.0, 4.0, 0.9);
    assert!((w - 0.9).abs() < 1e-12);
}

proptest! {
    #[test]
    fn latency_survives_weight_round_trip(
        steps in 0.5f64..200.0,
        interval in 0.5f64..32.0,
        threshold in 0.05f64..0.95,
    ) {
        let latency = steps * interval;
        let w = weight_from_latency(latency, interval, threshold);
        prop_assert!(w > 0.0 && w < 1.0);
        let back = latency_from_weight(w, interval, threshold);
        prop_assert!((back - latency).abs() / latency < 1e-6);
    }
}
