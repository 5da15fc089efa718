//! Reader and ticker threads: end-to-end flow and shutdown.
//!
//! Verifies that:
//! - Reports pushed into a session come out of the ticker smoothed
//! - Dropping the reader unblocks a pending read and joins
//! - A dropped feed ends the reader thread on its own
//! - A session whose reads keep failing is backed off, then given up on

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tablet_core::mocks::NoopSession;
use tablet_core::reader::MAX_CONSECUTIVE_FAILURES;
use tablet_core::{
    BoundsMeasurement, DeviceSettings, ReportFilterChain, ReportReader, SmoothingCfg,
    SmoothingFilter, Tablet, Ticker, TimedFilterChain,
};
use tablet_hardware::{ReportFeed, SimulatedSession};
use tablet_traits::clock::test_clock::TestClock;
use tablet_traits::clock::{Clock, MonotonicClock};

fn tablet() -> (Tablet<SimulatedSession>, ReportFeed) {
    let (session, feed) = SimulatedSession::usb(0x81);
    let tablet = Tablet::builder()
        .with_session(session)
        .with_settings(DeviceSettings {
            max_x: 1000,
            max_y: 1000,
            max_pressure: 1000,
            width: 100.0,
            height: 100.0,
            ..DeviceSettings::default()
        })
        .with_warmup_reports(0)
        .build()
        .unwrap();
    (tablet, feed)
}

fn report(x: u16, y: u16) -> Vec<u8> {
    let mut r = vec![2, 0];
    r.extend_from_slice(&x.to_le_bytes());
    r.extend_from_slice(&y.to_le_bytes());
    r.extend_from_slice(&200u16.to_le_bytes());
    r
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn reports_flow_through_reader_and_ticker() {
    let (tablet, feed) = tablet();
    let (mut chain, publisher) = TimedFilterChain::new(2.0);
    let cfg = SmoothingCfg {
        enabled: true,
        ..SmoothingCfg::default()
    };
    chain.push(Box::new(SmoothingFilter::new(&cfg, Arc::new(MonotonicClock::new()))));

    let ticker = Ticker::spawn(chain, Duration::from_millis(2), MonotonicClock::new());
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);

    feed.push(report(500, 500));
    let mut last = None;
    assert!(wait_until(Duration::from_secs(2), || {
        if let Some(s) = ticker.latest() {
            last = Some(s);
        }
        last.is_some_and(|s| (s.position.x - 50.0).abs() < 1e-9)
    }));
    let state = last.unwrap();
    assert!(state.tip_down());
    assert_eq!(reader.stats().valid, 1);
    assert!(ticker.tick_count() > 0);
}

#[test]
fn reader_drop_unblocks_pending_read() {
    let (tablet, _feed) = tablet();
    let (_chain, publisher) = TimedFilterChain::new(4.0);
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);
    std::thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    drop(reader);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn reader_exits_when_feed_is_dropped() {
    let (tablet, feed) = tablet();
    let (_chain, publisher) = TimedFilterChain::new(4.0);
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);
    feed.push(report(1, 1));
    feed.push(vec![2, 0, 1]);
    drop(feed);
    assert!(wait_until(Duration::from_secs(2), || reader.is_finished()));
    let stats = reader.stats();
    assert_eq!(stats.valid, 1);
    assert_eq!(stats.transport_failures, 1);
}

#[test]
fn failing_reads_back_off_and_end_the_reader() {
    let tablet = Tablet::builder()
        .with_session(NoopSession::default())
        .with_warmup_reports(0)
        .build()
        .unwrap();
    let (_chain, publisher) = TimedFilterChain::new(4.0);
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);

    // Bounded: the thread stops on its own instead of spinning on errors.
    assert!(wait_until(Duration::from_secs(2), || reader.is_finished()));
    assert_eq!(
        reader.stats().transport_failures,
        u64::from(MAX_CONSECUTIVE_FAILURES)
    );
}

#[test]
fn retry_delays_double_up_to_the_cap() {
    let clock = TestClock::new();
    let epoch = clock.now();
    let tablet = Tablet::builder()
        .with_session(NoopSession::default())
        .with_warmup_reports(0)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let (_chain, publisher) = TimedFilterChain::new(4.0);
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);

    assert!(wait_until(Duration::from_secs(2), || reader.is_finished()));
    // Seven sleeps before the eighth failure: 2, 4, 8, 16, 32, 50, 50 ms.
    assert_eq!(clock.ms_since(epoch), 162);
}

#[test]
fn measurement_mode_keeps_reports_off_the_pipeline() {
    let (tablet, feed) = tablet();
    let (mut chain, publisher) = TimedFilterChain::new(4.0);
    let bounds = Arc::new(Mutex::new(BoundsMeasurement::started()));
    let reader = ReportReader::spawn(
        tablet,
        ReportFilterChain::new(),
        publisher,
        Some(Box::new(bounds.clone())),
    );
    feed.push(report(100, 900));
    feed.push(report(700, 300));
    drop(feed);
    assert!(wait_until(Duration::from_secs(2), || reader.is_finished()));
    assert_eq!(reader.stats().invalid, 2);
    assert!(chain.on_tick().is_none());

    let m = bounds.lock().unwrap();
    let (lo, hi) = m.bounds().unwrap();
    assert_eq!((lo.x, lo.y, hi.x, hi.y), (10.0, 30.0, 70.0, 90.0));
}

#[test]
fn ticker_applies_interval_changes() {
    let (chain, _publisher) = TimedFilterChain::new(4.0);
    let ticker = Ticker::spawn(chain, Duration::from_millis(4), MonotonicClock::new());
    ticker.set_interval(Duration::from_millis(1));
    assert_eq!(ticker.interval(), Duration::from_millis(1));
    assert!(wait_until(Duration::from_secs(1), || ticker.tick_count() > 3));
    drop(ticker);
}

#[test]
fn many_pipelines_dont_leak_threads() {
    for _ in 0..10 {
        let (tablet, _feed) = tablet();
        let (chain, publisher) = TimedFilterChain::new(4.0);
        let ticker = Ticker::spawn(chain, Duration::from_millis(4), MonotonicClock::new());
        let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);
        std::thread::sleep(Duration::from_millis(5));
        drop(reader);
        drop(ticker);
    }
}
