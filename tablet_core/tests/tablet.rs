use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use tablet_core::error::{BuildError, TabletError};
use tablet_core::mocks::NoopSession;
use tablet_core::{
    BoundsMeasurement, DeviceSettings, InitCfg, MeasurementSink, ReportStatus, Tablet,
    device_string,
};
use tablet_hardware::{ReportFeed, SimulatedSession};
use tablet_traits::DeviceSession;

fn settings() -> DeviceSettings {
    DeviceSettings {
        max_x: 1000,
        max_y: 1000,
        max_pressure: 1000,
        width: 100.0,
        height: 100.0,
        report_length: 8,
        ..DeviceSettings::default()
    }
}

fn tablet(warmup: u32) -> (Tablet<SimulatedSession>, ReportFeed) {
    let (session, feed) = SimulatedSession::usb(0x81);
    let tablet = Tablet::builder()
        .with_session(session)
        .with_name("test tablet")
        .with_settings(settings())
        .with_warmup_reports(warmup)
        .build()
        .unwrap();
    (tablet, feed)
}

fn tablet_error(e: &eyre::Report) -> Option<&TabletError> {
    e.downcast_ref::<TabletError>()
}

#[rstest]
fn builder_without_session_is_typed_error() {
    let err = Tablet::<NoopSession>::builder()
        .with_settings(settings())
        .try_build()
        .expect_err("should fail with MissingSession");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSession) => {}
        other => panic!("expected MissingSession, got: {other:?}"),
    }
}

#[rstest]
#[case(0)]
#[case(1025)]
fn builder_rejects_report_length(#[case] report_length: usize) {
    let err = Tablet::builder()
        .with_session(NoopSession::default())
        .with_settings(DeviceSettings {
            report_length,
            ..settings()
        })
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn read_position_decodes_after_warmup() {
    let (mut tablet, feed) = tablet(1);
    let report = [2u8, 0, 0xF4, 0x01, 0xFA, 0x00, 0x64, 0x00];
    feed.push(report.to_vec());
    feed.push(report.to_vec());
    assert_eq!(tablet.read_position(None).unwrap(), ReportStatus::Invalid);
    let status = tablet.read_position(None).unwrap();
    let state = status.state().unwrap();
    assert_eq!((state.position.x, state.position.y), (50.0, 25.0));
    assert_eq!(tablet.last_report(), &report);
}

#[test]
fn short_transfer_is_transport_failure() {
    let (mut tablet, feed) = tablet(0);
    feed.push(vec![2u8, 0, 1]);
    let err = tablet.read_position(None).unwrap_err();
    assert_eq!(
        tablet_error(&err),
        Some(&TabletError::ShortTransfer {
            expected: 8,
            actual: 3
        })
    );
}

#[test]
fn disconnected_feed_reports_device_lost() {
    let (mut tablet, feed) = tablet(0);
    drop(feed);
    let err = tablet.read().unwrap_err();
    assert!(tablet_error(&err).is_some_and(TabletError::is_device_lost));
}

#[test]
fn closed_tablet_fails_every_operation() {
    let (mut tablet, _feed) = tablet(0);
    tablet.close();
    assert!(!tablet.is_open());
    assert_eq!(tablet_error(&tablet.read().unwrap_err()), Some(&TabletError::Closed));
    assert_eq!(tablet_error(&tablet.write(&[1]).unwrap_err()), Some(&TabletError::Closed));
    assert_eq!(
        tablet_error(&tablet.device_string(1).unwrap_err()),
        Some(&TabletError::Closed)
    );
}

#[test]
fn close_from_another_thread_unblocks_read() {
    let (mut tablet, _feed) = tablet(0);
    let close = tablet.close_signal();
    let closer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        close.close();
    });
    let err = tablet.read().unwrap_err();
    assert_eq!(tablet_error(&err), Some(&TabletError::Closed));
    closer.join().unwrap();
}

#[test]
fn measurement_sink_takes_positions() {
    let (mut tablet, feed) = tablet(0);
    feed.push(vec![2u8, 0, 0x64, 0, 0xC8, 0, 0, 0]);
    let mut m = BoundsMeasurement::started();
    let status = tablet.read_position(Some(&mut m)).unwrap();
    assert_eq!(status, ReportStatus::Invalid);
    assert_eq!(m.reports(), 1);
    m.stop();
    assert!(!m.is_active());
}

#[test]
fn init_reads_strings_then_sends_feature_only() {
    let (session, _feed) = SimulatedSession::hid(0x056a, 0x0374, 0xff0d, 1);
    let session = Arc::new(session.with_string(2, "Intuos"));
    let tablet = Tablet::builder()
        .with_shared_session(session.clone())
        .with_init(InitCfg {
            strings: vec![2, 4],
            feature: Some(vec![0x02, 0x02]),
            report: Some(vec![0x05, 0x01]),
        })
        .build()
        .unwrap();
    tablet.init().unwrap();
    assert_eq!(session.string_requests(), vec![2, 4]);
    assert_eq!(session.features(), vec![vec![0x02, 0x02]]);
    assert!(session.writes().is_empty());
}

#[test]
fn init_falls_back_to_output_report() {
    let (session, _feed) = SimulatedSession::usb(0x81);
    let session = Arc::new(session);
    let tablet = Tablet::builder()
        .with_shared_session(session.clone())
        .with_init(InitCfg {
            report: Some(vec![0x05, 0x01]),
            ..InitCfg::default()
        })
        .build()
        .unwrap();
    tablet.init().unwrap();
    assert!(session.features().is_empty());
    assert_eq!(session.writes(), vec![vec![0x05, 0x01]]);
}

#[test]
fn empty_init_is_a_noop() {
    let tablet = Tablet::builder()
        .with_session(NoopSession::default())
        .build()
        .unwrap();
    tablet.init().unwrap();
}

#[test]
fn device_string_narrows_interleaved_bytes() {
    let (session, _feed) = SimulatedSession::usb(0x81);
    let session = session.with_string(1, "WACOM");
    assert_eq!(device_string(&session, 1).unwrap(), "WACOM");
}

#[rstest]
#[case::hid(true)]
#[case::usb(false)]
fn device_string_during_read(#[case] hid: bool) {
    let (session, feed) = if hid {
        SimulatedSession::hid(0x056a, 0x0374, 0, 0)
    } else {
        SimulatedSession::usb(0x81)
    };
    let session = Arc::new(session.with_string(3, "SN1"));
    let reader = {
        let session = session.clone();
        std::thread::spawn(move || {
            let mut buf = [0u8; 8];
            session.read(&mut buf).map(|_| ()).map_err(|e| e.to_string())
        })
    };
    while !session.is_reading() {
        std::thread::yield_now();
    }
    let result = device_string(&*session, 3);
    if hid {
        let err = result.unwrap_err();
        assert_eq!(tablet_error(&err), Some(&TabletError::DeviceBusy));
    } else {
        assert_eq!(result.unwrap(), "SN1");
    }
    feed.push(vec![0u8; 8]);
    reader.join().unwrap().unwrap();
}
