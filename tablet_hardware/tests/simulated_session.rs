use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::rstest;
use tablet_hardware::{DEFAULT_USB_PIPE_ID, SimulatedSession};
use tablet_traits::{DeviceSession, SessionKind};

#[test]
fn close_unblocks_in_flight_read() {
    let (session, _feed) = SimulatedSession::hid(0x056a, 0x0374, 0xff0d, 1);
    let session = Arc::new(session);
    let reader = {
        let session = session.clone();
        thread::spawn(move || {
            let mut buf = [0u8; 10];
            session.read(&mut buf)
        })
    };

    // Wait until the reader is parked inside read()
    let deadline = Instant::now() + Duration::from_secs(1);
    while !session.is_reading() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(session.is_reading());

    let start = Instant::now();
    session.close_signal().close();
    let res = reader.join().expect("reader thread");
    assert!(res.is_err(), "in-flight read must fail after close");
    assert!(start.elapsed() < Duration::from_millis(200));
    assert!(!session.is_open());
    assert!(!session.is_reading());
}

#[rstest]
#[case(SessionKind::Usb { pipe_id: DEFAULT_USB_PIPE_ID })]
#[case(SessionKind::Hid { vendor_id: 0x28bd, product_id: 0x0914, usage_page: 0xff0a, usage: 1 })]
fn writes_and_features_are_recorded(#[case] kind: SessionKind) {
    let (session, _feed) = SimulatedSession::new(kind);
    assert_eq!(session.kind(), kind);
    session.write(&[0x02, 0xb0, 0x04]).unwrap();
    session.set_feature(&[0x02, 0x02]).unwrap();
    assert_eq!(session.writes(), vec![vec![0x02, 0xb0, 0x04]]);
    assert_eq!(session.features(), vec![vec![0x02, 0x02]]);
}

#[test]
fn short_report_copies_available_bytes() {
    let (session, feed) = SimulatedSession::usb(DEFAULT_USB_PIPE_ID);
    feed.push(vec![7u8, 8]);
    let mut buf = [0u8; 8];
    assert_eq!(session.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], &[7, 8]);
}
