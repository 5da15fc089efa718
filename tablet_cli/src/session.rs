//! Opening the device session: replayed reports or real hardware.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use eyre::Result;
use tablet_config::{Config, ReplayFrame, Transport};
use tablet_core::{ButtonMap, DeviceSettings, InitCfg, Tablet, TabletError};
use tablet_hardware::{ReportFeed, SimulatedSession};
use tablet_traits::DeviceSession;

pub type AnySession = Box<dyn DeviceSession>;

/// Feeds replayed reports into a simulated session, then drops the feed so
/// the reader sees a disconnect.
pub struct Replay {
    handle: Option<JoinHandle<usize>>,
}

impl Replay {
    pub fn spawn(feed: ReportFeed, frames: Vec<ReplayFrame>, shutdown: Arc<AtomicBool>) -> Self {
        let handle = std::thread::spawn(move || {
            let mut sent = 0usize;
            for frame in frames {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                if frame.delay_ms > 0 {
                    std::thread::sleep(Duration::from_millis(frame.delay_ms));
                }
                if !feed.push(frame.bytes) {
                    break;
                }
                sent += 1;
            }
            tracing::debug!(sent, "replay finished");
            sent
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the feeder and return how many reports it pushed.
    pub fn join(mut self) -> usize {
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or(0)
    }
}

/// Open the session the run reads from. With a replay file the transport
/// section only picks the session kind.
pub fn open(
    cfg: &Config,
    replay: Option<&Path>,
    shutdown: Arc<AtomicBool>,
) -> Result<(AnySession, Option<Replay>)> {
    let Some(path) = replay else {
        return Ok((open_device(cfg)?, None));
    };
    let frames = tablet_config::load_replay_csv(path)?;
    tracing::info!(path = %path.display(), frames = frames.len(), "replaying reports");
    let (session, feed) = match cfg.transport {
        Transport::Usb { pipe_id } => SimulatedSession::usb(pipe_id),
        Transport::Hid {
            vendor_id,
            product_id,
            usage_page,
            usage,
        } => SimulatedSession::hid(vendor_id, product_id, usage_page, usage),
    };
    let replay = Replay::spawn(feed, frames, shutdown);
    Ok((Box::new(session), Some(replay)))
}

#[cfg(feature = "hardware")]
fn open_device(cfg: &Config) -> Result<AnySession> {
    match cfg.transport {
        Transport::Hid {
            vendor_id,
            product_id,
            usage_page,
            usage,
        } => {
            let session =
                tablet_hardware::hid::HidSession::open(vendor_id, product_id, usage_page, usage);
            if !session.is_open() {
                return Err(TabletError::Transport(format!(
                    "no HID device {vendor_id:04x}:{product_id:04x} could be opened"
                ))
                .into());
            }
            Ok(Box::new(session))
        }
        Transport::Usb { .. } => Err(TabletError::Config(
            "the usb transport has no native backend; use kind = \"hid\" or --replay".into(),
        )
        .into()),
    }
}

#[cfg(not(feature = "hardware"))]
fn open_device(_cfg: &Config) -> Result<AnySession> {
    Err(TabletError::Config(
        "no --replay given and hardware support is not compiled in (build with --features hardware)"
            .into(),
    )
    .into())
}

/// Build the tablet from the typed config around an open session.
pub fn build_tablet(cfg: &Config, session: AnySession) -> Result<Tablet<AnySession>> {
    Tablet::builder()
        .with_session(session)
        .with_name(cfg.tablet.name.clone())
        .with_settings(DeviceSettings::from(&cfg.settings))
        .with_button_map(ButtonMap::from(&cfg.buttons))
        .with_init(InitCfg::from(&cfg.init))
        .with_warmup_reports(cfg.runner.warmup_reports)
        .build()
}
