//! An open tablet: device session plus decoding state.
//!
//! `Tablet` owns the per-session decoder counters and the read buffer. It is
//! moved into the read thread (`reader::ReportReader`); control operations
//! that must work while a read is blocked (close, device strings on USB) go
//! through the shared session handle.

use std::marker::PhantomData;
use std::sync::Arc;

use tablet_traits::clock::{Clock, MonotonicClock};
use tablet_traits::{CloseSignal, DeviceSession};

use crate::config::{ButtonMap, DeviceSettings, InitCfg, MAX_REPORT_LENGTH};
use crate::decoder::{self, DEFAULT_WARMUP_REPORTS, DecoderState, ReportStatus};
use crate::error::{BuildError, Result, TabletError};
use crate::hw_error::map_hw_error;
use crate::measurement::MeasurementSink;
use crate::report::RawReport;
use crate::util::{hex, narrow_string};

/// Read a string descriptor and narrow it.
///
/// On HID the request shares the read path, so it fails with `DeviceBusy`
/// while a read is in flight instead of waiting for it.
pub fn device_string<S: DeviceSession + ?Sized>(session: &S, id: u8) -> Result<String> {
    if !session.is_open() {
        return Err(eyre::Report::new(TabletError::Closed));
    }
    if session.kind().is_hid() && session.is_reading() {
        return Err(eyre::Report::new(TabletError::DeviceBusy));
    }
    let bytes = session
        .string_request(id)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
    Ok(narrow_string(&bytes))
}

pub struct Tablet<S: DeviceSession> {
    name: String,
    session: Arc<S>,
    settings: DeviceSettings,
    button_map: ButtonMap,
    init: InitCfg,
    decoder: DecoderState,
    clock: Arc<dyn Clock + Send + Sync>,
    raw: RawReport,
}

impl<S: DeviceSession> std::fmt::Debug for Tablet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tablet")
            .field("name", &self.name)
            .field("kind", &self.session.kind())
            .field("open", &self.session.is_open())
            .field("settings", &self.settings)
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl<S: DeviceSession> Tablet<S> {
    /// Start building a Tablet.
    pub fn builder() -> TabletBuilder<S, Missing> {
        TabletBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn button_map(&self) -> &ButtonMap {
        &self.button_map
    }

    pub fn decoder_state(&self) -> &DecoderState {
        &self.decoder
    }

    /// Shared session handle, usable from other threads.
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Clock used for report timestamps and read retry delays.
    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn close_signal(&self) -> CloseSignal {
        self.session.close_signal()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    /// Bytes of the last successful read.
    pub fn last_report(&self) -> &[u8] {
        self.raw.as_slice()
    }

    /// Send the init sequence: descriptor string reads, then the feature
    /// report if configured, otherwise the output report if configured.
    pub fn init(&self) -> Result<()> {
        for &id in &self.init.strings {
            let value = self.device_string(id)?;
            tracing::debug!(tablet = %self.name, id, %value, "init string");
        }
        if let Some(feature) = &self.init.feature {
            self.session
                .set_feature(feature)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
            tracing::debug!(tablet = %self.name, bytes = %hex(feature), "init feature report");
        } else if let Some(report) = &self.init.report {
            self.write(report)?;
            tracing::debug!(tablet = %self.name, bytes = %hex(report), "init output report");
        }
        Ok(())
    }

    pub fn device_string(&self, id: u8) -> Result<String> {
        device_string(&*self.session, id)
    }

    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.session.is_open() {
            return Err(eyre::Report::new(TabletError::Closed));
        }
        self.session
            .write(buf)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
    }

    /// Blocking read of one `report_length` report.
    ///
    /// Short transfers are transport failures.
    pub fn read(&mut self) -> Result<&[u8]> {
        if !self.session.is_open() {
            return Err(eyre::Report::new(TabletError::Closed));
        }
        let expected = self.settings.report_length;
        let n = self
            .session
            .read(self.raw.fill_slice(expected))
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        if n < expected {
            return Err(eyre::Report::new(TabletError::ShortTransfer {
                expected,
                actual: n,
            }));
        }
        self.raw.set_len(expected);
        tracing::trace!(tablet = %self.name, bytes = %hex(self.raw.as_slice()), "read");
        Ok(self.raw.as_slice())
    }

    /// Read one report and decode it.
    pub fn read_position(&mut self, sink: Option<&mut dyn MeasurementSink>) -> Result<ReportStatus> {
        self.read()?;
        let status = decoder::decode_report(
            self.raw.as_slice(),
            &self.settings,
            &self.button_map,
            &mut self.decoder,
            sink,
            self.clock.now(),
        );
        if !status.is_valid() {
            tracing::trace!(tablet = %self.name, status = status.name(), "report rejected");
        }
        Ok(status)
    }

    /// Close the session. Safe from any thread; an in-flight read fails.
    pub fn close(&self) {
        self.session.close();
        tracing::debug!(tablet = %self.name, "tablet closed");
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Tablet`. Validated on `build()`.
pub struct TabletBuilder<S, State> {
    session: Option<Arc<S>>,
    name: Option<String>,
    settings: Option<DeviceSettings>,
    button_map: Option<ButtonMap>,
    init: Option<InitCfg>,
    warmup_reports: Option<u32>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _state: PhantomData<State>,
}

impl<S> Default for TabletBuilder<S, Missing> {
    fn default() -> Self {
        Self {
            session: None,
            name: None,
            settings: None,
            button_map: None,
            init: None,
            warmup_reports: None,
            clock: None,
            _state: PhantomData,
        }
    }
}

impl<S, State> TabletBuilder<S, State> {
    fn retype<Next>(self) -> TabletBuilder<S, Next> {
        TabletBuilder {
            session: self.session,
            name: self.name,
            settings: self.settings,
            button_map: self.button_map,
            init: self.init,
            warmup_reports: self.warmup_reports,
            clock: self.clock,
            _state: PhantomData,
        }
    }

    pub fn with_session(mut self, session: S) -> TabletBuilder<S, Set> {
        self.session = Some(Arc::new(session));
        self.retype()
    }

    /// Share an existing session handle.
    pub fn with_shared_session(mut self, session: Arc<S>) -> TabletBuilder<S, Set> {
        self.session = Some(session);
        self.retype()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_settings(mut self, settings: DeviceSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_button_map(mut self, map: ButtonMap) -> Self {
        self.button_map = Some(map);
        self
    }

    pub fn with_init(mut self, init: InitCfg) -> Self {
        self.init = Some(init);
        self
    }

    /// Reports to reject after open; defaults to `DEFAULT_WARMUP_REPORTS`.
    pub fn with_warmup_reports(mut self, n: u32) -> Self {
        self.warmup_reports = Some(n);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<S: DeviceSession, State> TabletBuilder<S, State> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Tablet<S>> {
        let session = self
            .session
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSession))?;
        let settings = self.settings.unwrap_or_default();
        if !(1..=MAX_REPORT_LENGTH).contains(&settings.report_length) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "report_length must be in 1..=1024",
            )));
        }
        if settings.keep_tip_down < 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "keep_tip_down must be >= 0",
            )));
        }
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let name = self.name.unwrap_or_else(|| "Unknown".to_string());
        tracing::debug!(
            tablet = %name,
            kind = ?session.kind(),
            configured = settings.is_configured(),
            "tablet built"
        );
        Ok(Tablet {
            name,
            session,
            settings,
            button_map: self.button_map.unwrap_or_default(),
            init: self.init.unwrap_or_default(),
            decoder: DecoderState::new(self.warmup_reports.unwrap_or(DEFAULT_WARMUP_REPORTS)),
            clock,
            raw: RawReport::default(),
        })
    }
}

impl<S: DeviceSession> TabletBuilder<S, Set> {
    pub fn build(self) -> Result<Tablet<S>> {
        self.try_build()
    }
}
