//! `run` and `measure`: the reader/ticker pipeline driven from the CLI.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eyre::Result;
use serde_json::json;
use tablet_config::Config;
use tablet_core::filter::smoothing::STALE_GAP;
use tablet_core::util::interval_from_ms;
use tablet_core::{
    BoundsMeasurement, MeasurementSink, PointerState, ReaderCounts, ReportFilterChain,
    ReportReader, SmoothingCfg, SmoothingFilter, TabletError, Ticker, TimedFilterChain,
};
use tablet_traits::MonotonicClock;

use crate::session;

/// How often the main thread polls the ticker output.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub struct RunSummary {
    pub counts: ReaderCounts,
    pub outputs: u64,
    pub last: Option<PointerState>,
}

fn same_output(a: &PointerState, b: &PointerState) -> bool {
    a.position == b.position && a.pressure == b.pressure && a.buttons == b.buttons
}

fn print_state(state: &PointerState, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "x": state.position.x,
                "y": state.position.y,
                "pressure": state.pressure,
                "buttons": state.buttons,
                "tip": state.tip_down(),
            })
        );
    } else {
        println!(
            "x={:.3} y={:.3} pressure={:.3} buttons={:#06b}",
            state.position.x, state.position.y, state.pressure, state.buttons
        );
    }
}

fn print_counts(counts: &ReaderCounts, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json!({
                "valid": counts.valid,
                "invalid": counts.invalid,
                "position_invalid": counts.position_invalid,
                "ignored": counts.ignored,
                "transport_failures": counts.transport_failures,
            })
        );
    } else {
        println!(
            "reports: valid={} invalid={} position_invalid={} ignored={} transport_failures={}",
            counts.valid,
            counts.invalid,
            counts.position_invalid,
            counts.ignored,
            counts.transport_failures
        );
    }
}

fn past_deadline(start: Instant, max_ms: Option<u64>) -> bool {
    max_ms.is_some_and(|ms| start.elapsed() >= Duration::from_millis(ms))
}

pub fn run(
    cfg: &Config,
    replay: Option<&Path>,
    max_ms: Option<u64>,
    shutdown: Arc<AtomicBool>,
    json_mode: bool,
) -> Result<RunSummary> {
    let (session, feeder) = session::open(cfg, replay, shutdown.clone())?;
    let tablet = session::build_tablet(cfg, session)?;
    if !tablet.is_configured() {
        return Err(TabletError::Config(
            "settings.max_x, max_y, max_pressure, width and height must be set before running"
                .into(),
        )
        .into());
    }
    tablet.init()?;
    tracing::info!(tablet = %tablet.name(), "tablet ready");

    let smoothing = SmoothingCfg::from(&cfg.smoothing);
    let (mut chain, publisher) = TimedFilterChain::new(smoothing.interval_ms);
    if smoothing.enabled {
        let filter = SmoothingFilter::new(&smoothing, Arc::new(MonotonicClock::new()));
        tracing::debug!(weight = filter.weight(), "smoothing enabled");
        chain.push(Box::new(filter));
    }
    let ticker = Ticker::spawn(chain, interval_from_ms(smoothing.interval_ms), MonotonicClock::new());
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, None);

    let start = Instant::now();
    let mut last: Option<PointerState> = None;
    let mut outputs = 0u64;
    let mut emit = |state: PointerState| {
        if last.as_ref().is_some_and(|prev| same_output(prev, &state)) {
            return;
        }
        print_state(&state, json_mode);
        outputs += 1;
        last = Some(state);
    };

    loop {
        if let Some(state) = ticker.latest() {
            emit(state);
        }
        if shutdown.load(Ordering::Relaxed) || reader.is_finished() || past_deadline(start, max_ms) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let device_lost = reader.is_finished() && feeder.is_none();
    if reader.is_finished() {
        // Let the timed chain settle on the final target: two equal outputs
        // in a row, or the smoothing stale gap, whichever comes first.
        let deadline = Instant::now() + STALE_GAP;
        let mut prev: Option<PointerState> = None;
        while Instant::now() < deadline {
            std::thread::sleep(POLL_INTERVAL);
            if let Some(state) = ticker.latest() {
                emit(state);
                if prev.is_some_and(|p| same_output(&p, &state)) {
                    break;
                }
                prev = Some(state);
            }
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    let counts = reader.stats();
    drop(reader);
    drop(ticker);
    if let Some(feeder) = feeder {
        feeder.join();
    }
    print_counts(&counts, json_mode);

    if device_lost {
        return Err(TabletError::Disconnected.into());
    }
    Ok(RunSummary {
        counts,
        outputs,
        last,
    })
}

pub struct MeasureSummary {
    pub counts: ReaderCounts,
    pub measurement: BoundsMeasurement,
}

pub fn measure(
    cfg: &Config,
    replay: Option<&Path>,
    max_ms: Option<u64>,
    shutdown: Arc<AtomicBool>,
    json_mode: bool,
) -> Result<MeasureSummary> {
    let (session, feeder) = session::open(cfg, replay, shutdown.clone())?;
    let tablet = session::build_tablet(cfg, session)?;
    tablet.init()?;

    let bounds = Arc::new(Mutex::new(BoundsMeasurement::started()));
    let sink: Box<dyn MeasurementSink + Send> = Box::new(bounds.clone());
    // Measured reports never reach the chain; it only keeps the publisher connected.
    let (_chain, publisher) = TimedFilterChain::new(cfg.smoothing.interval_ms);
    let reader = ReportReader::spawn(tablet, ReportFilterChain::new(), publisher, Some(sink));

    let start = Instant::now();
    while !(shutdown.load(Ordering::Relaxed) || reader.is_finished() || past_deadline(start, max_ms)) {
        std::thread::sleep(POLL_INTERVAL);
    }
    shutdown.store(true, Ordering::Relaxed);
    let counts = reader.stats();
    drop(reader);
    if let Some(feeder) = feeder {
        feeder.join();
    }

    let mut measurement = bounds.lock().map(|m| m.clone()).unwrap_or_default();
    measurement.stop();
    print_measurement(&measurement, json_mode);
    Ok(MeasureSummary {
        counts,
        measurement,
    })
}

fn print_measurement(m: &BoundsMeasurement, json_mode: bool) {
    let Some((min, max)) = m.bounds() else {
        if json_mode {
            println!("{}", json!({ "reports": m.reports(), "bounds": null }));
        } else {
            println!("no positions measured");
        }
        return;
    };
    if json_mode {
        println!(
            "{}",
            json!({
                "reports": m.reports(),
                "buttons_seen": m.buttons_seen(),
                "min": { "x": min.x, "y": min.y },
                "max": { "x": max.x, "y": max.y },
                "width": m.width(),
                "height": m.height(),
            })
        );
    } else {
        println!("reports: {}", m.reports());
        println!("min: x={:.3} y={:.3}", min.x, min.y);
        println!("max: x={:.3} y={:.3}", max.x, max.y);
        println!("size: {:.3} x {:.3}", m.width(), m.height());
    }
}
