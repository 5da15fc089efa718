mod cli;
mod error_fmt;
mod run;
mod session;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::json;
use tablet_config::{Config, Transport};
use tablet_core::{
    ButtonMap, DecoderState, DeviceSettings, ReportStatus, SmoothingCfg, TabletError,
    decode_report, latency_from_weight, weight_from_latency,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), tablet = %cfg.tablet.name, "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::Run { replay, max_ms } => {
            let summary = run::run(&cfg, replay.as_deref(), max_ms, shutdown, cli.json)?;
            tracing::info!(
                outputs = summary.outputs,
                valid = summary.counts.valid,
                last_x = summary.last.map(|s| s.position.x),
                last_y = summary.last.map(|s| s.position.y),
                "run finished"
            );
        }
        Commands::Measure { replay, max_ms } => {
            let summary = run::measure(&cfg, replay.as_deref(), max_ms, shutdown, cli.json)?;
            tracing::info!(
                reports = summary.measurement.reports(),
                rejected = summary.counts.position_invalid + summary.counts.ignored,
                "measurement finished"
            );
        }
        Commands::Decode { hex, warmup } => decode_once(&cfg, &hex, warmup, cli.json)?,
        Commands::Latency {
            weight,
            latency_ms,
            interval_ms,
            threshold,
        } => latency(&cfg, weight, latency_ms, interval_ms, threshold, cli.json)?,
        Commands::SelfCheck => self_check(&cfg, cli.json)?,
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = tablet_config::load_toml(&text)
        .map_err(|e| TabletError::Config(format!("{}: {}", path.display(), e.message())))?;
    cfg.validate()
        .map_err(|e| TabletError::Config(e.to_string()))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout only carries command output. The
/// optional file layer always writes JSON lines.
fn init_tracing(json: bool, level: &str, logging: &tablet_config::Logging) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("invalid --log-level")?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    layers.push(console);

    if let Some(file) = &logging.file {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| TabletError::Config(format!("logging.file {file:?} has no file name")))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging
            .level
            .as_deref()
            .unwrap_or("info")
            .parse::<LevelFilter>()
            .map_err(|e| TabletError::Config(format!("logging.level: {e}")))?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_level)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(())
}

fn decode_once(cfg: &Config, hex: &str, warmup: bool, json_mode: bool) -> Result<()> {
    let bytes = tablet_config::parse_hex(hex)?;
    let settings = DeviceSettings::from(&cfg.settings);
    let Some(report) = bytes.get(..settings.report_length) else {
        return Err(TabletError::ShortTransfer {
            expected: settings.report_length,
            actual: bytes.len(),
        }
        .into());
    };
    let mut state = DecoderState::new(if warmup { cfg.runner.warmup_reports } else { 0 });
    let status = decode_report(
        report,
        &settings,
        &ButtonMap::from(&cfg.buttons),
        &mut state,
        None,
        std::time::Instant::now(),
    );

    match (&status, json_mode) {
        (ReportStatus::Valid(s), true) => println!(
            "{}",
            json!({
                "status": status.name(),
                "x": s.position.x,
                "y": s.position.y,
                "pressure": s.pressure,
                "buttons": s.buttons,
                "tip": s.tip_down(),
            })
        ),
        (ReportStatus::Valid(s), false) => println!(
            "{}: x={:.3} y={:.3} pressure={:.3} buttons={:#06b}",
            status.name(),
            s.position.x,
            s.position.y,
            s.pressure,
            s.buttons
        ),
        (_, true) => println!("{}", json!({ "status": status.name() })),
        (_, false) => println!("{}", status.name()),
    }
    Ok(())
}

fn latency(
    cfg: &Config,
    weight: Option<f64>,
    latency_ms: Option<f64>,
    interval_ms: Option<f64>,
    threshold: Option<f64>,
    json_mode: bool,
) -> Result<()> {
    let base = SmoothingCfg::from(&cfg.smoothing);
    let interval = interval_ms.unwrap_or(base.interval_ms);
    let threshold = threshold.unwrap_or(base.threshold);
    if !(threshold > 0.0 && threshold < 1.0) {
        eyre::bail!("threshold must be in (0, 1), got {threshold}");
    }
    if !(interval.is_finite() && interval > 0.0) {
        eyre::bail!("interval must be > 0 ms, got {interval}");
    }

    let (weight, latency) = match weight {
        Some(w) => {
            if !(w > 0.0 && w < 1.0) {
                eyre::bail!("weight must be in (0, 1), got {w}");
            }
            (w, latency_from_weight(w, interval, threshold))
        }
        None => {
            let latency = latency_ms.unwrap_or(base.latency_ms);
            if !(latency.is_finite() && latency >= 0.0) {
                eyre::bail!("latency must be >= 0 ms, got {latency}");
            }
            (weight_from_latency(latency, interval, threshold), latency)
        }
    };

    if json_mode {
        println!(
            "{}",
            json!({
                "weight": weight,
                "latency_ms": latency,
                "interval_ms": interval,
                "threshold": threshold,
            })
        );
    } else {
        println!(
            "weight={weight:.6} latency_ms={latency:.3} interval_ms={interval:.3} threshold={threshold:.3}"
        );
    }
    Ok(())
}

fn self_check(cfg: &Config, json_mode: bool) -> Result<()> {
    let settings = DeviceSettings::from(&cfg.settings);
    if !settings.is_configured() {
        return Err(TabletError::Config(
            "settings.max_x, max_y, max_pressure, width and height must be set".into(),
        )
        .into());
    }
    let transport = match cfg.transport {
        Transport::Usb { pipe_id } => format!("usb pipe {pipe_id:#04x}"),
        Transport::Hid {
            vendor_id,
            product_id,
            usage_page,
            usage,
        } => format!("hid {vendor_id:04x}:{product_id:04x} usage {usage_page:#06x}/{usage:#04x}"),
    };
    let buttons = ButtonMap::from(&cfg.buttons);

    if json_mode {
        println!(
            "{}",
            json!({
                "status": "ok",
                "tablet": cfg.tablet.name,
                "transport": transport,
                "data_format": format!("{:?}", settings.data_format),
                "report_length": settings.report_length,
                "area": { "width": settings.width, "height": settings.height },
                "buttons": buttons.entries().to_vec(),
                "smoothing": cfg.smoothing.enabled,
            })
        );
    } else {
        println!("tablet: {}", cfg.tablet.name);
        println!("transport: {transport}");
        println!(
            "format: {:?}, {} byte reports",
            settings.data_format, settings.report_length
        );
        println!("area: {:.1} x {:.1}", settings.width, settings.height);
        println!("buttons: {:?}", buttons.entries());
        println!("smoothing: {}", if cfg.smoothing.enabled { "on" } else { "off" });
        println!("OK");
    }
    Ok(())
}
