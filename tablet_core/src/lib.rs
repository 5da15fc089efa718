#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Tablet report pipeline (transport-agnostic).
//!
//! Turns raw reports from a pen tablet into pointer states and smooths them
//! over time. All device I/O goes through `tablet_traits::DeviceSession`.
//!
//! ## Architecture
//!
//! - **Reports**: per-format field extraction (`report` module)
//! - **Decoding**: warm-up, masks, tip synthesis and hold, button remap,
//!   geometry, measurement interception (`decoder` module)
//! - **Filters**: filter contract, report and timed chains, smoothing
//!   (`filter` module)
//! - **Session**: `Tablet` wraps an open session with its decoder state
//!   (`tablet` module)
//! - **Threads**: `ReportReader` reads and publishes, `Ticker` advances the
//!   timed chain (`reader`, `ticker` modules)
//!
//! ## Threading
//!
//! Report states reach the tick thread only as immutable snapshots over a
//! channel; the timed filters are owned and mutated by the tick thread alone.

pub mod config;
pub mod conversions;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod hw_error;
pub mod measurement;
pub mod mocks;
pub mod reader;
pub mod report;
pub mod state;
pub mod tablet;
pub mod ticker;
pub mod util;

pub use config::{ButtonMap, DataFormat, DeviceSettings, InitCfg, SmoothingCfg};
pub use decoder::{DecoderState, ReportStatus, decode_report};
pub use error::{BuildError, Result, TabletError};
pub use filter::{
    Filter, FilterKind, ReportFilterChain, SmoothingFilter, TargetPublisher, TimedFilterChain,
    latency_from_weight, weight_from_latency,
};
pub use measurement::{BoundsMeasurement, MeasurementSink};
pub use reader::{ReaderCounts, ReportReader};
pub use state::{Point, PointerState};
pub use tablet::{Tablet, TabletBuilder, device_string};
pub use ticker::Ticker;
