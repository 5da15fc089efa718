#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and replay capture parsing for tablet definitions.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The replay CSV loader enforces headers and parses hex report bytes.
use serde::Deserialize;
use serde::de::Deserializer;

/// Largest report length a session buffer holds.
pub const MAX_REPORT_LENGTH: usize = 1024;

/// Pipe id used when a USB transport does not name one.
pub const DEFAULT_USB_PIPE_ID: u8 = 0x81;

/// Replay CSV schema.
///
/// Expected headers:
/// delay_ms,report
///
/// Example:
/// delay_ms,report
/// 0,02 01 10 27 88 13 ff 01
/// 4,02 01 12 27 88 13 00 02
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayRow {
    pub delay_ms: u64,
    pub report: String,
}

/// One parsed replay row: wait `delay_ms`, then deliver `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFrame {
    pub delay_ms: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TabletInfo {
    /// Name used in logs.
    pub name: String,
}

impl Default for TabletInfo {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    Usb {
        #[serde(default = "default_pipe_id")]
        pipe_id: u8,
    },
    Hid {
        vendor_id: u16,
        product_id: u16,
        /// 0 matches any usage page
        #[serde(default)]
        usage_page: u16,
        /// 0 matches any usage
        #[serde(default)]
        usage: u16,
    },
}

fn default_pipe_id() -> u8 {
    DEFAULT_USB_PIPE_ID
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    #[default]
    Default,
    WacomIntuosV2,
    WacomIntuosV3,
    SkipFirstDataByte,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub max_x: u32,
    pub max_y: u32,
    pub max_pressure: u32,
    /// Active area in millimeters
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub skew: f64,
    pub report_length: usize,
    #[serde(default)]
    pub data_format: DataFormat,
    /// Reports carry one leading byte added by a vendor driver
    #[serde(default)]
    pub vendor_wrapped: bool,
    #[serde(default)]
    pub report_id: u8,
    #[serde(default)]
    pub detect_mask: u8,
    #[serde(default)]
    pub ignore_mask: u8,
    #[serde(default)]
    pub click_pressure: u32,
    #[serde(default)]
    pub keep_tip_down: i32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Init {
    /// String descriptor ids read after open
    pub strings: Vec<u8>,
    /// Feature report. Accepts either:
    /// - array of bytes: [0x02, 0x02]
    /// - hex string: "02 02"
    #[serde(deserialize_with = "de_bytes")]
    pub feature: Option<Vec<u8>>,
    /// Output report, sent only when no feature report is configured
    #[serde(deserialize_with = "de_bytes")]
    pub report: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Buttons {
    /// Destination button (1-based) per source bit; 0 leaves a bit unmapped
    pub map: Vec<u8>,
}

impl Default for Buttons {
    fn default() -> Self {
        Self { map: vec![1, 2, 3] }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    pub enabled: bool,
    pub latency_ms: f64,
    pub threshold: f64,
    /// Timed filter tick interval
    pub interval_ms: f64,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            enabled: false,
            latency_ms: 2.0,
            threshold: 0.9,
            interval_ms: 4.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Runner {
    /// Reports discarded after the device opens
    pub warmup_reports: u32,
}

impl Default for Runner {
    fn default() -> Self {
        Self { warmup_reports: 5 }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tablet: TabletInfo,
    pub transport: Transport,
    pub settings: Settings,
    #[serde(default)]
    pub init: Init,
    #[serde(default)]
    pub buttons: Buttons,
    #[serde(default)]
    pub smoothing: Smoothing,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: Runner,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BytesToml {
    List(Vec<u8>),
    Hex(String),
}

fn de_bytes<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<BytesToml> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(BytesToml::List(v)) => Ok(Some(v)),
        Some(BytesToml::Hex(s)) => parse_hex(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Parse hex bytes, with or without whitespace between them ("02 0a" or "020a").
pub fn parse_hex(s: &str) -> eyre::Result<Vec<u8>> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        eyre::bail!("hex string has an odd number of digits: {s:?}");
    }
    hex::decode(&digits).map_err(|e| eyre::eyre!("invalid hex in {s:?}: {e}"))
}

pub fn load_replay_csv(path: &std::path::Path) -> eyre::Result<Vec<ReplayFrame>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open replay CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["delay_ms", "report"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "replay CSV must have headers 'delay_ms,report', got: {}",
            actual.join(",")
        );
    }

    let mut frames = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReplayRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        let bytes = parse_hex(&row.report)
            .map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        if bytes.is_empty() {
            eyre::bail!("invalid CSV row {}: empty report", idx + 2);
        }
        frames.push(ReplayFrame {
            delay_ms: row.delay_ms,
            bytes,
        });
    }
    Ok(frames)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        let s = &self.settings;
        if s.report_length == 0 || s.report_length > MAX_REPORT_LENGTH {
            eyre::bail!("settings.report_length must be in 1..={MAX_REPORT_LENGTH}");
        }
        if s.width.is_nan() || s.height.is_nan() || s.skew.is_nan() {
            eyre::bail!("settings.width, height and skew must be numbers");
        }
        if s.keep_tip_down < 0 {
            eyre::bail!("settings.keep_tip_down must be >= 0");
        }

        if self.buttons.map.len() > 8 {
            eyre::bail!("buttons.map has at most 8 entries, got {}", self.buttons.map.len());
        }
        if let Some(b) = self.buttons.map.iter().find(|&&b| b > 32) {
            eyre::bail!("buttons.map entries must be in 0..=32, got {b}");
        }

        if let Some(f) = &self.init.feature
            && f.is_empty()
        {
            eyre::bail!("init.feature must not be empty");
        }
        if let Some(r) = &self.init.report
            && r.is_empty()
        {
            eyre::bail!("init.report must not be empty");
        }

        let sm = &self.smoothing;
        if !(sm.threshold > 0.0 && sm.threshold < 1.0) {
            eyre::bail!("smoothing.threshold must be in (0.0, 1.0)");
        }
        if !sm.latency_ms.is_finite() || sm.latency_ms < 0.0 {
            eyre::bail!("smoothing.latency_ms must be >= 0");
        }
        if !sm.interval_ms.is_finite() || sm.interval_ms <= 0.0 {
            eyre::bail!("smoothing.interval_ms must be > 0");
        }

        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}
