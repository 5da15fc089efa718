//! Human-readable error descriptions and structured JSON error formatting.

use tablet_core::error::{BuildError, TabletError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSession => {
                "What happened: No device session was provided to the tablet.\nLikely causes: The device failed to open or was not wired into the builder.\nHow to fix: Check the [transport] section and that the tablet is plugged in, or pass --replay.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid tablet settings ({msg}).\nLikely causes: Out-of-range values in [settings].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TabletError>() {
        return match te {
            TabletError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing sections or out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
            ),
            TabletError::Disconnected | TabletError::Closed => {
                "What happened: The tablet went away.\nLikely causes: Device unplugged, permissions revoked, or the replay ran out of reports.\nHow to fix: Reconnect the tablet and rerun.".to_string()
            }
            TabletError::DeviceBusy => {
                "What happened: The device was busy with a report read.\nLikely causes: A string request was issued on a HID session while reading.\nHow to fix: Query device strings before starting the reader.".to_string()
            }
            TabletError::ShortTransfer { expected, actual } => format!(
                "What happened: Report was {actual} bytes, expected {expected}.\nLikely causes: settings.report_length does not match the device.\nHow to fix: Check the report length with --log-level=trace and fix [settings]."
            ),
            TabletError::Timeout => {
                "What happened: The device did not answer in time.\nLikely causes: Wrong interface selected or the device is stalled.\nHow to fix: Check usage_page/usage in [transport] and replug the tablet.".to_string()
            }
            TabletError::Transport(msg) => format!(
                "What happened: Transport error ({msg}).\nLikely causes: USB/HID failure or missing permissions.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("csv must have headers") {
        return "Invalid headers in replay CSV. Expected 'delay_ms,report'.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<TabletError>() {
        Some(TabletError::Config(_)) => 3,
        Some(TabletError::Disconnected | TabletError::Closed) => 4,
        Some(TabletError::Transport(_) | TabletError::ShortTransfer { .. } | TabletError::Timeout) => 5,
        Some(TabletError::DeviceBusy) => 6,
        None => 1,
    }
}

/// Name used in the `reason` field of JSON errors.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<TabletError>() {
        Some(TabletError::Config(_)) => "InvalidConfig",
        Some(TabletError::Disconnected) => "Disconnected",
        Some(TabletError::Closed) => "Closed",
        Some(TabletError::Transport(_)) => "Transport",
        Some(TabletError::ShortTransfer { .. }) => "ShortTransfer",
        Some(TabletError::Timeout) => "Timeout",
        Some(TabletError::DeviceBusy) => "DeviceBusy",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(TabletError::ShortTransfer { expected, actual }) = err.downcast_ref::<TabletError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "expected": expected, "actual": actual },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
