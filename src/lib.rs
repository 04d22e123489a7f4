#![warn(missing_docs)]
//! Library components for enumerating and toggling HID-class devices
//! through `pnputil` and a PowerShell scripting host.
//!
//! The pieces fit together as invoke → capture → parse → repair → record:
//! [`command`] spawns the scripting host and captures its streams,
//! [`hid`] builds the pnputil invocations and parses the captured
//! listing into records, and [`encoding`] undoes the console-codepage
//! corruption in the captured text.
use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

pub mod command;
pub mod config;
pub mod encoding;
pub mod hid;

pub use config::{AppConfig, Args, ToolConfig};
pub use hid::{Enumeration, HidDevice, HidDevices, HidError, ToggleOutcome};

/// Setup logging to stdout
/// (Tracing is a bit more involving to set up but will provide much more feature if needed)
pub fn setup_tracing(args: &Args) -> Result<()> {
    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer =
        EnvFilter::try_new(args.verbose.level_filter()).context("Initializing log filter")?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}
