//! Structs and helpers for parameters and configuration.
use ::structopt::clap::AppSettings;
use anyhow::{bail, Result};
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use structopt;
use tracing::debug;

/// Instance ID toggled by the demo binary when none is given on the
/// command line or in the config file.
const DEFAULT_INSTANCE_ID: &str = r"USB\VID_09DA&PID_1686&MI_01\6&34cedc73&0&0001";

/// Contract with the external utility and scripting host. Every value is
/// load-bearing for parsing (the tool's install path, its output
/// codepages, the localized status token) and is configuration rather
/// than a compiled-in literal so another locale or tool location only
/// needs an override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the pnputil executable.
    pub pnputil_path: String,
    /// Scripting-host command line the script text is appended to.
    pub host_command: String,
    /// Device class passed to `/enum-devices`.
    pub device_class: String,
    /// Console (OEM) codepage the utility emits.
    pub console_codepage: String,
    /// Codepage the capturing environment reads the output in.
    pub display_codepage: String,
    /// Localized token marking a successful enable/disable status line.
    pub success_token: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            pnputil_path: r"C:\Windows\SysNative\pnputil.exe".into(),
            host_command: "powershell -NoProfile -NonInteractive -Command".into(),
            device_class: "HIDClass".into(),
            console_codepage: "cp866".into(),
            display_codepage: "windows-1251".into(),
            success_token: "успешно".into(),
        }
    }
}

/// Validated application configuration produced by [`Args::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// External-tool contract.
    pub tool: ToolConfig,
    /// Instance ID the demo toggles.
    pub instance_id: String,
    /// Disable the device instead of enabling it.
    pub disable: bool,
}

// Courtesy of structopt_flags crate
#[derive(structopt::StructOpt, Debug, Clone, Default)]
/// Repeatable verbosity flags mapped onto a tracing filter directive.
pub struct Verbosity {
    /// Increase the output's verbosity level
    ///
    /// Pass many times to increase verbosity level, up to 2.
    #[structopt(
        name = "verbose",
        long = "verbose",
        short = "v",
        parse(from_occurrences),
        conflicts_with = "quiet",
        global = true
    )]
    verbose: u8,

    /// Decrease the output's verbosity level.
    ///
    /// Pass many times to silence the log completely.
    #[structopt(
        name = "quiet",
        long = "quiet",
        short = "q",
        parse(from_occurrences),
        global = true
    )]
    quiet: u8,
}

impl Verbosity {
    /// Filter directive for the flag count: `info` with no flags, up to
    /// `trace` with `-vv` and down to `off` with `-qqq`.
    pub fn level_filter(&self) -> &'static str {
        match i16::from(self.verbose) - i16::from(self.quiet) {
            i16::MIN..=-3 => "off",
            -2 => "error",
            -1 => "warn",
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(structopt::StructOpt, Serialize, Deserialize, Debug, Clone, Default)]
/// Enumerate and toggle HID-class devices through pnputil
///
/// Prints the number of connected HID-class devices, then enables (or
/// with --disable, disables) the device with the given instance ID.
/// Every option may also come from the environment or a TOML config
/// file; command line wins over file, file wins over built-in defaults.
#[structopt(global_settings(&[AppSettings::ColoredHelp, AppSettings::ColorAuto]))]
pub struct Args {
    /// Path to the pnputil executable
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub pnputil_path: Option<String>,

    /// Scripting host command line the pnputil call is passed to
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub host_command: Option<String>,

    /// Device class to enumerate
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub device_class: Option<String>,

    /// Console (OEM) codepage the utility emits
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub console_codepage: Option<String>,

    /// Codepage the captured text is read in
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub display_codepage: Option<String>,

    /// Localized token marking a successful status line
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env)]
    pub success_token: Option<String>,

    /// Instance ID of the device to toggle
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(short, long)]
    pub instance_id: Option<String>,

    /// Disable the device instead of enabling it
    #[serde(default, skip_serializing_if = "is_false")]
    #[structopt(long)]
    pub disable: bool,

    /// Configuration file path
    ///
    /// Defaults to hidswitch.toml in the platform config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[structopt(long, env, parse(from_os_str))]
    pub config_file: Option<PathBuf>,

    #[structopt(flatten)]
    #[serde(skip)]
    #[allow(missing_docs)]
    pub verbose: Verbosity,
}

impl Args {
    /// Overlay the given overrides onto the default tool contract and
    /// check the result is usable.
    pub fn validate(self) -> Result<AppConfig> {
        let defaults = ToolConfig::default();
        let tool = ToolConfig {
            pnputil_path: self.pnputil_path.unwrap_or(defaults.pnputil_path),
            host_command: self.host_command.unwrap_or(defaults.host_command),
            device_class: self.device_class.unwrap_or(defaults.device_class),
            console_codepage: self.console_codepage.unwrap_or(defaults.console_codepage),
            display_codepage: self.display_codepage.unwrap_or(defaults.display_codepage),
            success_token: self.success_token.unwrap_or(defaults.success_token),
        };
        if tool.success_token.is_empty() {
            // An empty token makes every status line read as a success.
            bail!("Success token must not be empty");
        }
        if tool.device_class.trim().is_empty() {
            bail!("Device class must not be empty");
        }
        let config = AppConfig {
            tool,
            instance_id: self
                .instance_id
                .unwrap_or_else(|| DEFAULT_INSTANCE_ID.to_owned()),
            disable: self.disable,
        };
        debug!("Validated configuration : {:#?}", config);
        Ok(config)
    }
}

/// Default configuration file path (`hidswitch.toml` in the platform
/// config directory).
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "hidswitch", "hidswitch")
        .map(|dirs| dirs.config_dir().join("hidswitch.toml"))
}

#[cfg(test)]
mod validate_should {
    use super::*;

    #[test]
    fn fill_defaults_when_nothing_is_set() -> Result<()> {
        let config = Args::default().validate()?;
        assert_eq!(config.tool, ToolConfig::default());
        assert_eq!(config.instance_id, DEFAULT_INSTANCE_ID);
        assert!(!config.disable);
        Ok(())
    }

    #[test]
    fn keep_explicit_overrides() -> Result<()> {
        let args = Args {
            pnputil_path: Some(r"C:\tools\pnputil.exe".to_owned()),
            success_token: Some("succeeded".to_owned()),
            instance_id: Some(r"USB\VID_1234&PID_5678".to_owned()),
            disable: true,
            ..Default::default()
        };
        let config = args.validate()?;
        assert_eq!(config.tool.pnputil_path, r"C:\tools\pnputil.exe");
        assert_eq!(config.tool.success_token, "succeeded");
        assert_eq!(config.tool.device_class, "HIDClass");
        assert_eq!(config.instance_id, r"USB\VID_1234&PID_5678");
        assert!(config.disable);
        Ok(())
    }

    #[test]
    fn reject_empty_success_token() {
        let args = Args {
            success_token: Some(String::new()),
            ..Default::default()
        };
        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("token"), "Unexpected error: {err}");
    }
}
