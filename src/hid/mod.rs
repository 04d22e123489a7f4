//! Enumerate and toggle HID-class devices through pnputil.
//!
//! [`HidDevices`] builds pnputil invocations, hands them to a
//! [`ScriptRunner`], parses the captured listing into [`HidDevice`]
//! records and repairs the console-codepage corruption in every field.
//! Each call spawns one scripting-host session and blocks until it
//! exits; overlapping calls from different threads get independent
//! sessions with no ordering guarantee between their effects.

mod parse;

use crate::command::{PowerShellRunner, ScriptOutput, ScriptRunner};
use crate::config::ToolConfig;
use crate::encoding::{CodepageRepair, EncodingError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Output line index of pnputil's enable/disable status line. The line
/// sits after the 2-line banner and one blank line.
const STATUS_LINE_INDEX: usize = 3;

#[derive(Debug, Error)]
/// Error specific to pnputil invocation and output handling.
pub enum HidError {
    /// The scripting host could not be executed at all.
    #[error("Scripting host invocation failed")]
    Execution(#[source] anyhow::Error),
    /// A device block in the listing is shorter than the fixed format
    /// requires; the output format likely changed and no positional
    /// binding can be trusted.
    #[error("Device block at output line {line} is truncated ({missing})")]
    ParseInconsistency {
        /// 1-based line number of the marker line in the raw output.
        line: usize,
        /// What the window is missing.
        missing: String,
    },
    /// Marshalling a record through the codepage repair failed.
    #[error("Device record marshalling failed")]
    Marshal(#[from] serde_json::Error),
    /// A configured codepage label could not be resolved.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// One connected device as reported by pnputil. All fields are free-text
/// strings taken verbatim from the listing after codepage repair;
/// `instance_id` is the only handle usable to address the device in a
/// later enable/disable call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDevice {
    /// Unique hardware path.
    pub instance_id: String,
    /// Human-readable device description.
    pub description: String,
    /// Device class name.
    pub class_name: String,
    /// Device class GUID.
    pub class_guid: String,
    /// Driver provider.
    pub provider_name: String,
    /// Device status as printed by the utility.
    pub status: String,
    /// Installed driver name.
    pub driver_name: String,
}

impl HidDevice {
    /// Build a record carrying only an instance ID, enough to address a
    /// device in [`HidDevices::set_active`].
    pub fn with_instance_id(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }
}

/// Result of an enumeration, with the diagnostic and error channels of
/// the underlying scripting-host session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Enumeration {
    /// Parsed device records, in the utility's own emission order.
    pub devices: Vec<HidDevice>,
    /// Diagnostic lines reported by the scripting host.
    pub diagnostics: Vec<String>,
    /// Error lines reported by the scripting host.
    pub errors: Vec<String>,
}

/// Outcome of an enable/disable attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the repaired status line contained the success token.
    pub success: bool,
    /// The repaired status line, or empty when the invocation produced
    /// no output at all.
    pub message: String,
}

/// Entry point for device enumeration and toggling.
pub struct HidDevices {
    config: ToolConfig,
    repair: CodepageRepair,
    /// Script runner executing pnputil invocations (enables mocking in tests)
    runner: Box<dyn ScriptRunner>,
}

impl fmt::Debug for HidDevices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidDevices")
            .field("config", &self.config)
            .field("repair", &self.repair)
            .finish()
    }
}

impl HidDevices {
    /// Build against the real PowerShell host configured in `config`.
    ///
    /// Fails fast when a configured codepage label is unknown.
    pub fn new(config: ToolConfig) -> Result<Self, HidError> {
        let runner = Box::new(PowerShellRunner::new(&config.host_command));
        Self::with_runner(config, runner)
    }

    /// Build with an injected runner.
    pub fn with_runner(config: ToolConfig, runner: Box<dyn ScriptRunner>) -> Result<Self, HidError> {
        let repair = CodepageRepair::from_labels(&config.console_codepage, &config.display_codepage)?;
        Ok(Self {
            config,
            repair,
            runner,
        })
    }

    /// Return the connected devices of the configured class.
    pub fn enumerate(&self) -> Result<Vec<HidDevice>, HidError> {
        Ok(self.enumerate_verbose()?.devices)
    }

    /// Return the connected devices together with the diagnostic and
    /// error channels of the scripting-host session.
    ///
    /// An unreachable utility shows up as an empty device list with the
    /// host's complaint on the error channel, not as an `Err`.
    pub fn enumerate_verbose(&self) -> Result<Enumeration, HidError> {
        let script = format!(
            r#"& "{}" /enum-devices /class {} /connected"#,
            self.config.pnputil_path, self.config.device_class
        );
        let captured = self.run(&script)?;
        let devices = parse::parse_device_listing(&captured.output)?
            .into_iter()
            .map(|device| self.repair_record(device))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Enumerated {} connected {} devices",
            devices.len(),
            self.config.device_class
        );
        Ok(Enumeration {
            devices,
            diagnostics: captured.diagnostics,
            errors: captured.errors,
        })
    }

    /// Enable `device`.
    pub fn enable(&self, device: &HidDevice) -> Result<ToggleOutcome, HidError> {
        self.set_active(device, true)
    }

    /// Disable `device`.
    pub fn disable(&self, device: &HidDevice) -> Result<ToggleOutcome, HidError> {
        self.set_active(device, false)
    }

    /// Enable or disable `device` by its instance ID.
    ///
    /// Success is decided by a substring check for the configured
    /// localized success token on the repaired status line. An empty
    /// outcome message means the invocation produced no usable output;
    /// the utility does not distinguish "device not found" from
    /// "operation rejected".
    pub fn set_active(&self, device: &HidDevice, active: bool) -> Result<ToggleOutcome, HidError> {
        let action = if active { "enable" } else { "disable" };
        let script = format!(
            r#"& "{}" /{}-device "{}""#,
            self.config.pnputil_path, action, device.instance_id
        );
        let captured = self.run(&script)?;
        let message = match captured.output.get(STATUS_LINE_INDEX) {
            Some(line) => self.repair.repair(line),
            None => {
                warn!(
                    "No status line from {}-device for '{}'",
                    action, device.instance_id
                );
                return Ok(ToggleOutcome {
                    success: false,
                    message: String::new(),
                });
            }
        };
        let success = message.contains(&self.config.success_token);
        debug!("{}-device '{}': {}", action, device.instance_id, message);
        Ok(ToggleOutcome { success, message })
    }

    fn run(&self, script: &str) -> Result<ScriptOutput, HidError> {
        self.runner.run(script).map_err(HidError::Execution)
    }

    /// Marshal a parsed record through the codepage repair: serialize to
    /// JSON, repair the text, deserialize back. The repair never touches
    /// ASCII, so the JSON structure survives while every corrupted field
    /// character is restored.
    fn repair_record(&self, device: HidDevice) -> Result<HidDevice, HidError> {
        let json = serde_json::to_string(&device)?;
        Ok(serde_json::from_str(&self.repair.repair(&json))?)
    }
}
