//! Abstraction over scripting-host invocation.
//!
//! [`ScriptRunner`] allows swapping the real PowerShell invocation
//! ([`PowerShellRunner`]) with a mock in tests. This is necessary because
//! the library drives an administrative Windows utility (pnputil) that is
//! unavailable in CI or on other platforms. Injecting a [`ScriptRunner`]
//! makes the output parsing and encoding repair testable against canned
//! text fixtures without spawning real processes.
//!
//! No timeout is enforced on the child process: a hung utility hangs the
//! caller indefinitely.

use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Captured streams of one scripting-host invocation, in emission order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Standard output lines.
    pub output: Vec<String>,
    /// Diagnostic (debug stream) lines, when the host exposes them.
    pub diagnostics: Vec<String>,
    /// Error stream lines.
    pub errors: Vec<String>,
}

/// Trait for running a script text in the scripting host and capturing
/// its output streams.
#[cfg_attr(test, mockall::automock)]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` and return the captured streams once the host exits.
    fn run(&self, script: &str) -> Result<ScriptOutput>;
}

/// Default implementation that hands the script to a PowerShell child
/// process and waits for it to exit.
pub struct PowerShellRunner {
    /// Host command line the script is appended to, e.g.
    /// `powershell -NoProfile -NonInteractive -Command`.
    host_command: String,
}

impl PowerShellRunner {
    /// Build a runner from the configured host command line.
    pub fn new(host_command: impl Into<String>) -> Self {
        Self {
            host_command: host_command.into(),
        }
    }
}

impl ScriptRunner for PowerShellRunner {
    fn run(&self, script: &str) -> Result<ScriptOutput> {
        let params = shell_words::split(&self.host_command)
            .with_context(|| format!("Splitting host command '{}'", &self.host_command))?;
        if params.is_empty() {
            bail!("Scripting host command is empty");
        }
        debug!("Running script through {}", &params[0]);
        let output = Command::new(&params[0])
            .args(&params[1..])
            .arg(script)
            .output()
            .with_context(|| format!("Running {}", &params[0]))?;

        // The console PowerShell host folds its debug stream into the
        // console, not into a stream a child-process caller can capture,
        // so `diagnostics` stays empty here.
        Ok(ScriptOutput {
            output: lines_of(&output.stdout),
            diagnostics: Vec::new(),
            errors: lines_of(&output.stderr),
        })
    }
}

fn lines_of(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod should {
    use super::*;

    #[test]
    fn fail_on_empty_host_command() {
        let runner = PowerShellRunner::new("");
        let res = runner.run("& nothing");
        assert!(res.is_err());
    }

    #[test]
    fn fail_on_missing_host_binary() {
        let runner = PowerShellRunner::new("no-such-scripting-host-anywhere");
        let res = runner.run("& nothing");
        assert!(res
            .unwrap_err()
            .to_string()
            .contains("no-such-scripting-host-anywhere"));
    }

    #[test]
    fn split_captured_bytes_into_lines() {
        assert_eq!(
            lines_of(b"first\r\nsecond\nthird"),
            vec!["first", "second", "third"]
        );
        assert!(lines_of(b"").is_empty());
    }
}
