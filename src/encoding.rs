//! Corrective re-interpretation of text captured in the wrong codepage.
//!
//! pnputil writes to the console in the OEM codepage (CP866 on Russian
//! hosts) while the capturing side decodes the bytes as something else,
//! corrupting every non-ASCII character. The repair undoes the mismatch:
//! encode the mis-decoded text back into the bytes it came from using the
//! console codepage, then decode those bytes with the codepage the text
//! really was.
//!
//! This is not a generic transcoder. Feeding already-correct text through
//! a repair with mismatched codepages corrupts it; the transform is only
//! lossless when every character of the input exists in the console
//! codepage.

use encoding_rs::Encoding;
use thiserror::Error;

#[derive(Debug, Error)]
/// Error raised when a configured codepage label cannot be resolved.
pub enum EncodingError {
    /// The label is not a known encoding label.
    #[error("Unknown codepage label '{0}'")]
    UnknownLabel(String),
}

/// A resolved console→display codepage pair applied to captured text.
#[derive(Debug, Clone, Copy)]
pub struct CodepageRepair {
    console: &'static Encoding,
    display: &'static Encoding,
}

impl CodepageRepair {
    /// Resolve `console` and `display` codepage labels (e.g. `cp866`,
    /// `windows-1251`) once, failing fast on an unknown label.
    pub fn from_labels(console: &str, display: &str) -> Result<Self, EncodingError> {
        Ok(Self {
            console: resolve(console)?,
            display: resolve(display)?,
        })
    }

    /// Repair `text`: re-encode with the console codepage, re-decode with
    /// the display codepage.
    pub fn repair(&self, text: &str) -> String {
        let (bytes, _, _) = self.console.encode(text);
        let (repaired, _) = self.display.decode_without_bom_handling(&bytes);
        repaired.into_owned()
    }
}

fn resolve(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.as_bytes()).ok_or_else(|| EncodingError::UnknownLabel(label.into()))
}
