//! Codec policy options
//!
//! Per-call policies for decode and encode. Defaults match the reference
//! tooling: choice substitution and strict range checking on, no length
//! forgiveness, zero padding.

use serde::{Deserialize, Serialize};

/// Policies applied while decoding a payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Substitute value-table labels for matching raw values
    #[serde(default = "default_true")]
    pub decode_choices: bool,

    /// Accept payloads shorter than the message length; signals that do
    /// not fit are omitted from the result
    #[serde(default)]
    pub allow_truncated: bool,

    /// Accept payloads longer than the message length; excess bytes are
    /// ignored
    #[serde(default)]
    pub allow_excess: bool,
}

/// Policies applied while encoding a value mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeOptions {
    /// Enforce declared minimum/maximum bounds and the representable raw
    /// range; when off, out-of-range raws are truncated to the signal
    /// width (low-order bits kept)
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Treat active signals absent from the value mapping as raw zero
    /// instead of failing
    #[serde(default)]
    pub fill_missing: bool,

    /// Fill byte for payload bits not owned by any encoded signal
    #[serde(default)]
    pub padding: u8,
}

fn default_true() -> bool {
    true
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_choices: true,
            allow_truncated: false,
            allow_excess: false,
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            fill_missing: false,
            padding: 0,
        }
    }
}

impl DecodeOptions {
    /// Create decode options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable choice substitution
    pub fn with_choices(mut self, enabled: bool) -> Self {
        self.decode_choices = enabled;
        self
    }

    /// Builder method: tolerate short payloads
    pub fn with_truncated(mut self, enabled: bool) -> Self {
        self.allow_truncated = enabled;
        self
    }

    /// Builder method: tolerate long payloads
    pub fn with_excess(mut self, enabled: bool) -> Self {
        self.allow_excess = enabled;
        self
    }
}

impl EncodeOptions {
    /// Create encode options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable strict range checking
    pub fn with_strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Builder method: zero-fill missing signals
    pub fn with_fill_missing(mut self, enabled: bool) -> Self {
        self.fill_missing = enabled;
        self
    }

    /// Builder method: set the payload fill byte
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }
}
