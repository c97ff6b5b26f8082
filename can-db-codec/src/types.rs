//! Core types for the CAN database codec
//!
//! This module defines the error taxonomy shared by schema construction and
//! the codec, and the tagged value variant used on both sides of
//! encode/decode. Schema errors are fatal to message construction; codec
//! errors are per-call and recoverable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by schema construction, the codec, and database lookups
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A signal's geometry or kind is invalid. Raised at message
    /// construction time; the codec assumes valid geometry.
    #[error("malformed signal '{name}': {reason}")]
    MalformedSignal { name: String, reason: String },

    /// A message-level invariant is violated (duplicate names, ambiguous
    /// multiplexing, overlapping co-active signals, cycles).
    #[error("malformed message '{name}': {reason}")]
    MalformedMessage { name: String, reason: String },

    /// Payload size does not match the message definition.
    #[error("wrong payload length for '{message}': expected {expected} bytes, actual {actual}")]
    WrongLength {
        message: String,
        expected: usize,
        actual: usize,
    },

    /// The active signal set cannot be determined on encode because a
    /// multiplexer signal is absent from the provided values.
    #[error("multiplexer signal '{0}' missing from provided values")]
    MissingMultiplexer(String),

    /// An active signal has no value on encode and zero-fill was not
    /// requested.
    #[error("signal '{0}' missing from provided values")]
    MissingSignal(String),

    /// A symbolic label was supplied that the signal's value table does not
    /// contain (or the signal has no value table).
    #[error("unknown choice '{label}' for signal '{signal}'")]
    InvalidChoice { signal: String, label: String },

    /// A physical value violates a declared or representable bound under
    /// strict encoding.
    #[error("value {value} for signal '{signal}' violates {bound} bound {limit}")]
    OutOfRange {
        signal: String,
        value: f64,
        bound: &'static str,
        limit: f64,
    },

    /// Database lookup failed; no message with this identifier.
    #[error("no message with CAN ID 0x{0:X}")]
    UnknownMessage(u32),

    /// The DBC source could not be parsed.
    #[error("failed to parse DBC: {0}")]
    DbcParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A signal value on either side of the codec
///
/// Decode produces `Integer` for unscaled integer signals, `Float` for
/// scaled or floating signals, and `Label` when a value table entry matches
/// the raw value. Encode accepts any variant; labels are reverse-looked-up
/// through the signal's value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Integer physical value (identity scaling)
    Integer(i64),
    /// Floating-point physical value (after scaling/offset)
    Float(f64),
    /// Symbolic choice label from a value table
    Label(String),
}

impl SignalValue {
    /// Numeric view of this value; `None` for labels.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Integer(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Label(_) => None,
        }
    }

    /// Integer view of this value; `None` for labels.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SignalValue::Integer(v) => Some(*v),
            SignalValue::Float(v) => Some(*v as i64),
            SignalValue::Label(_) => None,
        }
    }

    /// Label view of this value; `None` for numeric variants.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            SignalValue::Label(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{}", v),
            SignalValue::Label(l) => write!(f, "{}", l),
        }
    }
}

impl From<i64> for SignalValue {
    fn from(v: i64) -> Self {
        SignalValue::Integer(v)
    }
}

impl From<f64> for SignalValue {
    fn from(v: f64) -> Self {
        SignalValue::Float(v)
    }
}

impl From<&str> for SignalValue {
    fn from(v: &str) -> Self {
        SignalValue::Label(v.to_string())
    }
}

impl From<String> for SignalValue {
    fn from(v: String) -> Self {
        SignalValue::Label(v)
    }
}
