//! Signal definitions
//!
//! A signal describes one named bit-field within a message payload:
//! position, width, byte order, value kind, scaling, bounds, optional value
//! table and optional multiplexer role.

use crate::types::{CodecError, Result};
use std::collections::HashMap;

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format, DBC `@1`): start bit is the LSB,
    /// bits ascend across byte boundaries
    LittleEndian,
    /// Big-endian (Motorola format, DBC `@0`): start bit is the MSB in
    /// sawtooth numbering, bits descend within a byte then continue at
    /// the MSB of the next byte
    BigEndian,
}

/// Value kind for signal interpretation
///
/// Signedness is only meaningful for integers, so the two concerns are one
/// exhaustive enum rather than a flag beside a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Unsigned integer
    Unsigned,
    /// Two's-complement signed integer
    Signed,
    /// IEEE-754 binary32
    Float32,
    /// IEEE-754 binary64
    Float64,
}

impl ValueKind {
    /// True for the IEEE floating kinds
    pub fn is_float(self) -> bool {
        matches!(self, ValueKind::Float32 | ValueKind::Float64)
    }

    /// True for the integer kinds
    pub fn is_integer(self) -> bool {
        !self.is_float()
    }
}

/// Bidirectional mapping between raw integer values and human labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    entries: HashMap<i64, String>,
}

impl ValueTable {
    /// Create an empty value table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a raw value / label pair
    pub fn insert(&mut self, raw: i64, label: impl Into<String>) {
        self.entries.insert(raw, label.into());
    }

    /// Label for a raw value
    pub fn label_for(&self, raw: i64) -> Option<&str> {
        self.entries.get(&raw).map(String::as_str)
    }

    /// Reverse lookup: raw value for a label
    pub fn raw_for(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(raw, _)| *raw)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (raw, label) pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(raw, label)| (*raw, label.as_str()))
    }
}

impl FromIterator<(i64, String)> for ValueTable {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Multiplexer membership for a multiplexed signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that governs this signal
    pub switch: String,
    /// Raw switch values for which this signal is active
    pub selector_ids: Vec<u64>,
}

impl MultiplexerInfo {
    /// Create multiplexer membership under `switch` for the given
    /// selector values
    pub fn new(switch: impl Into<String>, selector_ids: Vec<u64>) -> Self {
        Self {
            switch: switch.into(),
            selector_ids,
        }
    }
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name, unique within its message
    pub name: String,
    /// Start bit; interpretation depends on `byte_order`
    pub start_bit: u16,
    /// Width in bits, 1..=64
    pub length: u16,
    /// Byte order for extraction/insertion
    pub byte_order: ByteOrder,
    /// Integer or IEEE floating interpretation of the raw bits
    pub value_kind: ValueKind,
    /// Scale factor: physical = raw * scale + offset
    pub scale: f64,
    /// Offset added after scaling
    pub offset: f64,
    /// Minimum physical value, if declared
    pub minimum: Option<f64>,
    /// Maximum physical value, if declared
    pub maximum: Option<f64>,
    /// Engineering unit (e.g. "km/h", "V")
    pub unit: Option<String>,
    /// Value table for enum-like values
    pub choices: Option<ValueTable>,
    /// True when this signal's raw value selects other signals
    pub is_multiplexer: bool,
    /// Multiplexer membership when this signal is itself multiplexed
    pub multiplexer: Option<MultiplexerInfo>,
    /// Signal comment from the source database
    pub comment: Option<String>,
    /// Receiver node names (informational)
    pub receivers: Vec<String>,
}

impl Signal {
    /// Create a signal with identity scaling and no bounds, table, or
    /// multiplexer role
    pub fn new(
        name: impl Into<String>,
        start_bit: u16,
        length: u16,
        byte_order: ByteOrder,
        value_kind: ValueKind,
    ) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length,
            byte_order,
            value_kind,
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            unit: None,
            choices: None,
            is_multiplexer: false,
            multiplexer: None,
            comment: None,
            receivers: Vec::new(),
        }
    }

    /// Builder method: set scale and offset
    pub fn with_scaling(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Builder method: set physical bounds
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// Builder method: set the engineering unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder method: attach a value table
    pub fn with_choices(mut self, choices: ValueTable) -> Self {
        self.choices = Some(choices);
        self
    }

    /// Builder method: mark this signal as a multiplexer switch
    pub fn multiplexer_switch(mut self) -> Self {
        self.is_multiplexer = true;
        self
    }

    /// Builder method: make this signal active only for the given raw
    /// values of `switch`
    pub fn multiplexed(mut self, switch: impl Into<String>, selector_ids: Vec<u64>) -> Self {
        self.multiplexer = Some(MultiplexerInfo::new(switch, selector_ids));
        self
    }

    /// Builder method: attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder method: set receiver nodes
    pub fn with_receivers(mut self, receivers: Vec<String>) -> Self {
        self.receivers = receivers;
        self
    }

    /// Convert a raw value to its physical value
    pub fn raw_to_physical(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    /// Convert a physical value to its (unrounded) raw value
    pub fn physical_to_raw(&self, physical: f64) -> f64 {
        (physical - self.offset) / self.scale
    }

    /// True when scale/offset are the identity transform
    pub fn is_identity_scaling(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    /// Check geometry and kind against a payload of `payload_bits` bits.
    ///
    /// Called once at message construction; the codec relies on signals
    /// having passed this check.
    pub(crate) fn validate(&self, payload_bits: usize) -> Result<()> {
        if self.length == 0 {
            return Err(self.malformed("bit length is zero"));
        }
        if self.length > 64 {
            return Err(self.malformed(format!("bit length {} exceeds 64", self.length)));
        }
        if self.value_kind == ValueKind::Float32 && self.length != 32 {
            return Err(self.malformed(format!(
                "binary32 signal must be 32 bits wide, not {}",
                self.length
            )));
        }
        if self.value_kind == ValueKind::Float64 && self.length != 64 {
            return Err(self.malformed(format!(
                "binary64 signal must be 64 bits wide, not {}",
                self.length
            )));
        }
        if self.scale == 0.0 {
            return Err(self.malformed("scale factor is zero"));
        }
        let span_end = match self.byte_order {
            ByteOrder::LittleEndian => self.start_bit as usize + self.length as usize,
            ByteOrder::BigEndian => {
                let start = self.start_bit as usize;
                8 * (start / 8) + (7 - start % 8) + self.length as usize
            }
        };
        if span_end > payload_bits {
            return Err(self.malformed(format!(
                "bit span ends at {} but the payload has {} bits",
                span_end, payload_bits
            )));
        }
        if self.is_multiplexer && self.value_kind.is_float() {
            return Err(self.malformed("multiplexer switch cannot be a float signal"));
        }
        if let Some(mux) = &self.multiplexer {
            if mux.selector_ids.is_empty() {
                return Err(self.malformed("multiplexed signal has an empty selector set"));
            }
        }
        Ok(())
    }

    fn malformed(&self, reason: impl Into<String>) -> CodecError {
        CodecError::MalformedSignal {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}
