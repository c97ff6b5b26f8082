//! The signal codec
//!
//! Pure transforms between a message's value mapping and its payload
//! bytes. No I/O, no shared state: every call completes synchronously with
//! a value or a typed failure, so independent frames may be processed in
//! parallel against the same immutable schema.

pub(crate) mod bits;
mod mux;

use crate::options::{DecodeOptions, EncodeOptions};
use crate::schema::{Message, Signal, ValueKind};
use crate::types::{CodecError, Result, SignalValue};
use std::collections::HashMap;

/// Decode a payload against a message definition.
///
/// Returns a mapping of signal name to physical value or choice label.
/// Signals inactive under the frame's multiplexer values are omitted, not
/// nulled. Length mismatches fail with `WrongLength` unless the options
/// permit truncated or excess payloads.
pub fn decode_message(
    message: &Message,
    payload: &[u8],
    options: &DecodeOptions,
) -> Result<HashMap<String, SignalValue>> {
    let expected = message.length();
    let actual = payload.len();
    if (actual < expected && !options.allow_truncated)
        || (actual > expected && !options.allow_excess)
    {
        return Err(CodecError::WrongLength {
            message: message.name().to_string(),
            expected,
            actual,
        });
    }

    let truncated = actual < expected;
    let active = mux::resolve_decode(message, payload, truncated);
    let mut decoded = HashMap::with_capacity(active.len());

    for index in active {
        let signal = &message.signals()[index];
        if truncated && !bits::fits(signal, actual) {
            log::warn!(
                "Signal '{}' does not fit the {}-byte payload; omitted",
                signal.name,
                actual
            );
            continue;
        }
        let raw = bits::extract_bits(payload, signal);
        decoded.insert(signal.name.clone(), decode_signal(signal, raw, options));
    }

    log::trace!(
        "Decoded {} signals from '{}'",
        decoded.len(),
        message.name()
    );
    Ok(decoded)
}

/// Encode a value mapping against a message definition.
///
/// The payload starts as `message.length()` bytes of the configured
/// padding; each active signal then overwrites exactly its own bit span.
/// Values supplied for inactive or unknown signals are ignored.
pub fn encode_message(
    message: &Message,
    values: &HashMap<String, SignalValue>,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    let mut payload = vec![options.padding; message.length()];
    let active = mux::resolve_encode(message, values, options)?;

    for index in &active {
        let signal = &message.signals()[*index];
        let raw = match values.get(&signal.name) {
            Some(value) => value_to_raw(signal, value, options)?,
            None if options.fill_missing => 0,
            None => return Err(CodecError::MissingSignal(signal.name.clone())),
        };
        bits::insert_bits(&mut payload, signal, raw);
    }

    if log::log_enabled!(log::Level::Debug) {
        for name in values.keys() {
            let used = active
                .iter()
                .any(|i| message.signals()[*i].name == *name);
            if !used {
                log::debug!(
                    "Value for '{}' ignored; signal inactive or unknown in '{}'",
                    name,
                    message.name()
                );
            }
        }
    }

    Ok(payload)
}

/// Interpret an extracted raw bit pattern as a signal value
fn decode_signal(signal: &Signal, raw: u64, options: &DecodeOptions) -> SignalValue {
    match signal.value_kind {
        ValueKind::Float32 => {
            let value = f32::from_bits(raw as u32) as f64;
            SignalValue::Float(signal.raw_to_physical(value))
        }
        ValueKind::Float64 => {
            let value = f64::from_bits(raw);
            SignalValue::Float(signal.raw_to_physical(value))
        }
        ValueKind::Signed | ValueKind::Unsigned => {
            if signal.value_kind == ValueKind::Unsigned && raw > i64::MAX as u64 {
                // 64-bit unsigned raw beyond i64; report through the float
                // representation rather than wrapping
                return SignalValue::Float(signal.raw_to_physical(raw as f64));
            }
            let raw_int = if signal.value_kind == ValueKind::Signed {
                bits::sign_extend(raw, signal.length)
            } else {
                raw as i64
            };
            if options.decode_choices {
                if let Some(label) = signal
                    .choices
                    .as_ref()
                    .and_then(|table| table.label_for(raw_int))
                {
                    return SignalValue::Label(label.to_string());
                }
            }
            if signal.is_identity_scaling() {
                SignalValue::Integer(raw_int)
            } else {
                SignalValue::Float(signal.raw_to_physical(raw_int as f64))
            }
        }
    }
}

/// Convert a caller-supplied value to the raw bit pattern for insertion.
///
/// Labels resolve through the value table straight to a raw integer,
/// bypassing scaling. Numeric values are quantized with
/// round-half-away-from-zero (`f64::round`), matching the reference tool.
pub(crate) fn value_to_raw(
    signal: &Signal,
    value: &SignalValue,
    options: &EncodeOptions,
) -> Result<u64> {
    match signal.value_kind {
        ValueKind::Float32 | ValueKind::Float64 => {
            let physical = value.as_f64().ok_or_else(|| CodecError::InvalidChoice {
                signal: signal.name.clone(),
                label: value.to_string(),
            })?;
            check_declared_range(signal, physical, options)?;
            let raw = signal.physical_to_raw(physical);
            Ok(match signal.value_kind {
                ValueKind::Float32 => (raw as f32).to_bits() as u64,
                _ => raw.to_bits(),
            })
        }
        ValueKind::Signed | ValueKind::Unsigned => {
            let raw_int = match value {
                SignalValue::Label(label) => signal
                    .choices
                    .as_ref()
                    .and_then(|table| table.raw_for(label))
                    .ok_or_else(|| CodecError::InvalidChoice {
                        signal: signal.name.clone(),
                        label: label.clone(),
                    })?,
                SignalValue::Integer(v) if signal.is_identity_scaling() => {
                    check_declared_range(signal, *v as f64, options)?;
                    *v
                }
                SignalValue::Integer(v) => {
                    check_declared_range(signal, *v as f64, options)?;
                    signal.physical_to_raw(*v as f64).round() as i64
                }
                SignalValue::Float(physical) => {
                    check_declared_range(signal, *physical, options)?;
                    signal.physical_to_raw(*physical).round() as i64
                }
            };
            if options.strict {
                check_representable(signal, raw_int)?;
            }
            Ok(bits::mask_to_width(raw_int as u64, signal.length as usize))
        }
    }
}

fn check_declared_range(signal: &Signal, physical: f64, options: &EncodeOptions) -> Result<()> {
    if !options.strict {
        return Ok(());
    }
    if let Some(minimum) = signal.minimum {
        if physical < minimum {
            return Err(CodecError::OutOfRange {
                signal: signal.name.clone(),
                value: physical,
                bound: "minimum",
                limit: minimum,
            });
        }
    }
    if let Some(maximum) = signal.maximum {
        if physical > maximum {
            return Err(CodecError::OutOfRange {
                signal: signal.name.clone(),
                value: physical,
                bound: "maximum",
                limit: maximum,
            });
        }
    }
    Ok(())
}

/// Reject raw values that cannot be represented in the signal's bit width
fn check_representable(signal: &Signal, raw: i64) -> Result<()> {
    let length = signal.length as u32;
    let (low, high): (i128, i128) = match signal.value_kind {
        ValueKind::Signed => (-(1i128 << (length - 1)), (1i128 << (length - 1)) - 1),
        _ => (0, (1i128 << length) - 1),
    };
    let raw = raw as i128;
    if raw < low {
        return Err(CodecError::OutOfRange {
            signal: signal.name.clone(),
            value: raw as f64,
            bound: "minimum",
            limit: low as f64,
        });
    }
    if raw > high {
        return Err(CodecError::OutOfRange {
            signal: signal.name.clone(),
            value: raw as f64,
            bound: "maximum",
            limit: high as f64,
        });
    }
    Ok(())
}
