//! Active-signal-set resolution
//!
//! Computes which signals are present in a particular frame instance.
//! Decode reads multiplexer raw values out of the payload; encode takes
//! them from the caller's value mapping. Both walk the message's multiplex
//! arena iteratively with a worklist, so nesting depth costs no stack.

use crate::codec::bits;
use crate::options::EncodeOptions;
use crate::schema::Message;
use crate::types::{CodecError, Result, SignalValue};
use std::collections::HashMap;

/// Resolve the active signal indices for a payload being decoded.
///
/// Multiplexer raw values are extracted as they are encountered; selector
/// matching uses the raw unsigned bit pattern. Under `allow_truncated` a
/// switch that does not fit the short payload takes its whole subtree out
/// of the active set.
pub(crate) fn resolve_decode(
    message: &Message,
    payload: &[u8],
    allow_truncated: bool,
) -> Vec<usize> {
    let mut active = Vec::with_capacity(message.signals().len());
    let mut worklist: Vec<usize> = message.top_level().to_vec();

    while let Some(index) = worklist.pop() {
        active.push(index);
        let Some(node) = message.multiplex_tree().node_for(index) else {
            continue;
        };
        let switch = &message.signals()[index];
        if allow_truncated && !bits::fits(switch, payload.len()) {
            log::warn!(
                "Multiplexer '{}' does not fit the truncated payload; skipping its children",
                switch.name
            );
            continue;
        }
        let selector = bits::extract_bits(payload, switch);
        match node.cases.get(&selector) {
            Some(children) => worklist.extend(children.iter().copied()),
            None => log::trace!(
                "Multiplexer '{}' selected {} with no children defined",
                switch.name,
                selector
            ),
        }
    }

    active
}

/// Resolve the active signal indices for a value mapping being encoded.
///
/// Every reached multiplexer switch must be present in `values`, otherwise
/// the active set cannot be determined.
pub(crate) fn resolve_encode(
    message: &Message,
    values: &HashMap<String, SignalValue>,
    options: &EncodeOptions,
) -> Result<Vec<usize>> {
    let mut active = Vec::with_capacity(message.signals().len());
    let mut worklist: Vec<usize> = message.top_level().to_vec();

    while let Some(index) = worklist.pop() {
        active.push(index);
        let Some(node) = message.multiplex_tree().node_for(index) else {
            continue;
        };
        let switch = &message.signals()[index];
        let value = values
            .get(&switch.name)
            .ok_or_else(|| CodecError::MissingMultiplexer(switch.name.clone()))?;
        let raw = super::value_to_raw(switch, value, options)?;
        let selector = bits::mask_to_width(raw, switch.length as usize);
        match node.cases.get(&selector) {
            Some(children) => worklist.extend(children.iter().copied()),
            None => log::trace!(
                "Multiplexer '{}' set to {} with no children defined",
                switch.name,
                selector
            ),
        }
    }

    Ok(active)
}
