//! DBC file adapter
//!
//! Converts the output of the `can-dbc` parser into the schema data model.
//! The textual grammar lives in that crate; this module only maps its
//! parse tree onto validated `Message`/`Signal` objects, including value
//! tables (`VAL_`), float kinds (`SIG_VALTYPE_`), and plain as well as
//! extended (`SG_MUL_VAL_`) multiplexing.

use crate::schema::{ByteOrder, Message, Signal, ValueKind, ValueTable};
use crate::types::{CodecError, Result};
use std::path::Path;

/// Parse a DBC file and return validated message definitions
pub fn load_dbc_file(path: &Path) -> Result<Vec<Message>> {
    log::info!("Parsing DBC file: {:?}", path);
    let bytes = std::fs::read(path)?;
    let messages = load_dbc_bytes(&bytes)?;
    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

/// Parse DBC content from memory and return validated message definitions
pub fn load_dbc_bytes(bytes: &[u8]) -> Result<Vec<Message>> {
    // Try UTF-8 first, then fall back to Latin-1 (covers Windows-1252
    // exports, which are common in the wild)
    let content = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("DBC content is not UTF-8, falling back to Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    };

    let dbc = can_dbc::DBC::from_slice(content.as_bytes())
        .map_err(|e| CodecError::DbcParse(format!("{:?}", e)))?;

    dbc.messages()
        .iter()
        .map(|msg| convert_message(&dbc, msg))
        .collect()
}

fn convert_message(dbc: &can_dbc::DBC, msg: &can_dbc::Message) -> Result<Message> {
    let (id, extended) = match msg.message_id() {
        can_dbc::MessageId::Standard(id) => (*id as u32, false),
        can_dbc::MessageId::Extended(id) => (*id & 0x1FFF_FFFF, true),
    };
    let size = *msg.message_size() as usize;

    // Plain multiplexing names no switch on the children; find it up front.
    let switch_name = msg.signals().iter().find_map(|sig| {
        matches!(
            sig.multiplexer_indicator(),
            can_dbc::MultiplexIndicator::Multiplexor
                | can_dbc::MultiplexIndicator::MultiplexorAndMultiplexedSignal(_)
        )
        .then(|| sig.name().to_string())
    });

    let mut builder = Message::builder(id, msg.message_name(), size)
        .extended(extended)
        .fd(size > 8);

    if let can_dbc::Transmitter::NodeName(node) = msg.transmitter() {
        builder = builder.sender(node);
    }
    if let Some(comment) = message_comment(dbc, msg) {
        builder = builder.comment(comment);
    }

    for sig in msg.signals() {
        builder = builder.signal(convert_signal(dbc, msg, sig, switch_name.as_deref())?);
    }

    builder.build()
}

fn convert_signal(
    dbc: &can_dbc::DBC,
    msg: &can_dbc::Message,
    sig: &can_dbc::Signal,
    switch_name: Option<&str>,
) -> Result<Signal> {
    let byte_order = match *sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let mut value_kind = match *sig.value_type() {
        can_dbc::ValueType::Signed => ValueKind::Signed,
        can_dbc::ValueType::Unsigned => ValueKind::Unsigned,
    };
    // SIG_VALTYPE_ overrides the integer kind with an IEEE float kind
    for evt in dbc.signal_extended_value_type_list() {
        if evt.message_id() == msg.message_id() && evt.signal_name() == sig.name() {
            value_kind = match evt.signal_extended_value_type() {
                can_dbc::SignalExtendedValueType::IEEEfloat32Bit => ValueKind::Float32,
                can_dbc::SignalExtendedValueType::IEEEdouble64bit => ValueKind::Float64,
                can_dbc::SignalExtendedValueType::SignedOrUnsignedInteger => value_kind,
            };
        }
    }

    let mut signal = Signal::new(
        sig.name(),
        *sig.start_bit() as u16,
        *sig.signal_size() as u16,
        byte_order,
        value_kind,
    )
    .with_scaling(*sig.factor(), *sig.offset());

    // DBC uses [0|0] for "no declared range"
    if *sig.min() != 0.0 || *sig.max() != 0.0 {
        signal = signal.with_range(*sig.min(), *sig.max());
    }
    if !sig.unit().is_empty() {
        signal = signal.with_unit(sig.unit());
    }

    let receivers: Vec<String> = sig
        .receivers()
        .iter()
        .filter(|r| r.as_str() != "Vector__XXX")
        .cloned()
        .collect();
    if !receivers.is_empty() {
        signal = signal.with_receivers(receivers);
    }

    if let Some(comment) = signal_comment(dbc, msg, sig) {
        signal = signal.with_comment(comment);
    }

    if let Some(choices) = value_table(dbc, msg, sig) {
        signal = signal.with_choices(choices);
    }

    // Plain multiplexing from the signal's own indicator
    let (is_switch, selector) = match *sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::Plain => (false, None),
        can_dbc::MultiplexIndicator::Multiplexor => (true, None),
        can_dbc::MultiplexIndicator::MultiplexedSignal(v) => (false, Some(vec![v])),
        can_dbc::MultiplexIndicator::MultiplexorAndMultiplexedSignal(v) => (true, Some(vec![v])),
    };
    if is_switch {
        signal = signal.multiplexer_switch();
    }

    // SG_MUL_VAL_ names the governing switch explicitly and may widen the
    // selector set to ranges; it takes precedence over the indicator.
    let extended = dbc
        .extended_multiplex()
        .iter()
        .find(|ext| ext.message_id() == msg.message_id() && ext.signal_name() == sig.name());

    if let Some(ext) = extended {
        let selector_ids: Vec<u64> = ext
            .mappings()
            .iter()
            .flat_map(|m| *m.min_value()..=*m.max_value())
            .collect();
        signal = signal.multiplexed(ext.multiplexor_signal_name(), selector_ids);
    } else if let Some(selector_ids) = selector {
        let switch = switch_name.ok_or_else(|| {
            CodecError::DbcParse(format!(
                "signal '{}' is multiplexed but the message has no multiplexer",
                sig.name()
            ))
        })?;
        signal = signal.multiplexed(switch, selector_ids);
    }

    Ok(signal)
}

fn value_table(
    dbc: &can_dbc::DBC,
    msg: &can_dbc::Message,
    sig: &can_dbc::Signal,
) -> Option<ValueTable> {
    let descriptions =
        dbc.value_descriptions_for_signal(msg.message_id().clone(), sig.name())?;
    if descriptions.is_empty() {
        return None;
    }
    Some(
        descriptions
            .iter()
            .map(|d| (*d.a() as i64, d.b().clone()))
            .collect(),
    )
}

fn message_comment(dbc: &can_dbc::DBC, msg: &can_dbc::Message) -> Option<String> {
    dbc.comments().iter().find_map(|c| match c {
        can_dbc::Comment::Message {
            message_id,
            comment,
        } if message_id == msg.message_id() => Some(comment.clone()),
        _ => None,
    })
}

fn signal_comment(
    dbc: &can_dbc::DBC,
    msg: &can_dbc::Message,
    sig: &can_dbc::Signal,
) -> Option<String> {
    dbc.comments().iter().find_map(|c| match c {
        can_dbc::Comment::Signal {
            message_id,
            signal_name,
            comment,
        } if message_id == msg.message_id() && signal_name == sig.name() => {
            Some(comment.clone())
        }
        _ => None,
    })
}
