//! Integration tests for the signal codec
//!
//! Exercises the codec end to end: round trips, bit isolation, signed and
//! float behavior, multiplexing, length policies, and the DBC adapter with
//! reference frame vectors.

use can_db_codec::{
    ByteOrder, CodecError, Database, DecodeOptions, EncodeOptions, Message, Signal, SignalValue,
    ValueKind, ValueTable,
};
use std::collections::HashMap;

fn values(entries: &[(&str, SignalValue)]) -> HashMap<String, SignalValue> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn decode_defaults() -> DecodeOptions {
    DecodeOptions::default()
}

fn encode_defaults() -> EncodeOptions {
    EncodeOptions::default()
}

// A DBC in the socialledge style with a multiplexed sonar message.
const SONAR_DBC: &str = r#"
VERSION ""

NS_ :

BS_:

BU_: DRIVER IO SENSOR

BO_ 200 SENSOR_SONARS: 8 SENSOR
 SG_ SENSOR_SONARS_mux M : 0|4@1+ (1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_err_count : 4|12@1+ (1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_left m0 : 16|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_middle m0 : 28|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_right m0 : 40|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_rear m0 : 52|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_no_filt_left m1 : 16|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_no_filt_middle m1 : 28|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_no_filt_right m1 : 40|12@1+ (0.1,0) [0|0] "" DRIVER,IO
 SG_ SENSOR_SONARS_no_filt_rear m1 : 52|12@1+ (0.1,0) [0|0] "" DRIVER,IO
"#;

fn sonar_database() -> Database {
    let mut db = Database::new();
    for message in can_db_codec::dbc::load_dbc_bytes(SONAR_DBC.as_bytes()).unwrap() {
        db.add_message(message);
    }
    db
}

#[test]
fn sensor_sonars_reference_vector() {
    let db = sonar_database();
    let decoded = db
        .decode_frame(200, &[0xF0, 0, 0, 0, 0, 0, 0, 0], &decode_defaults())
        .unwrap();

    assert_eq!(decoded["SENSOR_SONARS_mux"], SignalValue::Integer(0));
    assert_eq!(decoded["SENSOR_SONARS_err_count"], SignalValue::Integer(15));
    assert_eq!(decoded["SENSOR_SONARS_left"], SignalValue::Float(0.0));
    assert_eq!(decoded["SENSOR_SONARS_middle"], SignalValue::Float(0.0));
    assert_eq!(decoded["SENSOR_SONARS_right"], SignalValue::Float(0.0));
    assert_eq!(decoded["SENSOR_SONARS_rear"], SignalValue::Float(0.0));
    // The mux 1 set must be absent, not zero
    assert!(!decoded.contains_key("SENSOR_SONARS_no_filt_left"));
    assert_eq!(decoded.len(), 6);
}

#[test]
fn sensor_sonars_encode_decode_pair() {
    let db = sonar_database();
    let message = db.message_by_name("SENSOR_SONARS").unwrap();

    let input = values(&[
        ("SENSOR_SONARS_mux", SignalValue::Integer(0)),
        ("SENSOR_SONARS_err_count", SignalValue::Integer(1)),
        ("SENSOR_SONARS_left", SignalValue::Float(2.0)),
        ("SENSOR_SONARS_middle", SignalValue::Float(3.0)),
        ("SENSOR_SONARS_right", SignalValue::Float(4.0)),
        ("SENSOR_SONARS_rear", SignalValue::Float(5.0)),
    ]);
    let payload = message.encode(&input, &encode_defaults()).unwrap();
    assert_eq!(payload, vec![0x10, 0x00, 0x14, 0xE0, 0x01, 0x28, 0x20, 0x03]);

    let decoded = message.decode(&payload, &decode_defaults()).unwrap();
    assert_eq!(decoded["SENSOR_SONARS_err_count"], SignalValue::Integer(1));
    assert_eq!(decoded["SENSOR_SONARS_left"], SignalValue::Float(2.0));
    assert_eq!(decoded["SENSOR_SONARS_rear"], SignalValue::Float(5.0));
}

#[test]
fn sensor_sonars_mux_1_selects_unfiltered_set() {
    let db = sonar_database();
    let message = db.message_by_name("SENSOR_SONARS").unwrap();

    let input = values(&[
        ("SENSOR_SONARS_mux", SignalValue::Integer(1)),
        ("SENSOR_SONARS_err_count", SignalValue::Integer(2)),
        ("SENSOR_SONARS_no_filt_left", SignalValue::Float(3.0)),
        ("SENSOR_SONARS_no_filt_middle", SignalValue::Float(4.0)),
        ("SENSOR_SONARS_no_filt_right", SignalValue::Float(5.0)),
        ("SENSOR_SONARS_no_filt_rear", SignalValue::Float(6.0)),
    ]);
    let payload = message.encode(&input, &encode_defaults()).unwrap();
    assert_eq!(payload, vec![0x21, 0x00, 0x1E, 0x80, 0x02, 0x32, 0xC0, 0x03]);

    let decoded = message.decode(&payload, &decode_defaults()).unwrap();
    assert!(decoded.contains_key("SENSOR_SONARS_no_filt_left"));
    assert!(!decoded.contains_key("SENSOR_SONARS_left"));
}

fn battery_message() -> Message {
    let mut builder = Message::builder(0x140, "BATTERY_VT", 3)
        .signal(
            Signal::new(
                "BATTERY_VT_INDEX",
                0,
                8,
                ByteOrder::LittleEndian,
                ValueKind::Unsigned,
            )
            .multiplexer_switch(),
        );
    for index in 0..16u64 {
        builder = builder.signal(
            Signal::new(
                format!("MODULE_VOLTAGE_{:02}", index),
                8,
                16,
                ByteOrder::LittleEndian,
                ValueKind::Unsigned,
            )
            .multiplexed("BATTERY_VT_INDEX", vec![index]),
        );
    }
    builder.build().unwrap()
}

#[test]
fn battery_vt_index_selects_suffixed_signal() {
    let message = battery_message();

    let decoded = message
        .decode(&[0x07, 0x34, 0x12], &decode_defaults())
        .unwrap();
    assert_eq!(decoded["BATTERY_VT_INDEX"], SignalValue::Integer(7));
    assert_eq!(decoded["MODULE_VOLTAGE_07"], SignalValue::Integer(0x1234));
    assert_eq!(decoded.len(), 2);
    assert!(!decoded.contains_key("MODULE_VOLTAGE_00"));

    let decoded = message
        .decode(&[0x0F, 0x01, 0x00], &decode_defaults())
        .unwrap();
    assert_eq!(decoded["MODULE_VOLTAGE_15"], SignalValue::Integer(1));
}

#[test]
fn multiplex_child_sets_by_selector() {
    // M selects {A} for 0, {B} for 1, and {A, B} for 2
    let message = Message::builder(0x50, "MuxSets", 8)
        .signal(
            Signal::new("M", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .multiplexer_switch(),
        )
        .signal(
            Signal::new("A", 8, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .multiplexed("M", vec![0, 2]),
        )
        .signal(
            Signal::new("B", 16, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .multiplexed("M", vec![1, 2]),
        )
        .build()
        .unwrap();

    let decoded = message.decode(&[0, 5, 6, 0, 0, 0, 0, 0], &decode_defaults()).unwrap();
    assert_eq!(decoded["M"], SignalValue::Integer(0));
    assert_eq!(decoded["A"], SignalValue::Integer(5));
    assert!(!decoded.contains_key("B"));

    let decoded = message.decode(&[1, 5, 6, 0, 0, 0, 0, 0], &decode_defaults()).unwrap();
    assert!(!decoded.contains_key("A"));
    assert_eq!(decoded["B"], SignalValue::Integer(6));

    let decoded = message.decode(&[2, 5, 6, 0, 0, 0, 0, 0], &decode_defaults()).unwrap();
    assert_eq!(decoded["A"], SignalValue::Integer(5));
    assert_eq!(decoded["B"], SignalValue::Integer(6));
}

#[test]
fn round_trip_spans_declared_range() {
    let message = Message::builder(0x60, "Temps", 8)
        .signal(
            Signal::new("Temp", 3, 10, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .with_scaling(0.25, -50.0)
                .with_range(-50.0, 205.75),
        )
        .build()
        .unwrap();

    for physical in [-50.0, 75.25, 205.75] {
        let input = values(&[("Temp", SignalValue::Float(physical))]);
        let payload = message.encode(&input, &encode_defaults()).unwrap();
        let decoded = message.decode(&payload, &decode_defaults()).unwrap();
        assert_eq!(decoded["Temp"], SignalValue::Float(physical));
    }
}

#[test]
fn round_trip_big_endian_signed() {
    let message = Message::builder(0x61, "Axle", 8)
        .signal(Signal::new(
            "Torque",
            7,
            12,
            ByteOrder::BigEndian,
            ValueKind::Signed,
        ))
        .build()
        .unwrap();

    for raw in [-2048i64, -1, 0, 1, 2047] {
        let input = values(&[("Torque", SignalValue::Integer(raw))]);
        let payload = message.encode(&input, &encode_defaults()).unwrap();
        let decoded = message.decode(&payload, &decode_defaults()).unwrap();
        assert_eq!(decoded["Torque"], SignalValue::Integer(raw));
    }
}

#[test]
fn bit_isolation_between_signals() {
    let message = Message::builder(0x62, "Packed", 8)
        .signal(Signal::new("A", 0, 5, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .signal(Signal::new("B", 5, 7, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .signal(Signal::new("C", 12, 4, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .build()
        .unwrap();

    // Fill byte 0xFF everywhere, then write zeros into B only; A and C
    // keep their fill bits.
    let input = values(&[
        ("A", SignalValue::Integer(0x1F)),
        ("B", SignalValue::Integer(0)),
        ("C", SignalValue::Integer(0xF)),
    ]);
    let payload = message
        .encode(&input, &EncodeOptions::new().with_padding(0xFF))
        .unwrap();
    let decoded = message.decode(&payload, &decode_defaults()).unwrap();
    assert_eq!(decoded["A"], SignalValue::Integer(0x1F));
    assert_eq!(decoded["B"], SignalValue::Integer(0));
    assert_eq!(decoded["C"], SignalValue::Integer(0xF));
    // Bits 16.. belong to no signal and keep the fill value
    assert_eq!(&payload[2..], &[0xFF; 6]);
}

#[test]
fn twos_complement_boundary() {
    let message = Message::builder(0x63, "Signed", 1)
        .signal(Signal::new("S", 0, 8, ByteOrder::LittleEndian, ValueKind::Signed))
        .build()
        .unwrap();

    let decoded = message.decode(&[0xFF], &decode_defaults()).unwrap();
    assert_eq!(decoded["S"], SignalValue::Integer(-1));
    let decoded = message.decode(&[0x7F], &decode_defaults()).unwrap();
    assert_eq!(decoded["S"], SignalValue::Integer(127));

    let payload = message
        .encode(&values(&[("S", SignalValue::Integer(-1))]), &encode_defaults())
        .unwrap();
    assert_eq!(payload, vec![0xFF]);
}

#[test]
fn float32_round_trips_bit_exactly() {
    let message = Message::builder(0x64, "Floats", 8)
        .signal(Signal::new("F", 0, 32, ByteOrder::LittleEndian, ValueKind::Float32))
        .build()
        .unwrap();

    for physical in [0.0f32, -0.0, 1.0, 3.14] {
        let input = values(&[("F", SignalValue::Float(physical as f64))]);
        let payload = message.encode(&input, &encode_defaults()).unwrap();
        let decoded = message.decode(&payload, &decode_defaults()).unwrap();
        let SignalValue::Float(out) = decoded["F"] else {
            panic!("float signal decoded to non-float");
        };
        assert_eq!((out as f32).to_bits(), physical.to_bits());
    }
}

#[test]
fn float64_applies_scale_and_offset() {
    let message = Message::builder(0x65, "Floats", 8)
        .signal(
            Signal::new("F", 0, 64, ByteOrder::LittleEndian, ValueKind::Float64)
                .with_scaling(2.0, 1.0),
        )
        .build()
        .unwrap();

    let input = values(&[("F", SignalValue::Float(7.0))]);
    let payload = message.encode(&input, &encode_defaults()).unwrap();
    // raw = (7 - 1) / 2 = 3.0 stored as a bit pattern
    assert_eq!(u64::from_le_bytes(payload.clone().try_into().unwrap()), 3.0f64.to_bits());
    let decoded = message.decode(&payload, &decode_defaults()).unwrap();
    assert_eq!(decoded["F"], SignalValue::Float(7.0));
}

#[test]
fn wrong_length_names_expected_and_actual() {
    let db = sonar_database();
    let result = db.decode_frame(200, &[0xF0, 0, 0, 0], &decode_defaults());
    match result {
        Err(CodecError::WrongLength {
            message,
            expected,
            actual,
        }) => {
            assert_eq!(message, "SENSOR_SONARS");
            assert_eq!(expected, 8);
            assert_eq!(actual, 4);
        }
        other => panic!("expected WrongLength, got {:?}", other),
    }
}

#[test]
fn truncated_decode_omits_unreachable_signals() {
    let db = sonar_database();
    let options = DecodeOptions::new().with_truncated(true);
    let decoded = db.decode_frame(200, &[0xF0, 0, 0, 0], &options).unwrap();
    // mux, err_count, and left fit the 4 bytes; the rest are omitted
    assert_eq!(decoded["SENSOR_SONARS_mux"], SignalValue::Integer(0));
    assert_eq!(decoded["SENSOR_SONARS_err_count"], SignalValue::Integer(15));
    assert_eq!(decoded["SENSOR_SONARS_left"], SignalValue::Float(0.0));
    assert!(!decoded.contains_key("SENSOR_SONARS_middle"));
    assert!(!decoded.contains_key("SENSOR_SONARS_rear"));
}

#[test]
fn excess_payload_policy() {
    let message = Message::builder(0x66, "Short", 2)
        .signal(Signal::new("S", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .build()
        .unwrap();

    let long = [0x42, 0, 0, 0];
    assert!(message.decode(&long, &decode_defaults()).is_err());
    let decoded = message
        .decode(&long, &DecodeOptions::new().with_excess(true))
        .unwrap();
    assert_eq!(decoded["S"], SignalValue::Integer(0x42));
}

#[test]
fn encode_missing_signal_policies() {
    let message = Message::builder(0x67, "Pair", 2)
        .signal(Signal::new("A", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .signal(Signal::new("B", 8, 8, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .build()
        .unwrap();

    let input = values(&[("A", SignalValue::Integer(9))]);
    let strict = message.encode(&input, &encode_defaults());
    assert!(matches!(strict, Err(CodecError::MissingSignal(name)) if name == "B"));

    let filled = message
        .encode(&input, &EncodeOptions::new().with_fill_missing(true))
        .unwrap();
    assert_eq!(filled, vec![9, 0]);
}

#[test]
fn encode_missing_multiplexer_fails() {
    let message = battery_message();
    let input = values(&[("MODULE_VOLTAGE_07", SignalValue::Integer(100))]);
    let result = message.encode(&input, &encode_defaults());
    assert!(matches!(
        result,
        Err(CodecError::MissingMultiplexer(name)) if name == "BATTERY_VT_INDEX"
    ));
}

#[test]
fn choices_decode_and_encode_symbolically() {
    let mut table = ValueTable::new();
    table.insert(0, "Off");
    table.insert(1, "On");
    table.insert(2, "Error");
    let message = Message::builder(0x68, "Status", 1)
        .signal(
            Signal::new("State", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .with_choices(table),
        )
        .build()
        .unwrap();

    let decoded = message.decode(&[1], &decode_defaults()).unwrap();
    assert_eq!(decoded["State"], SignalValue::Label("On".to_string()));

    // Labels round-trip through the reverse lookup
    let payload = message
        .encode(&values(&[("State", SignalValue::from("Error"))]), &encode_defaults())
        .unwrap();
    assert_eq!(payload, vec![2]);

    // Values outside the table stay numeric
    let decoded = message.decode(&[9], &decode_defaults()).unwrap();
    assert_eq!(decoded["State"], SignalValue::Integer(9));

    // Choice substitution can be disabled
    let decoded = message
        .decode(&[1], &DecodeOptions::new().with_choices(false))
        .unwrap();
    assert_eq!(decoded["State"], SignalValue::Integer(1));

    let unknown = message.encode(
        &values(&[("State", SignalValue::from("Busted"))]),
        &encode_defaults(),
    );
    assert!(matches!(unknown, Err(CodecError::InvalidChoice { .. })));
}

#[test]
fn strict_range_violations_name_the_bound() {
    let message = Message::builder(0x69, "Bounded", 1)
        .signal(
            Signal::new("B", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .with_range(10.0, 200.0),
        )
        .build()
        .unwrap();

    let low = message.encode(&values(&[("B", SignalValue::Integer(5))]), &encode_defaults());
    match low {
        Err(CodecError::OutOfRange { bound, limit, .. }) => {
            assert_eq!(bound, "minimum");
            assert_eq!(limit, 10.0);
        }
        other => panic!("expected OutOfRange, got {:?}", other),
    }

    let high = message.encode(&values(&[("B", SignalValue::Integer(201))]), &encode_defaults());
    assert!(matches!(
        high,
        Err(CodecError::OutOfRange { bound: "maximum", .. })
    ));

    // Non-strict mode truncates instead
    let lenient = message
        .encode(
            &values(&[("B", SignalValue::Integer(0x142))]),
            &EncodeOptions::new().with_strict(false),
        )
        .unwrap();
    assert_eq!(lenient, vec![0x42]);
}

#[test]
fn decoded_map_serializes_to_json() {
    let message = Message::builder(0x6A, "Mixed", 2)
        .signal(Signal::new("Count", 0, 8, ByteOrder::LittleEndian, ValueKind::Unsigned))
        .signal(
            Signal::new("Level", 8, 8, ByteOrder::LittleEndian, ValueKind::Unsigned)
                .with_scaling(0.5, 0.0),
        )
        .build()
        .unwrap();

    let decoded = message.decode(&[7, 3], &decode_defaults()).unwrap();
    let json = serde_json::to_value(&decoded).unwrap();
    assert_eq!(json["Count"], serde_json::json!(7));
    assert_eq!(json["Level"], serde_json::json!(1.5));
}

#[test]
fn batch_of_frames_reports_outcomes_independently() {
    let db = sonar_database();
    let frames: Vec<(u32, Vec<u8>)> = vec![
        (200, vec![0xF0, 0, 0, 0, 0, 0, 0, 0]),
        (999, vec![0; 8]),
        (200, vec![0; 4]),
        (200, vec![0x01, 0, 0, 0, 0, 0, 0, 0]),
    ];

    let outcomes: Vec<_> = frames
        .iter()
        .map(|(id, payload)| db.decode_frame(*id, payload, &decode_defaults()))
        .collect();

    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(CodecError::UnknownMessage(999))));
    assert!(matches!(outcomes[2], Err(CodecError::WrongLength { .. })));
    // A failed frame does not poison the ones after it
    assert!(outcomes[3].is_ok());
}
