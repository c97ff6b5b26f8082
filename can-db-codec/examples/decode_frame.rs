//! Standalone frame decode tool
//!
//! Loads a DBC file and decodes hex-encoded frames given on the command
//! line, printing each signal's physical value or choice label.
//!
//! Usage:
//!   decode_frame <file.dbc> <can_id> <hex_payload>
//!
//! Example:
//!   decode_frame powertrain.dbc 200 F000000000000000

use anyhow::{bail, Context};
use can_db_codec::{Database, DecodeOptions};
use std::env;
use std::path::Path;

fn parse_hex_payload(hex: &str) -> anyhow::Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("payload hex must have an even number of digits");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &hex[i..i + 2]))
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        bail!("usage: decode_frame <file.dbc> <can_id> <hex_payload>");
    }

    let db = Database::from_dbc_file(Path::new(&args[1]))
        .with_context(|| format!("failed to load {}", args[1]))?;
    let stats = db.stats();
    println!(
        "Loaded {} messages / {} signals",
        stats.num_messages, stats.num_signals
    );

    let id: u32 = if let Some(hex) = args[2].strip_prefix("0x") {
        u32::from_str_radix(hex, 16)?
    } else {
        args[2].parse()?
    };
    let payload = parse_hex_payload(&args[3])?;

    let message = db
        .message_for_frame(id, payload.len())
        .with_context(|| format!("no message with CAN ID 0x{:X}", id))?;
    println!("Message: {} ({} bytes)", message.name(), message.length());

    let decoded = message.decode(&payload, &DecodeOptions::default())?;
    let mut names: Vec<_> = decoded.keys().collect();
    names.sort();
    for name in names {
        let signal = message.signal(name).unwrap();
        match &signal.unit {
            Some(unit) => println!("  {} = {} {}", name, decoded[name], unit),
            None => println!("  {} = {}", name, decoded[name]),
        }
    }

    Ok(())
}
