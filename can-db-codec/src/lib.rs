//! CAN Database Codec Library
//!
//! An in-memory schema of CAN messages and signals, and the codec that
//! translates between that schema and raw frame payloads. Format parsers
//! feed the schema (a DBC adapter ships in this crate; KCD/SYM and others
//! plug in through the same builders), and consumers such as interactive
//! decoders, dump renderers, and code generators read from it.
//!
//! # Architecture
//!
//! The library is intentionally focused on the schema and the codec:
//! - Validated, immutable `Signal`/`Message`/`Database` value objects
//! - Bit-exact packing and unpacking for both CAN byte orders, signed and
//!   unsigned integers, and IEEE floats
//! - Multiplexed signal sets, including nested multiplexers
//! - Scale/offset physical-value conversion and symbolic value tables
//!
//! The library does NOT:
//! - Perform bus I/O or schedule transmission
//! - Parse log-file formats or detect timestamp styles
//! - Render bit-layout dumps or generate embedded C accessors
//!
//! Those concerns live in the applications built on top of this crate.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_db_codec::{Database, DecodeOptions};
//! use std::path::Path;
//!
//! let mut db = Database::new();
//! db.add_dbc_file(Path::new("powertrain.dbc")).unwrap();
//!
//! let payload = [0x10, 0x00, 0x14, 0xE0, 0x01, 0x28, 0x20, 0x03];
//! match db.decode_frame(200, &payload, &DecodeOptions::default()) {
//!     Ok(signals) => {
//!         for (name, value) in &signals {
//!             println!("{} = {}", name, value);
//!         }
//!     }
//!     Err(e) => eprintln!("Decode error: {}", e),
//! }
//! ```

// Public modules
pub mod codec;
pub mod dbc;
pub mod options;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use codec::{decode_message, encode_message};
pub use options::{DecodeOptions, EncodeOptions};
pub use schema::{
    ByteOrder, Database, DatabaseStats, Message, MessageBuilder, MultiplexTree, MultiplexerInfo,
    MuxNode, Signal, ValueKind, ValueTable,
};
pub use types::{CodecError, Result, SignalValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
