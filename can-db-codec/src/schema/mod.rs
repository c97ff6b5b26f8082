//! Schema data model
//!
//! Value tables, signals, messages, and the database they live in. All
//! instances are validated at construction and immutable afterwards.

pub mod database;
pub mod message;
pub mod signal;

// Re-export key types for convenience
pub use database::{Database, DatabaseStats};
pub use message::{Message, MessageBuilder, MultiplexTree, MuxNode};
pub use signal::{ByteOrder, MultiplexerInfo, Signal, ValueKind, ValueTable};
