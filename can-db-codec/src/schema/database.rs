//! The message database
//!
//! Collection of validated messages indexed by identifier and name. A
//! database is an explicit object passed to callers, never process-wide
//! state, so several databases can coexist in one process. Build it once
//! from one or more source files, then treat it as read-only; the codec
//! never mutates it.

use crate::options::{DecodeOptions, EncodeOptions};
use crate::schema::message::Message;
use crate::types::{CodecError, Result, SignalValue};
use std::collections::HashMap;
use std::path::Path;

/// A collection of CAN message definitions
#[derive(Debug, Clone, Default)]
pub struct Database {
    messages: Vec<Message>,
    /// CAN ID -> message indices; several definitions may share one ID
    /// (differing by payload length, a real occurrence in mixed fleets)
    by_id: HashMap<u32, Vec<usize>>,
    by_name: HashMap<String, usize>,
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}

impl Database {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from a single DBC file
    pub fn from_dbc_file(path: &Path) -> Result<Self> {
        let mut db = Self::new();
        db.add_dbc_file(path)?;
        Ok(db)
    }

    /// Load a DBC file and add its messages to the database
    pub fn add_dbc_file(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading DBC file: {:?}", path);
        for message in crate::dbc::load_dbc_file(path)? {
            self.add_message(message);
        }
        log::info!("DBC file loaded successfully: {:?}", path);
        Ok(())
    }

    /// Add a validated message to the database
    pub fn add_message(&mut self, message: Message) {
        let index = self.messages.len();
        self.by_id.entry(message.id()).or_default().push(index);
        self.by_name.insert(message.name().to_string(), index);
        self.messages.push(message);
    }

    /// All messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// First message with the given CAN ID
    pub fn message_by_id(&self, id: u32) -> Option<&Message> {
        self.by_id
            .get(&id)
            .and_then(|indices| indices.first())
            .map(|i| &self.messages[*i])
    }

    /// All messages sharing the given CAN ID
    pub fn messages_by_id(&self, id: u32) -> impl Iterator<Item = &Message> {
        self.by_id
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |i| &self.messages[*i])
    }

    /// Message by name
    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.by_name.get(name).map(|i| &self.messages[*i])
    }

    /// Message for a received frame, disambiguating by payload length when
    /// several definitions share the identifier.
    ///
    /// An exact length match wins; otherwise the first definition for the
    /// ID is returned and the codec's own length policy applies.
    pub fn message_for_frame(&self, id: u32, payload_len: usize) -> Option<&Message> {
        let candidates = self.by_id.get(&id)?;
        candidates
            .iter()
            .map(|i| &self.messages[*i])
            .find(|m| m.length() == payload_len)
            .or_else(|| candidates.first().map(|i| &self.messages[*i]))
    }

    /// Decode one frame: look up the message for `(id, payload length)`
    /// and run the codec.
    ///
    /// An unknown identifier is a lookup failure (`UnknownMessage`), kept
    /// distinct from codec failures so a batch loop can report each
    /// frame's outcome independently.
    pub fn decode_frame(
        &self,
        id: u32,
        payload: &[u8],
        options: &DecodeOptions,
    ) -> Result<HashMap<String, SignalValue>> {
        let message = self
            .message_for_frame(id, payload.len())
            .ok_or(CodecError::UnknownMessage(id))?;
        log::debug!("Decoding message '{}' (ID 0x{:X})", message.name(), id);
        message.decode(payload, options)
    }

    /// Encode one frame for the first message with this identifier
    pub fn encode_frame(
        &self,
        id: u32,
        values: &HashMap<String, SignalValue>,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        let message = self
            .message_by_id(id)
            .ok_or(CodecError::UnknownMessage(id))?;
        message.encode(values, options)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.iter().map(|m| m.signals().len()).sum(),
        }
    }

    /// All unique CAN IDs in the database, sorted
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ByteOrder, Signal, ValueKind};

    fn message(id: u32, name: &str, length: usize) -> Message {
        Message::builder(id, name, length)
            .signal(Signal::new(
                format!("{name}_sig"),
                0,
                8,
                ByteOrder::LittleEndian,
                ValueKind::Unsigned,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_database() {
        let db = Database::new();
        let stats = db.stats();
        assert_eq!(stats.num_messages, 0);
        assert_eq!(stats.num_signals, 0);
        assert!(db.message_by_id(0x123).is_none());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut db = Database::new();
        db.add_message(message(0x123, "EngineData", 8));
        db.add_message(message(0x200, "Brakes", 8));

        assert_eq!(db.stats().num_messages, 2);
        assert_eq!(db.stats().num_signals, 2);
        assert_eq!(db.ids(), vec![0x123, 0x200]);
        assert_eq!(db.message_by_id(0x123).unwrap().name(), "EngineData");
        assert_eq!(db.message_by_name("Brakes").unwrap().id(), 0x200);
    }

    #[test]
    fn test_frame_length_disambiguation() {
        let mut db = Database::new();
        db.add_message(message(0x123, "Short", 2));
        db.add_message(message(0x123, "Long", 8));

        assert_eq!(db.message_for_frame(0x123, 8).unwrap().name(), "Long");
        assert_eq!(db.message_for_frame(0x123, 2).unwrap().name(), "Short");
        // No exact match: first definition wins
        assert_eq!(db.message_for_frame(0x123, 5).unwrap().name(), "Short");
        assert!(db.message_for_frame(0x999, 8).is_none());
    }

    #[test]
    fn test_decode_unknown_id() {
        let db = Database::new();
        let result = db.decode_frame(0x42, &[0; 8], &DecodeOptions::default());
        assert!(matches!(result, Err(CodecError::UnknownMessage(0x42))));
    }
}
