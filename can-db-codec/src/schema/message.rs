//! Message definitions and the multiplex tree
//!
//! A message is an immutable, validated set of uniquely-named signals plus
//! payload length and identifier. All schema invariants are enforced here,
//! at construction, so the codec can assume valid geometry and an acyclic
//! multiplex structure.

use crate::codec::bits;
use crate::codec::{decode_message, encode_message};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::schema::signal::Signal;
use crate::types::{CodecError, Result, SignalValue};
use std::collections::{BTreeMap, HashMap};

/// One multiplexer switch and its children, indexed into the owning
/// message's signal vector
#[derive(Debug, Clone)]
pub struct MuxNode {
    /// Index of the switch signal
    pub switch: usize,
    /// Selector value -> indices of signals active for that value
    pub cases: BTreeMap<u64, Vec<usize>>,
}

/// Arena of multiplexer nodes for one message
///
/// Nodes hold signal indices rather than references, so nesting is
/// represented without back-pointers and activation resolves iteratively.
/// Empty for messages without multiplexing.
#[derive(Debug, Clone, Default)]
pub struct MultiplexTree {
    nodes: Vec<MuxNode>,
    by_switch: HashMap<usize, usize>,
}

impl MultiplexTree {
    /// True when the message has no multiplexer signals
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node governed by the signal at `switch_index`, if that signal is a
    /// multiplexer
    pub fn node_for(&self, switch_index: usize) -> Option<&MuxNode> {
        self.by_switch.get(&switch_index).map(|i| &self.nodes[*i])
    }

    /// All nodes, in switch declaration order
    pub fn nodes(&self) -> &[MuxNode] {
        &self.nodes
    }
}

/// A complete CAN message definition
///
/// Constructed through [`Message::builder`]; construction fails with
/// `MalformedSignal`/`MalformedMessage` instead of producing a partially
/// valid schema. Instances are immutable value objects.
#[derive(Debug, Clone)]
pub struct Message {
    id: u32,
    name: String,
    length: usize,
    is_extended_id: bool,
    is_fd: bool,
    senders: Vec<String>,
    comment: Option<String>,
    signals: Vec<Signal>,
    by_name: HashMap<String, usize>,
    top_level: Vec<usize>,
    mux_tree: MultiplexTree,
}

impl Message {
    /// Start building a message with the given identifier, name, and
    /// payload length in bytes
    pub fn builder(id: u32, name: impl Into<String>, length: usize) -> MessageBuilder {
        MessageBuilder {
            id,
            name: name.into(),
            length,
            is_extended_id: false,
            is_fd: false,
            senders: Vec::new(),
            comment: None,
            signals: Vec::new(),
        }
    }

    /// Frame identifier (11- or 29-bit)
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Message name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload size in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    /// True for 29-bit identifiers
    pub fn is_extended_id(&self) -> bool {
        self.is_extended_id
    }

    /// True for FD-capable messages (payloads above 8 bytes)
    pub fn is_fd(&self) -> bool {
        self.is_fd
    }

    /// Sender node names (informational)
    pub fn senders(&self) -> &[String] {
        &self.senders
    }

    /// Message comment from the source database
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Signals in insertion order
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Signal by name
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.by_name.get(name).map(|i| &self.signals[*i])
    }

    /// Index of a signal by name
    pub fn signal_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Indices of signals that are always active (no multiplexer
    /// membership)
    pub fn top_level(&self) -> &[usize] {
        &self.top_level
    }

    /// This message's multiplex structure
    pub fn multiplex_tree(&self) -> &MultiplexTree {
        &self.mux_tree
    }

    /// True when any signal multiplexes others
    pub fn is_multiplexed(&self) -> bool {
        !self.mux_tree.is_empty()
    }

    /// Decode a payload into a mapping of signal name to value.
    ///
    /// Inactive multiplexed signals are omitted entirely.
    pub fn decode(
        &self,
        payload: &[u8],
        options: &DecodeOptions,
    ) -> Result<HashMap<String, SignalValue>> {
        decode_message(self, payload, options)
    }

    /// Encode a mapping of signal name to value into a payload buffer
    pub fn encode(
        &self,
        values: &HashMap<String, SignalValue>,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        encode_message(self, values, options)
    }
}

/// Builder for [`Message`]; `build` runs all schema validation
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    id: u32,
    name: String,
    length: usize,
    is_extended_id: bool,
    is_fd: bool,
    senders: Vec<String>,
    comment: Option<String>,
    signals: Vec<Signal>,
}

impl MessageBuilder {
    /// Mark the identifier as extended (29-bit)
    pub fn extended(mut self, extended: bool) -> Self {
        self.is_extended_id = extended;
        self
    }

    /// Mark the message as CAN FD (payloads up to 64 bytes)
    pub fn fd(mut self, fd: bool) -> Self {
        self.is_fd = fd;
        self
    }

    /// Add a sender node name
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.senders.push(sender.into());
        self
    }

    /// Attach a comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Add one signal
    pub fn signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Add several signals
    pub fn signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals.extend(signals);
        self
    }

    /// Validate everything and produce the immutable message
    pub fn build(self) -> Result<Message> {
        let max_length = if self.is_fd { 64 } else { 8 };
        if self.length > max_length {
            return Err(malformed(
                &self.name,
                format!(
                    "payload length {} exceeds the {}-byte maximum",
                    self.length, max_length
                ),
            ));
        }
        if self.is_extended_id && self.id > 0x1FFF_FFFF {
            return Err(malformed(
                &self.name,
                format!("identifier 0x{:X} exceeds 29 bits", self.id),
            ));
        }
        if !self.is_extended_id && self.id > 0x7FF {
            return Err(malformed(
                &self.name,
                format!("identifier 0x{:X} exceeds 11 bits", self.id),
            ));
        }

        let mut by_name = HashMap::with_capacity(self.signals.len());
        for (index, signal) in self.signals.iter().enumerate() {
            signal.validate(8 * self.length)?;
            if by_name.insert(signal.name.clone(), index).is_some() {
                return Err(malformed(
                    &self.name,
                    format!("duplicate signal name '{}'", signal.name),
                ));
            }
        }

        let mux_tree = build_mux_tree(&self.name, &self.signals, &by_name)?;
        check_mux_chains(&self.name, &self.signals, &by_name)?;
        check_overlaps(&self.name, &self.signals, &by_name)?;

        let top_level = self
            .signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.multiplexer.is_none())
            .map(|(i, _)| i)
            .collect();

        log::debug!(
            "Built message '{}' (ID 0x{:X}, {} bytes, {} signals)",
            self.name,
            self.id,
            self.length,
            self.signals.len()
        );

        Ok(Message {
            id: self.id,
            name: self.name,
            length: self.length,
            is_extended_id: self.is_extended_id,
            is_fd: self.is_fd,
            senders: self.senders,
            comment: self.comment,
            signals: self.signals,
            by_name,
            top_level,
            mux_tree,
        })
    }
}

fn malformed(message: &str, reason: impl Into<String>) -> CodecError {
    CodecError::MalformedMessage {
        name: message.to_string(),
        reason: reason.into(),
    }
}

fn build_mux_tree(
    message: &str,
    signals: &[Signal],
    by_name: &HashMap<String, usize>,
) -> Result<MultiplexTree> {
    let mut tree = MultiplexTree::default();

    for (index, signal) in signals.iter().enumerate() {
        if signal.is_multiplexer {
            tree.by_switch.insert(index, tree.nodes.len());
            tree.nodes.push(MuxNode {
                switch: index,
                cases: BTreeMap::new(),
            });
        }
    }

    for (index, signal) in signals.iter().enumerate() {
        let Some(mux) = &signal.multiplexer else {
            continue;
        };
        let switch_index = *by_name.get(&mux.switch).ok_or_else(|| {
            malformed(
                message,
                format!(
                    "signal '{}' is multiplexed by unknown signal '{}'",
                    signal.name, mux.switch
                ),
            )
        })?;
        if !signals[switch_index].is_multiplexer {
            return Err(malformed(
                message,
                format!(
                    "signal '{}' is multiplexed by '{}', which is not a multiplexer",
                    signal.name, mux.switch
                ),
            ));
        }
        let node_index = tree.by_switch[&switch_index];
        for selector in &mux.selector_ids {
            tree.nodes[node_index]
                .cases
                .entry(*selector)
                .or_default()
                .push(index);
        }
    }

    Ok(tree)
}

/// Walk every signal's switch chain to the top; a revisit is a cycle.
fn check_mux_chains(
    message: &str,
    signals: &[Signal],
    by_name: &HashMap<String, usize>,
) -> Result<()> {
    for (index, _) in signals.iter().enumerate() {
        let mut seen = vec![index];
        let mut current = index;
        while let Some(mux) = &signals[current].multiplexer {
            // Switch existence was checked while building the tree.
            let parent = by_name[&mux.switch];
            if seen.contains(&parent) {
                return Err(malformed(
                    message,
                    format!(
                        "multiplexer cycle through signal '{}'",
                        signals[parent].name
                    ),
                ));
            }
            seen.push(parent);
            current = parent;
        }
    }
    Ok(())
}

/// Selector constraints a signal's activation places on each switch in its
/// chain: switch index -> allowed selector values.
fn activation_condition(
    index: usize,
    signals: &[Signal],
    by_name: &HashMap<String, usize>,
) -> HashMap<usize, Vec<u64>> {
    let mut condition = HashMap::new();
    let mut current = index;
    while let Some(mux) = &signals[current].multiplexer {
        let parent = by_name[&mux.switch];
        condition.insert(parent, mux.selector_ids.clone());
        current = parent;
    }
    condition
}

/// Two signals can be active in the same frame unless some shared switch
/// constrains them to disjoint selector values.
fn can_coexist(
    a: &HashMap<usize, Vec<u64>>,
    b: &HashMap<usize, Vec<u64>>,
) -> bool {
    for (switch, a_values) in a {
        if let Some(b_values) = b.get(switch) {
            if !a_values.iter().any(|v| b_values.contains(v)) {
                return false;
            }
        }
    }
    true
}

fn check_overlaps(
    message: &str,
    signals: &[Signal],
    by_name: &HashMap<String, usize>,
) -> Result<()> {
    let masks: Vec<Vec<usize>> = signals.iter().map(bits::bit_positions).collect();
    let conditions: Vec<_> = (0..signals.len())
        .map(|i| activation_condition(i, signals, by_name))
        .collect();

    for a in 0..signals.len() {
        for b in (a + 1)..signals.len() {
            if !can_coexist(&conditions[a], &conditions[b]) {
                continue;
            }
            if masks[a].iter().any(|bit| masks[b].contains(bit)) {
                return Err(malformed(
                    message,
                    format!(
                        "signals '{}' and '{}' overlap in bit range while both can be active",
                        signals[a].name, signals[b].name
                    ),
                ));
            }
        }
    }
    Ok(())
}
