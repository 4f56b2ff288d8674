//! Inbound message classification and the watchpoint reverse index.
//!
//! The reverse index answers "which watchpoints reference this message ID"
//! without scanning the definition table per message. It is rebuilt on
//! table load; lookups never allocate.

use std::collections::HashMap;

use crate::msg::{MessageId, CMD_MID, SAMPLE_AP_MID, SEND_HK_MID};
use crate::tables::watchpoint::WatchDefinition;

/// Disposition of one inbound bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    SampleActionpoints,
    SendHousekeeping,
    Command,
    Monitored,
}

pub fn classify(msg_id: MessageId) -> MessageClass {
    match msg_id {
        SAMPLE_AP_MID => MessageClass::SampleActionpoints,
        SEND_HK_MID => MessageClass::SendHousekeeping,
        CMD_MID => MessageClass::Command,
        _ => MessageClass::Monitored,
    }
}

/// Precomputed `MessageId -> [watchpoint index]` map.
#[derive(Debug, Default)]
pub struct MessageRouter {
    index: HashMap<MessageId, Box<[u16]>>,
}

impl MessageRouter {
    /// Build the reverse index from an already-validated definition table.
    /// Index lists keep ascending watchpoint order.
    pub fn build(definitions: &[WatchDefinition]) -> Self {
        let mut scratch: HashMap<MessageId, Vec<u16>> = HashMap::new();
        for (wp_index, definition) in definitions.iter().enumerate() {
            if definition.is_used() {
                scratch
                    .entry(definition.message_id)
                    .or_default()
                    .push(wp_index as u16);
            }
        }
        let index = scratch
            .into_iter()
            .map(|(id, list)| (id, list.into_boxed_slice()))
            .collect();
        Self { index }
    }

    /// Watchpoints referencing this message ID; empty for unrelated traffic.
    pub fn watchpoints_for(&self, msg_id: MessageId) -> &[u16] {
        self.index.get(&msg_id).map_or(&[], |list| list)
    }

    /// Number of distinct message IDs under watch.
    pub fn monitored_id_count(&self) -> usize {
        self.index.len()
    }
}
