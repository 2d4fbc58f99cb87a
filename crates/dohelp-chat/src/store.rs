// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Insertion-ordered message arena keyed by message id.
//!
//! Any incoming message (history fetch, realtime push, local send echo) is
//! appended only if no existing entry shares its identifier; the seen flag
//! of an existing entry is only ever raised, never lowered. Because
//! membership is keyed, final store state is independent of the arrival
//! order of the three sources.

use std::collections::HashMap;

use dohelp_core::types::{ChatMessage, MessageId};

/// The message store owned by one chat session.
///
/// Visible order is strictly append order as accepted by the merge rule:
/// server-assigned ids and history-fetch order are assumed already
/// chronological, so no client-side re-sort is performed.
#[derive(Debug, Default)]
pub struct MessageStore {
    order: Vec<ChatMessage>,
    index: HashMap<MessageId, usize>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message unless its id is already present.
    ///
    /// Returns true if the message was appended, false if it was dropped as
    /// a duplicate.
    pub fn insert(&mut self, message: ChatMessage) -> bool {
        if self.index.contains_key(&message.id) {
            return false;
        }
        self.index.insert(message.id.clone(), self.order.len());
        self.order.push(message);
        true
    }

    /// Merges a batch of messages (history fetch), dropping duplicates.
    ///
    /// Returns the number of messages actually appended.
    pub fn merge(&mut self, messages: Vec<ChatMessage>) -> usize {
        let mut appended = 0;
        for message in messages {
            if self.insert(message) {
                appended += 1;
            }
        }
        appended
    }

    /// Raises the seen flag of a message in place.
    ///
    /// Returns true if the flag transitioned false -> true; false when the
    /// message is unknown locally or already seen. The flag is monotonic:
    /// nothing in this store ever lowers it.
    pub fn mark_seen(&mut self, id: &MessageId) -> bool {
        match self.index.get(id) {
            Some(&pos) if !self.order[pos].seen => {
                self.order[pos].seen = true;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.index.get(id).map(|&pos| &self.order[pos])
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The messages in visible (append) order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.order
    }

    /// Discards all messages. Used on panel close and task change.
    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}
