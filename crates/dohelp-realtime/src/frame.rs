// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire frames exchanged over the realtime WebSocket.
//!
//! Frames are JSON objects discriminated by an `event` field. The three
//! event names (`join-room`, `message-received`, `message-seen`) are the
//! transport contract; everything else about the protocol is an internal
//! detail of this crate.

use serde::{Deserialize, Serialize};

use dohelp_core::types::{ChatMessage, MessageId};

/// Client -> server frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Join the room scoped to one conversation.
    JoinRoom { room: String },
}

/// Server -> client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// A message was pushed into a joined room.
    MessageReceived { message: ChatMessage },
    /// A message was marked seen by its receiver.
    MessageSeen { message_id: MessageId },
}
