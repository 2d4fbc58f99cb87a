// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the chat session controller.
//!
//! Identifier newtypes deserialize from JSON strings *or* numbers: the three
//! message sources (REST history, realtime push, local send echo) do not
//! share an identifier encoding, so every identifier is normalized to its
//! canonical string form at the deserialization boundary. All comparisons
//! downstream operate on the normalized form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Deserializes a JSON string or integer into its canonical string form.
fn lax_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Uint(n) => n.to_string(),
    })
}

/// Canonical participant identity.
///
/// Always held in string form; `UserId("42")` deserialized from the number
/// `42` and from the string `"42"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserId(pub String);

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lax_string(deserializer).map(UserId)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(pub String);

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lax_string(deserializer).map(TaskId)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Returns the realtime room identifier scoped to this conversation.
    pub fn room(&self) -> String {
        format!("conversation:{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lax_string(deserializer).map(ConversationId)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        ConversationId(s.to_string())
    }
}

/// Unique identifier for a message, server-assigned per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MessageId(pub String);

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lax_string(deserializer).map(MessageId)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId(s.to_string())
    }
}

/// A chat message as held in the controller's store.
///
/// The `seen` flag defaults to false when the source omits it; it only ever
/// transitions false -> true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub seen: bool,
}

/// Task metadata, read-only, supplied by the marketplace API.
///
/// `helper` is absent while the task is unassigned. A fallback `TaskRef`
/// built from caller-supplied [`PeerInfo`] substitutes when the task fetch
/// degrades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: TaskId,
    #[serde(default)]
    pub poster: Option<UserId>,
    #[serde(default)]
    pub helper: Option<UserId>,
}

/// Caller-supplied fallback peer data, used when task metadata cannot be
/// retrieved. The chat degrades to "receiver best-effort" rather than
/// failing the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: Option<UserId>,
    pub display_name: String,
}

/// Inbound events delivered by a realtime transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// A message was pushed into a joined room.
    MessageReceived(ChatMessage),
    /// A message was marked seen by its receiver.
    MessageSeen { message_id: MessageId },
    /// The transport connection was established.
    Connected,
    /// The transport connection was closed or lost.
    Disconnected,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Api,
    Realtime,
}
