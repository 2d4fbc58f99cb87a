// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marketplace REST API trait: task metadata, conversations, and messages.

use async_trait::async_trait;

use crate::error::DohelpError;
use crate::traits::adapter::PlatformAdapter;
use crate::types::{ChatMessage, ConversationId, MessageId, TaskId, TaskRef, UserId};

/// Adapter for the marketplace REST API consumed by the chat controller.
///
/// All operations suspend independently and never block the caller. The
/// conversation create is idempotent per (task, pair of participants):
/// repeated calls for the same task and receiver return the same
/// conversation id rather than creating duplicates.
#[async_trait]
pub trait MarketplaceApi: PlatformAdapter {
    /// Fetches task metadata (poster/helper identities).
    ///
    /// Failures (non-2xx, non-JSON, missing task) surface as
    /// [`DohelpError::Api`]; the controller substitutes fallback peer data
    /// rather than propagating them.
    async fn fetch_task(&self, task: &TaskId) -> Result<TaskRef, DohelpError>;

    /// Creates or fetches the conversation pairing the current user with
    /// `receiver` for `task`.
    async fn create_conversation(
        &self,
        receiver: &UserId,
        task: &TaskId,
    ) -> Result<ConversationId, DohelpError>;

    /// Fetches the message history of a conversation, in chronological order.
    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<ChatMessage>, DohelpError>;

    /// Sends a message and returns the created message, including its
    /// server-assigned id and timestamp.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<ChatMessage, DohelpError>;

    /// Marks a message seen. Fire-and-forget from the controller's
    /// perspective.
    async fn mark_seen(&self, message: &MessageId) -> Result<(), DohelpError>;
}
