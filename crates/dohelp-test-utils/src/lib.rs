// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the DoHelp chat subsystem.
//!
//! Provides mock implementations of the backend adapter traits:
//! - [`MockApi`]: scripted marketplace API with call recording and
//!   hold/release gates for in-flight-request tests
//! - [`MockTransport`]: realtime transport with injectable events
//!
//! These mocks enable deterministic testing of the chat session controller
//! without network access.

pub mod mock_api;
pub mod mock_transport;

pub use mock_api::{ApiCall, MockApi};
pub use mock_transport::MockTransport;

use chrono::{TimeZone, Utc};
use dohelp_core::types::{ChatMessage, ConversationId, MessageId, UserId};

/// Builds a chat message with a fixed timestamp for assertions.
pub fn make_message(id: &str, conversation: &str, sender: &str, body: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId(id.into()),
        conversation_id: ConversationId(conversation.into()),
        sender: UserId(sender.into()),
        body: body.into(),
        created_at: Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap(),
        seen: false,
    }
}
