// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime transport trait for conversation-scoped push events.

use async_trait::async_trait;

use crate::error::DohelpError;
use crate::traits::adapter::PlatformAdapter;
use crate::types::{RealtimeEvent, UserId};

/// Adapter for the bidirectional realtime event channel.
///
/// One connection exists per logged-in session, parameterized by the
/// current user's identity; room membership scopes the connection to a
/// single conversation and is re-established whenever the conversation id
/// changes. Implementations use interior mutability so the event loop can
/// read while the controller joins rooms.
#[async_trait]
pub trait RealtimeTransport: PlatformAdapter {
    /// Establishes the connection, scoped to `user`.
    ///
    /// A [`RealtimeEvent::Connected`] event is delivered once the
    /// connection is up.
    async fn connect(&self, user: &UserId) -> Result<(), DohelpError>;

    /// Joins the room for one conversation (see
    /// [`ConversationId::room`](crate::types::ConversationId::room)).
    async fn join_room(&self, room: &str) -> Result<(), DohelpError>;

    /// Returns the next inbound event, suspending until one arrives.
    ///
    /// Returns [`RealtimeEvent::Disconnected`] exactly once when the
    /// connection ends; callers should stop polling after that.
    async fn next_event(&self) -> Result<RealtimeEvent, DohelpError>;

    /// Disconnects entirely (not just leaving the room). A fresh
    /// [`connect`](Self::connect) may follow.
    async fn disconnect(&self) -> Result<(), DohelpError>;
}
