// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the DoHelp chat client.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the DoHelp workspace: participant and
//! resource identifiers, the chat message model, realtime event shapes, and
//! the adapter traits the REST and WebSocket backends implement.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DohelpError;
pub use types::{
    AdapterType, ChatMessage, ConversationId, HealthStatus, MessageId, PeerInfo, RealtimeEvent,
    TaskId, TaskRef, UserId,
};

// Re-export the adapter traits at crate root.
pub use traits::{MarketplaceApi, PlatformAdapter, RealtimeTransport};
