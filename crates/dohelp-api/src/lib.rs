// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marketplace REST API client for the DoHelp chat subsystem.
//!
//! Implements [`MarketplaceApi`](dohelp_core::MarketplaceApi) over the five
//! REST endpoints the chat controller consumes: task metadata, conversation
//! create-or-fetch, message history, send, and mark-seen.

pub mod client;
pub mod wire;

pub use client::RestClient;
