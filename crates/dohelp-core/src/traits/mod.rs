// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the DoHelp backend seams.
//!
//! Both backends extend the [`PlatformAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod api;
pub mod realtime;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PlatformAdapter;
pub use api::MarketplaceApi;
pub use realtime::RealtimeTransport;
