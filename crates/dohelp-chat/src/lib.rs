// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session controller for the DoHelp task marketplace.
//!
//! For exactly one (task, panel-open) session, the [`ChatController`]
//! maintains a consistent, de-duplicated, chronologically coherent message
//! list and conversation identity, synchronized across the marketplace REST
//! API and the realtime push channel:
//! - [`store`]: insertion-ordered message arena keyed by message id — the
//!   set-union-by-key merge that makes final state order-independent
//! - [`session`]: the synchronous per-panel state machine, with a generation
//!   counter guarding every async completion against stale sessions
//! - [`controller`]: the async façade owning the backend adapters, the
//!   bootstrap task, and the realtime event pump

pub mod controller;
pub mod session;
pub mod store;

pub use controller::{ChatController, SendOutcome};
pub use session::{ChatSession, SessionPhase};
pub use store::MessageStore;
