// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the DoHelp chat client.

use thiserror::Error;

/// The primary error type used across the DoHelp adapter traits and the
/// chat session controller.
///
/// Nothing in the chat subsystem is fatal: callers recover from every
/// variant with a degraded-but-functional fallback (substitute peer data,
/// empty history, disabled compose input).
#[derive(Debug, Error)]
pub enum DohelpError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Marketplace REST API errors (non-2xx status, malformed payload,
    /// connection failure).
    #[error("api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Realtime transport errors (handshake failure, broken socket,
    /// undecodable frame).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A bearer token is required for this operation but none is configured.
    #[error("bearer token required but not configured")]
    Unauthorized,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
