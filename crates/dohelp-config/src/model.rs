// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the DoHelp chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level DoHelp client configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DohelpConfig {
    /// Client identity and logging settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Marketplace REST API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Realtime transport settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Client identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// User-Agent string sent with REST requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            log_level: default_log_level(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("dohelp-chat/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Marketplace REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the marketplace API.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for authenticated operations. Absent is a valid state:
    /// task fetch degrades to fallback data, conversation and message
    /// operations refuse with an authorization error.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            bearer_token: None,
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.dohelp.app".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Realtime transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// WebSocket endpoint of the realtime channel.
    #[serde(default = "default_realtime_url")]
    pub url: String,

    /// Connection handshake timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_realtime_url() -> String {
    "wss://rt.dohelp.app/socket".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = DohelpConfig::default();
        assert_eq!(config.api.base_url, "https://api.dohelp.app");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.api.bearer_token.is_none());
        assert_eq!(config.realtime.url, "wss://rt.dohelp.app/socket");
        assert_eq!(config.client.log_level, "info");
    }
}
