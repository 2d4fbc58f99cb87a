// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./dohelp.toml` > `~/.config/dohelp/dohelp.toml` >
//! `/etc/dohelp/dohelp.toml` with environment variable overrides via the
//! `DOHELP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DohelpConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dohelp/dohelp.toml` (system-wide)
/// 3. `~/.config/dohelp/dohelp.toml` (user XDG config)
/// 4. `./dohelp.toml` (local directory)
/// 5. `DOHELP_*` environment variables
pub fn load_config() -> Result<DohelpConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DohelpConfig::default()))
        .merge(Toml::file("/etc/dohelp/dohelp.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dohelp/dohelp.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dohelp.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<DohelpConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DohelpConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DohelpConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DohelpConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DOHELP_API_BEARER_TOKEN` must map to
/// `api.bearer_token`, not `api.bearer.token`.
fn env_provider() -> Env {
    Env::prefixed("DOHELP_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: DOHELP_API_BEARER_TOKEN -> "api_bearer_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("client_", "client.", 1)
            .replacen("api_", "api.", 1)
            .replacen("realtime_", "realtime.", 1);
        mapped.into()
    })
}
