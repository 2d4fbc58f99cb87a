// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and nonzero timeouts.

use crate::diagnostic::ConfigError;
use crate::model::DohelpConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DohelpConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "api.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{base_url}` must use the http or https scheme"),
        });
    }

    let rt_url = config.realtime.url.trim();
    if rt_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "realtime.url must not be empty".to_string(),
        });
    } else if !rt_url.starts_with("ws://") && !rt_url.starts_with("wss://") {
        errors.push(ConfigError::Validation {
            message: format!("realtime.url `{rt_url}` must use the ws or wss scheme"),
        });
    }

    if config.api.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "api.timeout_secs must be nonzero".to_string(),
        });
    }

    if config.realtime.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.connect_timeout_secs must be nonzero".to_string(),
        });
    }

    if let Some(token) = &config.api.bearer_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "api.bearer_token must not be empty when set (omit it instead)".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
