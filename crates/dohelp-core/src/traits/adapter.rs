// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that both backend adapters implement.

use async_trait::async_trait;

use crate::error::DohelpError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for DoHelp backend adapters.
///
/// Both the marketplace REST client and the realtime transport implement
/// this trait, which provides identity, lifecycle, and health check
/// capabilities.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter (api or realtime).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, DohelpError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), DohelpError>;
}
