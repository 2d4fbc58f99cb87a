// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock realtime transport for deterministic testing.
//!
//! `MockTransport` implements `RealtimeTransport` with injectable inbound
//! events and recorded room joins for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use dohelp_core::error::DohelpError;
use dohelp_core::traits::{PlatformAdapter, RealtimeTransport};
use dohelp_core::types::{AdapterType, HealthStatus, RealtimeEvent, UserId};

/// A mock realtime channel for testing.
///
/// Events injected via `inject_event()` are returned by `next_event()`.
/// `connect()` and `disconnect()` push the corresponding status events so
/// the controller observes the same sequence a real transport produces.
pub struct MockTransport {
    events: Arc<Mutex<VecDeque<RealtimeEvent>>>,
    notify: Arc<Notify>,
    connected_user: Mutex<Option<UserId>>,
    joined_rooms: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport with an empty event queue.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            connected_user: Mutex::new(None),
            joined_rooms: Mutex::new(Vec::new()),
        }
    }

    /// Inject an inbound event; the next call to `next_event()` returns it.
    pub async fn inject_event(&self, event: RealtimeEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// The user the transport was last connected as, if any.
    pub async fn connected_user(&self) -> Option<UserId> {
        self.connected_user.lock().await.clone()
    }

    /// All rooms joined so far, in order.
    pub async fn joined_rooms(&self) -> Vec<String> {
        self.joined_rooms.lock().await.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Realtime
    }

    async fn health_check(&self) -> Result<HealthStatus, DohelpError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DohelpError> {
        Ok(())
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn connect(&self, user: &UserId) -> Result<(), DohelpError> {
        // Events queued before this connect belong to a previous connection.
        self.events.lock().await.clear();
        *self.connected_user.lock().await = Some(user.clone());
        self.inject_event(RealtimeEvent::Connected).await;
        Ok(())
    }

    async fn join_room(&self, room: &str) -> Result<(), DohelpError> {
        self.joined_rooms.lock().await.push(room.to_string());
        Ok(())
    }

    async fn next_event(&self) -> Result<RealtimeEvent, DohelpError> {
        loop {
            {
                let mut queue = self.events.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            // Wait for notification that a new event was injected
            self.notify.notified().await;
        }
    }

    async fn disconnect(&self) -> Result<(), DohelpError> {
        *self.connected_user.lock().await = None;
        self.inject_event(RealtimeEvent::Disconnected).await;
        Ok(())
    }
}
