// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock marketplace API for deterministic testing.
//!
//! `MockApi` implements `MarketplaceApi` with scripted task and history
//! results, idempotent conversation resolution keyed by (task, receiver),
//! call recording, and per-conversation hold/release gates so tests can
//! observe in-flight history fetches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use dohelp_core::error::DohelpError;
use dohelp_core::traits::{MarketplaceApi, PlatformAdapter};
use dohelp_core::types::{
    AdapterType, ChatMessage, ConversationId, HealthStatus, MessageId, TaskId, TaskRef, UserId,
};

/// A recorded API call, for assertions on traffic shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchTask(TaskId),
    CreateConversation { task: TaskId, receiver: UserId },
    FetchMessages(ConversationId),
    SendMessage { conversation: ConversationId, body: String },
    MarkSeen(MessageId),
}

/// A scripted marketplace API backend.
pub struct MockApi {
    /// Scripted task results; `None` means the fetch fails.
    tasks: Mutex<HashMap<TaskId, Option<TaskRef>>>,
    /// Scripted history per conversation; missing entries yield empty lists.
    histories: Mutex<HashMap<ConversationId, Vec<ChatMessage>>>,
    /// Conversations resolved so far, keyed by (task, receiver). Repeated
    /// creates for the same key return the same id, mirroring the server's
    /// idempotent create-or-fetch contract.
    conversations: Mutex<HashMap<(TaskId, UserId), ConversationId>>,
    /// Gates holding history fetches open until released.
    history_gates: Mutex<HashMap<ConversationId, Arc<Notify>>>,
    calls: Mutex<Vec<ApiCall>>,
    next_conversation: AtomicU64,
    next_message: AtomicU64,
    fail_sends: AtomicBool,
    fail_creates: AtomicBool,
    /// Sender identity stamped on messages created by `send_message`.
    send_sender: UserId,
}

impl MockApi {
    /// Creates a mock whose sent messages carry `send_sender` as sender
    /// (the identity the server would derive from the bearer token).
    pub fn new(send_sender: UserId) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            histories: Mutex::new(HashMap::new()),
            conversations: Mutex::new(HashMap::new()),
            history_gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_conversation: AtomicU64::new(1),
            next_message: AtomicU64::new(100),
            fail_sends: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
            send_sender,
        }
    }

    /// Scripts a successful task fetch.
    pub async fn set_task(&self, task: TaskRef) {
        self.tasks.lock().await.insert(task.id.clone(), Some(task));
    }

    /// Scripts a failing task fetch (the controller's fallback path).
    pub async fn fail_task(&self, task: &TaskId) {
        self.tasks.lock().await.insert(task.clone(), None);
    }

    /// Scripts the history of a conversation.
    pub async fn set_history(&self, conversation: &ConversationId, messages: Vec<ChatMessage>) {
        self.histories
            .lock()
            .await
            .insert(conversation.clone(), messages);
    }

    /// Holds the next history fetch for `conversation` open until
    /// [`release_history`](Self::release_history) is called.
    pub async fn hold_history(&self, conversation: &ConversationId) {
        self.history_gates
            .lock()
            .await
            .insert(conversation.clone(), Arc::new(Notify::new()));
    }

    /// Releases a held history fetch.
    pub async fn release_history(&self, conversation: &ConversationId) {
        if let Some(gate) = self.history_gates.lock().await.get(conversation) {
            gate.notify_one();
        }
    }

    /// Makes subsequent `send_message` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `create_conversation` calls fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// All calls recorded so far, in order.
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    /// Count of recorded calls matching `predicate`.
    pub async fn call_count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|c| predicate(c)).count()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl PlatformAdapter for MockApi {
    fn name(&self) -> &str {
        "mock-api"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Api
    }

    async fn health_check(&self) -> Result<HealthStatus, DohelpError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DohelpError> {
        Ok(())
    }
}

#[async_trait]
impl MarketplaceApi for MockApi {
    async fn fetch_task(&self, task: &TaskId) -> Result<TaskRef, DohelpError> {
        self.record(ApiCall::FetchTask(task.clone())).await;
        match self.tasks.lock().await.get(task) {
            Some(Some(task_ref)) => Ok(task_ref.clone()),
            _ => Err(DohelpError::Api {
                message: format!("no such task: {task}"),
                source: None,
            }),
        }
    }

    async fn create_conversation(
        &self,
        receiver: &UserId,
        task: &TaskId,
    ) -> Result<ConversationId, DohelpError> {
        self.record(ApiCall::CreateConversation {
            task: task.clone(),
            receiver: receiver.clone(),
        })
        .await;

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(DohelpError::Api {
                message: "conversation create failed".into(),
                source: None,
            });
        }

        let key = (task.clone(), receiver.clone());
        let mut conversations = self.conversations.lock().await;
        let id = conversations.entry(key).or_insert_with(|| {
            let n = self.next_conversation.fetch_add(1, Ordering::SeqCst);
            ConversationId(format!("C{n}"))
        });
        Ok(id.clone())
    }

    async fn fetch_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<ChatMessage>, DohelpError> {
        self.record(ApiCall::FetchMessages(conversation.clone())).await;

        let gate = self.history_gates.lock().await.get(conversation).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Ok(self
            .histories
            .lock()
            .await
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        body: &str,
    ) -> Result<ChatMessage, DohelpError> {
        self.record(ApiCall::SendMessage {
            conversation: conversation.clone(),
            body: body.to_string(),
        })
        .await;

        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DohelpError::Api {
                message: "send failed".into(),
                source: None,
            });
        }

        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(ChatMessage {
            id: MessageId(format!("m{n}")),
            conversation_id: conversation.clone(),
            sender: self.send_sender.clone(),
            body: body.to_string(),
            created_at: chrono::Utc::now(),
            seen: false,
        })
    }

    async fn mark_seen(&self, message: &MessageId) -> Result<(), DohelpError> {
        self.record(ApiCall::MarkSeen(message.clone())).await;
        Ok(())
    }
}
