// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async façade over the chat session state machine.
//!
//! The controller owns the two backend adapters and the shared session
//! state. `open()` spawns a bootstrap task (task fetch -> receiver
//! resolution -> conversation create-or-fetch -> room join -> history
//! fetch); a single event pump task applies realtime events to the session
//! for as long as the connection lives. Neither task blocks the caller, and
//! every completion re-checks the session generation before mutating
//! shared state.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dohelp_core::error::DohelpError;
use dohelp_core::traits::{MarketplaceApi, RealtimeTransport};
use dohelp_core::types::{
    ChatMessage, ConversationId, MessageId, PeerInfo, RealtimeEvent, TaskId, UserId,
};

use crate::session::{ChatSession, SessionPhase};

/// Result of a send operation, from the UI's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was sent and echoed into the store; clear the input.
    Sent,
    /// Empty or whitespace-only text; rejected before any network call.
    EmptyInput,
    /// No conversation is resolved; the operation is a no-op.
    NoConversation,
}

struct PumpHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// The chat session controller for one open panel at a time.
///
/// The current user's identity is an explicit constructor argument, never
/// ambient state. The message store and conversation id are mutated only
/// through this controller; the UI layer calls the operations below and
/// reads snapshots.
pub struct ChatController {
    current_user: UserId,
    api: Arc<dyn MarketplaceApi>,
    transport: Arc<dyn RealtimeTransport>,
    session: Arc<Mutex<ChatSession>>,
    pump: Mutex<Option<PumpHandle>>,
}

impl ChatController {
    /// Creates a controller for `current_user` over the given backends.
    pub fn new(
        current_user: UserId,
        api: Arc<dyn MarketplaceApi>,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Self {
        let session = Arc::new(Mutex::new(ChatSession::new(current_user.clone())));
        Self {
            current_user,
            api,
            transport,
            session,
            pump: Mutex::new(None),
        }
    }

    /// Opens the chat panel for `task_id`, resetting any previous session
    /// and starting the bootstrap in the background.
    ///
    /// Always succeeds at the UI level: underlying fetches degrade
    /// internally (fallback peer, empty history, disabled compose).
    pub async fn open(&self, task_id: TaskId, fallback_peer: Option<PeerInfo>) {
        self.ensure_connected().await;

        let generation = self
            .session
            .lock()
            .await
            .begin_open(task_id.clone(), fallback_peer);

        info!(task_id = %task_id, generation, "chat panel opened");

        tokio::spawn(bootstrap(
            Arc::clone(&self.api),
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            generation,
            task_id,
        ));
    }

    /// Closes the panel: clears the store, invalidates in-flight work, and
    /// disconnects the realtime channel entirely.
    pub async fn close(&self) {
        self.session.lock().await.close();

        if let Some(handle) = self.pump.lock().await.take() {
            handle.cancel.cancel();
            if let Err(e) = self.transport.disconnect().await {
                warn!(error = %e, "realtime disconnect failed");
            }
            handle.task.abort();
        }
        self.session.lock().await.set_connected(false);

        info!("chat panel closed");
    }

    /// Sends a message in the current conversation.
    ///
    /// Empty or whitespace-only text is rejected before any network call.
    /// On success the created message is echoed into the store (the
    /// realtime server echo is then de-duplicated away). On failure the
    /// error propagates and nothing is echoed, so the UI keeps the compose
    /// box populated for a manual retry.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, DohelpError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SendOutcome::EmptyInput);
        }

        let (generation, conversation) = {
            let session = self.session.lock().await;
            match session.conversation() {
                Some(conversation) => (session.generation(), conversation.clone()),
                None => return Ok(SendOutcome::NoConversation),
            }
        };

        let message = self.api.send_message(&conversation, trimmed).await?;

        let mut session = self.session.lock().await;
        if !session.local_echo(generation, message) {
            debug!("send completed for a stale session, echo discarded");
        }
        Ok(SendOutcome::Sent)
    }

    /// Marks a message seen: the local flag is raised immediately, and the
    /// REST call fires in the background. A failed background call is
    /// logged and dropped; local state is never rolled back.
    pub async fn mark_seen(&self, id: &MessageId) {
        let newly_seen = self.session.lock().await.mark_seen_local(id);
        if !newly_seen {
            return;
        }

        let api = Arc::clone(&self.api);
        let id = id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.mark_seen(&id).await {
                warn!(error = %e, message_id = %id, "mark-seen failed, keeping local state");
            }
        });
    }

    /// Snapshot of the visible message list.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.session.lock().await.messages().to_vec()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.lock().await.phase()
    }

    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.session.lock().await.conversation().cloned()
    }

    pub async fn can_compose(&self) -> bool {
        self.session.lock().await.can_compose()
    }

    /// Connection status, for the UI affordance only; correctness never
    /// depends on it.
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_connected()
    }

    pub async fn peer_label(&self) -> Option<String> {
        self.session.lock().await.peer_label()
    }

    /// Opens the realtime connection for this user if none is live, and
    /// spawns the event pump. The connection is per logged-in session, not
    /// per task; a failure degrades to REST-only operation.
    async fn ensure_connected(&self) {
        let mut pump = self.pump.lock().await;
        let alive = pump.as_ref().is_some_and(|h| !h.task.is_finished());
        if alive {
            return;
        }

        if let Err(e) = self.transport.connect(&self.current_user).await {
            warn!(error = %e, "realtime connect failed, continuing without push events");
            *pump = None;
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(event_pump(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            cancel.clone(),
        ));
        *pump = Some(PumpHandle { cancel, task });
    }
}

/// Bootstrap for one open: task fetch -> receiver resolution ->
/// conversation create-or-fetch -> room join -> history fetch.
///
/// Each step funnels its completion through a generation-guarded session
/// method; a stale generation ends the task without touching shared state.
async fn bootstrap(
    api: Arc<dyn MarketplaceApi>,
    transport: Arc<dyn RealtimeTransport>,
    session: Arc<Mutex<ChatSession>>,
    generation: u64,
    task_id: TaskId,
) {
    let task_result = api.fetch_task(&task_id).await;

    let receiver = {
        let mut session = session.lock().await;
        let applied = match task_result {
            Ok(task) => session.task_loaded(generation, task),
            Err(e) => {
                warn!(error = %e, task_id = %task_id, "task fetch failed, substituting fallback peer");
                session.task_failed(generation)
            }
        };
        if !applied {
            return;
        }
        match session.receiver() {
            Some(receiver) => receiver.clone(),
            // Unavailable: legitimate terminal sub-state, nothing to create.
            None => return,
        }
    };

    let conversation = match api.create_conversation(&receiver, &task_id).await {
        Ok(conversation) => conversation,
        Err(e) => {
            warn!(error = %e, "conversation create failed");
            session.lock().await.conversation_failed(generation);
            return;
        }
    };

    if !session
        .lock()
        .await
        .conversation_resolved(generation, conversation.clone())
    {
        return;
    }

    // Room membership follows the conversation id; a failed join degrades
    // to REST-only until the next open.
    if let Err(e) = transport.join_room(&conversation.room()).await {
        warn!(error = %e, conversation_id = %conversation, "room join failed");
    }

    match api.fetch_messages(&conversation).await {
        Ok(history) => {
            session.lock().await.history_loaded(generation, history);
        }
        Err(e) => {
            warn!(error = %e, conversation_id = %conversation, "history fetch failed");
            session.lock().await.history_failed(generation);
        }
    }
}

/// Applies realtime events to the session until the connection ends or the
/// pump is cancelled.
async fn event_pump(
    transport: Arc<dyn RealtimeTransport>,
    session: Arc<Mutex<ChatSession>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("event pump cancelled");
                break;
            }
            event = transport.next_event() => match event {
                Ok(RealtimeEvent::MessageReceived(message)) => {
                    session.lock().await.remote_message(message);
                }
                Ok(RealtimeEvent::MessageSeen { message_id }) => {
                    session.lock().await.remote_seen(&message_id);
                }
                Ok(RealtimeEvent::Connected) => {
                    session.lock().await.set_connected(true);
                }
                Ok(RealtimeEvent::Disconnected) => {
                    session.lock().await.set_connected(false);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "realtime event error, stopping pump");
                    session.lock().await.set_connected(false);
                    break;
                }
            }
        }
    }
}
