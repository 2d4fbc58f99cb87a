// SPDX-FileCopyrightText: 2026 DoHelp Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-panel state machine for one chat session.
//!
//! Each open panel goes through phases:
//! Closed -> LoadingTask -> ResolvingConversation -> LoadingHistory -> Active,
//! returning to Closed on dismissal or task change. Unavailable is the
//! legitimate terminal sub-state when no chat counterpart can be resolved or
//! the conversation cannot be created: the panel still renders, compose
//! stays disabled.
//!
//! Every async completion carries the generation it belongs to. Opening a
//! new task (or closing the panel) bumps the generation, so results from a
//! stale session are discarded instead of leaking into the new session's
//! store.

use tracing::{debug, warn};

use dohelp_core::types::{ChatMessage, ConversationId, MessageId, PeerInfo, TaskId, TaskRef, UserId};

use crate::store::MessageStore;

/// Phases of the chat session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Panel not visible; no conversation, empty store.
    Closed,
    /// Panel open, task metadata request in flight.
    LoadingTask,
    /// Task reference known, determining the receiver and conversation.
    ResolvingConversation,
    /// Conversation id known, history fetch in flight.
    LoadingHistory,
    /// Fully bootstrapped; compose enabled, realtime events applied.
    Active,
    /// No resolvable counterpart or conversation; compose disabled.
    Unavailable,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Closed => write!(f, "closed"),
            SessionPhase::LoadingTask => write!(f, "loading-task"),
            SessionPhase::ResolvingConversation => write!(f, "resolving-conversation"),
            SessionPhase::LoadingHistory => write!(f, "loading-history"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Resolves the chat counterpart: the first task role that is not the
/// current user, poster checked before helper.
///
/// Returns `None` when both roles are absent or equal to the current user —
/// a legitimate state (unassigned task, or viewing one's own unclaimed
/// task) in which chat is unavailable.
pub fn resolve_receiver(task: &TaskRef, current_user: &UserId) -> Option<UserId> {
    [task.poster.as_ref(), task.helper.as_ref()]
        .into_iter()
        .flatten()
        .find(|role| *role != current_user)
        .cloned()
}

/// State for exactly one (task, panel-open) chat session.
///
/// All mutations are synchronous and deterministic; the async controller
/// owns the I/O and funnels completions through the `*_loaded` / `*_failed`
/// methods, each guarded by the generation it was started under.
pub struct ChatSession {
    current_user: UserId,
    generation: u64,
    phase: SessionPhase,
    task_id: Option<TaskId>,
    fallback_peer: Option<PeerInfo>,
    task: Option<TaskRef>,
    receiver: Option<UserId>,
    conversation: Option<ConversationId>,
    store: MessageStore,
    connected: bool,
}

impl ChatSession {
    /// Creates a closed session for an explicitly supplied identity.
    pub fn new(current_user: UserId) -> Self {
        Self {
            current_user,
            generation: 0,
            phase: SessionPhase::Closed,
            task_id: None,
            fallback_peer: None,
            task: None,
            receiver: None,
            conversation: None,
            store: MessageStore::new(),
            connected: false,
        }
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn receiver(&self) -> Option<&UserId> {
        self.receiver.as_ref()
    }

    /// The task reference this session resolved against (real or fallback).
    pub fn task(&self) -> Option<&TaskRef> {
        self.task.as_ref()
    }

    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Compose is enabled only once a conversation id is resolved.
    pub fn can_compose(&self) -> bool {
        self.phase == SessionPhase::Active && self.conversation.is_some()
    }

    /// Best-effort label for the chat counterpart: the resolved receiver,
    /// or the caller-supplied fallback display name.
    pub fn peer_label(&self) -> Option<String> {
        self.receiver
            .as_ref()
            .map(|r| r.0.clone())
            .or_else(|| self.fallback_peer.as_ref().map(|p| p.display_name.clone()))
    }

    /// Returns true if `generation` still identifies the live session.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Resets state and begins bootstrap for `task_id`.
    ///
    /// Returns the new generation; every async completion spawned for this
    /// open must present it back.
    pub fn begin_open(&mut self, task_id: TaskId, fallback_peer: Option<PeerInfo>) -> u64 {
        self.reset();
        self.generation += 1;
        self.phase = SessionPhase::LoadingTask;
        self.task_id = Some(task_id);
        self.fallback_peer = fallback_peer;
        debug!(generation = self.generation, "chat session opening");
        self.generation
    }

    /// Dismisses the panel: clears everything and invalidates in-flight work.
    pub fn close(&mut self) {
        self.reset();
        self.generation += 1;
        debug!(generation = self.generation, "chat session closed");
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Closed;
        self.task_id = None;
        self.fallback_peer = None;
        self.task = None;
        self.receiver = None;
        self.conversation = None;
        self.store.clear();
    }

    /// Applies a successful task fetch. Returns false for stale generations.
    pub fn task_loaded(&mut self, generation: u64, task: TaskRef) -> bool {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale task result");
            return false;
        }
        self.accept_task(task);
        true
    }

    /// Applies a failed task fetch by substituting a fallback task reference
    /// built from the caller-supplied peer info. This path must never
    /// dead-end: every open produces *some* task reference.
    pub fn task_failed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale task failure");
            return false;
        }
        let Some(task_id) = self.task_id.clone() else {
            return false;
        };
        let fallback = TaskRef {
            id: task_id,
            poster: self.fallback_peer.as_ref().and_then(|p| p.id.clone()),
            helper: None,
        };
        self.accept_task(fallback);
        true
    }

    fn accept_task(&mut self, task: TaskRef) {
        self.phase = SessionPhase::ResolvingConversation;
        self.receiver = resolve_receiver(&task, &self.current_user);
        self.task = Some(task);
        match &self.receiver {
            Some(receiver) => {
                debug!(receiver = %receiver, "receiver resolved");
            }
            None => {
                debug!("no resolvable receiver, chat unavailable");
                self.phase = SessionPhase::Unavailable;
            }
        }
    }

    /// Stores the resolved conversation id. Returns false for stale
    /// generations.
    pub fn conversation_resolved(&mut self, generation: u64, conversation: ConversationId) -> bool {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale conversation result");
            return false;
        }
        debug!(conversation_id = %conversation, "conversation resolved");
        self.conversation = Some(conversation);
        self.phase = SessionPhase::LoadingHistory;
        true
    }

    /// Conversation creation failed: remain without a conversation id,
    /// compose stays disabled.
    pub fn conversation_failed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        warn!("conversation resolution failed, chat unavailable");
        self.phase = SessionPhase::Unavailable;
        true
    }

    /// Merges fetched history into the store and activates the session.
    pub fn history_loaded(&mut self, generation: u64, messages: Vec<ChatMessage>) -> bool {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale history result");
            return false;
        }
        let appended = self.store.merge(messages);
        debug!(appended, "history merged");
        self.phase = SessionPhase::Active;
        true
    }

    /// History fetch failed: fall back to an empty list and activate anyway.
    pub fn history_failed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        warn!("history fetch failed, starting from empty message list");
        self.phase = SessionPhase::Active;
        true
    }

    /// Applies a realtime message-received event.
    ///
    /// Appended only when it belongs to the live conversation and the
    /// normalized sender is not the current user — own messages are already
    /// reflected by the local send echo, so re-appending them here would
    /// duplicate.
    pub fn remote_message(&mut self, message: ChatMessage) -> bool {
        if self.conversation.as_ref() != Some(&message.conversation_id) {
            debug!(conversation_id = %message.conversation_id, "dropping event for foreign conversation");
            return false;
        }
        if message.sender == self.current_user {
            return false;
        }
        self.store.insert(message)
    }

    /// Applies a realtime message-seen event. No-op for locally unknown ids.
    pub fn remote_seen(&mut self, id: &MessageId) -> bool {
        self.store.mark_seen(id)
    }

    /// Reflects a sent message into the store (optimistic echo), guarded by
    /// the generation the send was issued under.
    pub fn local_echo(&mut self, generation: u64, message: ChatMessage) -> bool {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale send echo");
            return false;
        }
        self.store.insert(message)
    }

    /// Raises a message's seen flag locally. Returns true on the
    /// false -> true transition, which is the caller's cue to fire the
    /// background mark-seen call.
    pub fn mark_seen_local(&mut self, id: &MessageId) -> bool {
        self.store.mark_seen(id)
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, poster: Option<&str>, helper: Option<&str>) -> TaskRef {
        TaskRef {
            id: TaskId(id.into()),
            poster: poster.map(UserId::from),
            helper: helper.map(UserId::from),
        }
    }

    fn msg(id: &str, conversation: &str, sender: &str) -> ChatMessage {
        ChatMessage {
            id: MessageId(id.into()),
            conversation_id: ConversationId(conversation.into()),
            sender: UserId(sender.into()),
            body: "body".into(),
            created_at: chrono::Utc::now(),
            seen: false,
        }
    }

    #[test]
    fn phase_display() {
        assert_eq!(SessionPhase::Closed.to_string(), "closed");
        assert_eq!(SessionPhase::LoadingTask.to_string(), "loading-task");
        assert_eq!(
            SessionPhase::ResolvingConversation.to_string(),
            "resolving-conversation"
        );
        assert_eq!(SessionPhase::LoadingHistory.to_string(), "loading-history");
        assert_eq!(SessionPhase::Active.to_string(), "active");
        assert_eq!(SessionPhase::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn receiver_is_the_role_that_is_not_me() {
        let me = UserId("U1".into());
        assert_eq!(
            resolve_receiver(&task("T1", Some("U1"), Some("U2")), &me),
            Some(UserId("U2".into()))
        );
        assert_eq!(
            resolve_receiver(&task("T1", Some("U2"), Some("U1")), &me),
            Some(UserId("U2".into()))
        );
    }

    #[test]
    fn receiver_unresolvable_when_roles_absent_or_self() {
        let me = UserId("U1".into());
        assert_eq!(resolve_receiver(&task("T1", Some("U1"), None), &me), None);
        assert_eq!(resolve_receiver(&task("T1", None, None), &me), None);
        assert_eq!(
            resolve_receiver(&task("T1", Some("U1"), Some("U1")), &me),
            None
        );
    }

    #[test]
    fn receiver_comparison_uses_normalized_identities() {
        // A numeric sender id on the wire and a string id locally are the
        // same participant.
        let me: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(
            resolve_receiver(&task("T1", Some("42"), Some("7")), &me),
            Some(UserId("7".into()))
        );
    }

    #[test]
    fn happy_bootstrap_reaches_active() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        assert_eq!(session.phase(), SessionPhase::LoadingTask);

        assert!(session.task_loaded(generation, task("T1", Some("U1"), Some("U2"))));
        assert_eq!(session.phase(), SessionPhase::ResolvingConversation);
        assert_eq!(session.receiver(), Some(&UserId("U2".into())));

        assert!(session.conversation_resolved(generation, ConversationId("C1".into())));
        assert_eq!(session.phase(), SessionPhase::LoadingHistory);

        assert!(session.history_loaded(generation, vec![msg("1", "C1", "U2")]));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.can_compose());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn unassigned_task_is_unavailable_without_conversation() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);

        assert!(session.task_loaded(generation, task("T1", Some("U1"), None)));
        assert_eq!(session.phase(), SessionPhase::Unavailable);
        assert!(session.receiver().is_none());
        assert!(session.conversation().is_none());
        assert!(!session.can_compose());
    }

    #[test]
    fn task_failure_substitutes_fallback_peer() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(
            TaskId("T1".into()),
            Some(PeerInfo {
                id: Some(UserId("U9".into())),
                display_name: "Taylor".into(),
            }),
        );

        assert!(session.task_failed(generation));
        assert_eq!(session.phase(), SessionPhase::ResolvingConversation);
        assert_eq!(session.receiver(), Some(&UserId("U9".into())));
        assert_eq!(session.peer_label().as_deref(), Some("U9"));
    }

    #[test]
    fn task_failure_without_fallback_id_is_unavailable_but_labeled() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(
            TaskId("T1".into()),
            Some(PeerInfo {
                id: None,
                display_name: "Taylor".into(),
            }),
        );

        assert!(session.task_failed(generation));
        assert_eq!(session.phase(), SessionPhase::Unavailable);
        assert_eq!(session.peer_label().as_deref(), Some("Taylor"));
    }

    #[test]
    fn stale_generation_results_are_discarded() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let stale = session.begin_open(TaskId("T-A".into()), None);
        let live = session.begin_open(TaskId("T-B".into()), None);
        assert_ne!(stale, live);

        assert!(!session.task_loaded(stale, task("T-A", Some("U1"), Some("U2"))));
        assert!(!session.conversation_resolved(stale, ConversationId("C-A".into())));
        assert!(!session.history_loaded(stale, vec![msg("1", "C-A", "U2")]));
        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), SessionPhase::LoadingTask);
    }

    #[test]
    fn close_invalidates_in_flight_work() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.close();

        assert!(!session.history_loaded(generation, vec![msg("1", "C1", "U2")]));
        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn conversation_failure_disables_compose() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.task_loaded(generation, task("T1", Some("U1"), Some("U2")));

        assert!(session.conversation_failed(generation));
        assert_eq!(session.phase(), SessionPhase::Unavailable);
        assert!(session.conversation().is_none());
        assert!(!session.can_compose());
    }

    #[test]
    fn history_failure_activates_with_empty_list() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.task_loaded(generation, task("T1", Some("U1"), Some("U2")));
        session.conversation_resolved(generation, ConversationId("C1".into()));

        assert!(session.history_failed(generation));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.messages().is_empty());
        assert!(session.can_compose());
    }

    #[test]
    fn remote_message_filters_own_and_foreign_traffic() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.task_loaded(generation, task("T1", Some("U1"), Some("U2")));
        session.conversation_resolved(generation, ConversationId("C1".into()));
        session.history_loaded(generation, vec![]);

        // Own message: already reflected via the send echo.
        assert!(!session.remote_message(msg("1", "C1", "U1")));
        // Foreign conversation: dropped.
        assert!(!session.remote_message(msg("2", "C-other", "U2")));
        // Counterpart message in the live conversation: appended.
        assert!(session.remote_message(msg("3", "C1", "U2")));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn remote_message_applies_while_history_is_loading() {
        // Realtime push and history fetch are unordered; a push arriving
        // before history completes must not be lost.
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.task_loaded(generation, task("T1", Some("U1"), Some("U2")));
        session.conversation_resolved(generation, ConversationId("C1".into()));

        assert!(session.remote_message(msg("2", "C1", "U2")));
        assert!(session.history_loaded(generation, vec![msg("1", "C1", "U2"), msg("2", "C1", "U2")]));
        // The pushed copy and the history copy collapsed into one entry.
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn local_echo_is_generation_guarded() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let stale = session.begin_open(TaskId("T-A".into()), None);
        session.begin_open(TaskId("T-B".into()), None);

        assert!(!session.local_echo(stale, msg("9", "C-A", "U1")));
        assert!(session.messages().is_empty());
    }

    #[test]
    fn mark_seen_local_reports_first_transition_only() {
        let mut session = ChatSession::new(UserId("U1".into()));
        let generation = session.begin_open(TaskId("T1".into()), None);
        session.task_loaded(generation, task("T1", Some("U1"), Some("U2")));
        session.conversation_resolved(generation, ConversationId("C1".into()));
        session.history_loaded(generation, vec![msg("1", "C1", "U2")]);

        assert!(session.mark_seen_local(&MessageId("1".into())));
        assert!(!session.mark_seen_local(&MessageId("1".into())));
        assert!(!session.mark_seen_local(&MessageId("404".into())));
    }
}
