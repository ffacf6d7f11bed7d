//! Transient conversation state and the send/persist orchestration.
//!
//! A session moves `Idle -> AwaitingReply -> Idle` per send. The user
//! message is appended optimistically when the send begins; the assistant
//! message is appended only on success, and a failure parks the session
//! behind an error that must be dismissed before the next send. The
//! transitions are plain methods so the sequence is testable without a
//! network; [`ChatSession::send_message`] drives them around the model
//! call.

use tracing::debug;

use crate::api::client::{ApiError, ModelClient};
use crate::api::SamplingParams;
use crate::auth::User;
use crate::core::message::Message;
use crate::core::prompt::build_instruction;
use crate::core::role::ExpertiseRole;
use crate::history::{ChatHistory, ChatHistoryStore};
use crate::storage::KeyValueStore;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingReply,
}

/// Why a send was rejected before it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBlocked {
    /// A model call is already outstanding.
    ReplyOutstanding,
    /// A previous failure has not been dismissed yet.
    ErrorActive,
    /// The input was empty after trimming.
    EmptyInput,
}

impl fmt::Display for SendBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendBlocked::ReplyOutstanding => write!(f, "A reply is still on its way"),
            SendBlocked::ErrorActive => {
                write!(f, "Dismiss the current error before sending again")
            }
            SendBlocked::EmptyInput => write!(f, "Nothing to send"),
        }
    }
}

pub struct ChatSession {
    messages: Vec<Message>,
    role: ExpertiseRole,
    phase: SessionPhase,
    error: Option<ApiError>,
    /// Persisted history this session is bound to, once auto-save has run.
    history_id: Option<String>,
}

impl ChatSession {
    pub fn new(role: ExpertiseRole) -> Self {
        Self {
            messages: Vec::new(),
            role,
            phase: SessionPhase::Idle,
            error: None,
            history_id: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn role(&self) -> ExpertiseRole {
        self.role
    }

    pub fn set_role(&mut self, role: ExpertiseRole) {
        self.role = role;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::AwaitingReply
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn history_id(&self) -> Option<&str> {
        self.history_id.as_deref()
    }

    /// First phase of a send: guard, then append the user message
    /// optimistically and mark the reply as outstanding.
    pub fn begin_send(&mut self, text: &str) -> Result<(), SendBlocked> {
        if self.error.is_some() {
            return Err(SendBlocked::ErrorActive);
        }
        if self.phase == SessionPhase::AwaitingReply {
            return Err(SendBlocked::ReplyOutstanding);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SendBlocked::EmptyInput);
        }
        self.messages.push(Message::user(trimmed));
        self.phase = SessionPhase::AwaitingReply;
        Ok(())
    }

    /// Second phase, success path: append the assistant reply.
    pub fn resolve_reply(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
        self.phase = SessionPhase::Idle;
    }

    /// Second phase, failure path: no assistant message, the error blocks
    /// further sends until dismissed.
    pub fn fail_reply(&mut self, error: ApiError) {
        self.phase = SessionPhase::Idle;
        self.error = Some(error);
    }

    pub fn dismiss_error(&mut self) -> Option<ApiError> {
        self.error.take()
    }

    /// Replace the session wholesale with a saved conversation and bind to
    /// it for subsequent auto-saves.
    pub fn load_history(&mut self, history: &ChatHistory) {
        self.messages = history.messages.clone();
        self.role = history.role;
        self.phase = SessionPhase::Idle;
        self.error = None;
        self.history_id = Some(history.id.clone());
    }

    /// Clear the conversation and unbind from any saved history. The
    /// selected role is kept.
    pub fn new_chat(&mut self) {
        self.messages.clear();
        self.phase = SessionPhase::Idle;
        self.error = None;
        self.history_id = None;
    }

    /// A session persists once it holds at least two messages with both a
    /// user and an assistant turn among them.
    pub fn qualifies_for_persistence(&self) -> bool {
        self.messages.len() >= 2
            && self.messages.iter().any(Message::is_user)
            && self.messages.iter().any(Message::is_assistant)
    }

    /// Persist the session for a signed-in user: the first qualifying
    /// change saves and binds the new history id, later changes update in
    /// place. Guests and non-qualifying sessions are left alone. Storage
    /// failures are logged and swallowed; persistence never interrupts
    /// the conversation.
    pub fn auto_persist<S: KeyValueStore>(
        &mut self,
        history: &ChatHistoryStore<S>,
        user: Option<&User>,
    ) {
        let Some(user) = user else {
            return;
        };
        if !self.qualifies_for_persistence() {
            return;
        }
        match &self.history_id {
            Some(id) => {
                if let Err(err) = history.update(&user.id, id, &self.messages) {
                    debug!(%err, "history update skipped");
                }
            }
            None => match history.save(&user.id, None, &self.messages, self.role) {
                Ok(saved) => self.history_id = Some(saved.id),
                Err(err) => debug!(%err, "history save skipped"),
            },
        }
    }

    /// Run one full send: guard + optimistic append, the model call, then
    /// reconciliation and auto-persist. `Ok` means the attempt ran to
    /// completion; check [`ChatSession::error`] for a captured failure.
    pub async fn send_message<S: KeyValueStore>(
        &mut self,
        text: &str,
        client: &dyn ModelClient,
        sampling: &SamplingParams,
        history: &ChatHistoryStore<S>,
        user: Option<&User>,
    ) -> Result<(), SendBlocked> {
        self.begin_send(text)?;
        self.auto_persist(history, user);

        let instruction = build_instruction(self.role);
        match client.generate(&instruction, &self.messages, sampling).await {
            Ok(reply) => self.resolve_reply(reply),
            Err(err) => self.fail_reply(err),
        }
        self.auto_persist(history, user);
        Ok(())
    }
}
