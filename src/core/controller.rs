//! Mediates between the session state, its persistence and the AI client.
//!
//! A send runs `idle -> awaiting_response -> idle`. [`begin_send`] records the
//! user's turn and raises the awaiting flag; [`finish_send`] records the
//! assistant's turn (answer or diagnostic) and lowers it. The event loop calls
//! the two halves around a spawned request; [`send_message`] composes them for
//! callers that can simply await.
//!
//! [`begin_send`]: ConversationController::begin_send
//! [`finish_send`]: ConversationController::finish_send
//! [`send_message`]: ConversationController::send_message

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::client::AiClient;
use crate::core::message::{HistoryTurn, Message};
use crate::core::session::Session;
use crate::core::state::ChatState;
use crate::core::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Nothing but whitespace was entered.
    Empty,
    /// A previous send has not settled yet.
    Busy,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Empty => f.write_str("message is empty"),
            SendError::Busy => f.write_str("still waiting for the previous answer"),
        }
    }
}

impl std::error::Error for SendError {}

/// A user turn that has been recorded and awaits its answer.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub session_id: String,
    pub prompt: String,
    /// Turns that preceded the prompt, oldest first.
    pub history: Vec<HistoryTurn>,
}

pub struct ConversationController {
    state: ChatState,
    store: SessionStore,
    client: Arc<AiClient>,
}

impl ConversationController {
    /// Load persisted sessions (starting empty if they are unreadable).
    pub fn new(store: SessionStore, client: Arc<AiClient>) -> Self {
        let sessions = store.load_or_empty();
        Self {
            state: ChatState::new(sessions),
            store,
            client,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn client(&self) -> Arc<AiClient> {
        Arc::clone(&self.client)
    }

    pub fn begin_send(&mut self, text: &str) -> Result<PendingTurn, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::Empty);
        }
        if self.state.is_awaiting() {
            return Err(SendError::Busy);
        }

        let session_id = match self.state.active_id() {
            Some(id) => id.to_string(),
            None => {
                let session = Session::titled_from(text);
                let id = session.id.clone();
                self.state.prepend_session(session);
                id
            }
        };

        let history = self
            .state
            .session(&session_id)
            .map(Session::history)
            .unwrap_or_default();

        self.state
            .append_message(&session_id, Message::user(text));
        self.state.set_awaiting(true);
        self.persist();

        debug!(session = %session_id, prior_turns = history.len(), "User turn recorded");
        Ok(PendingTurn {
            session_id,
            prompt: text.to_string(),
            history,
        })
    }

    /// Record the assistant's reply (or diagnostic) for `pending`.
    ///
    /// Returns `false` if the session was deleted while the request was in
    /// flight; the reply is dropped in that case.
    pub fn finish_send(&mut self, pending: &PendingTurn, reply: impl Into<String>) -> bool {
        let appended = self
            .state
            .append_message(&pending.session_id, Message::assistant(reply));
        if !appended {
            debug!(session = %pending.session_id, "Session gone before reply arrived");
        }
        self.state.set_awaiting(false);
        self.persist();
        appended
    }

    pub async fn send_message(&mut self, text: &str) -> Result<(), SendError> {
        let pending = self.begin_send(text)?;
        let reply = self
            .client
            .generate(&pending.prompt, &pending.history)
            .await;
        self.finish_send(&pending, reply);
        Ok(())
    }

    /// Like [`send_message`](Self::send_message), surfacing partial text as it
    /// arrives. A failed stream still yields a diagnostic assistant turn.
    pub async fn send_message_streaming<F>(&mut self, text: &str, on_chunk: F) -> Result<(), SendError>
    where
        F: FnMut(&str) + Send,
    {
        let pending = self.begin_send(text)?;
        let reply = match self
            .client
            .stream_generate(&pending.prompt, &pending.history, on_chunk)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "Streamed generation failed");
                err.diagnostic()
            }
        };
        self.finish_send(&pending, reply);
        Ok(())
    }

    /// Start an empty session at the top of the list and select it.
    pub fn new_chat(&mut self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        self.state.prepend_session(session);
        self.persist();
        id
    }

    pub fn delete_session(&mut self, id: &str) -> bool {
        let removed = self.state.remove_session(id);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn select_session(&mut self, id: &str) -> bool {
        self.state.set_active(Some(id))
    }

    /// Move the selection up (`-1`) or down (`1`) the session list, clamped
    /// at either end.
    pub fn select_relative(&mut self, offset: isize) -> bool {
        let sessions = self.state.sessions();
        if sessions.is_empty() {
            return false;
        }
        let target = match self.state.active_index() {
            Some(index) => index
                .saturating_add_signed(offset)
                .min(sessions.len() - 1),
            None => 0,
        };
        let id = sessions[target].id.clone();
        self.state.set_active(Some(&id))
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(self.state.sessions()) {
            warn!(error = %err, "Failed to persist sessions");
        }
    }
}
