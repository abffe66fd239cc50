//! Owned, versioned conversation state.
//!
//! Every mutation bumps a version number and publishes it on a watch channel
//! so the view can redraw when something changed without reaching into the
//! state on its own.

use tokio::sync::watch;

use crate::core::message::Message;
use crate::core::session::Session;

pub struct ChatState {
    sessions: Vec<Session>,
    active_id: Option<String>,
    awaiting_response: bool,
    version: u64,
    changes: watch::Sender<u64>,
}

impl ChatState {
    /// Build state from persisted sessions; the first one becomes active.
    pub fn new(sessions: Vec<Session>) -> Self {
        let active_id = sessions.first().map(|s| s.id.clone());
        let (changes, _) = watch::channel(0);
        Self {
            sessions,
            active_id,
            awaiting_response: false,
            version: 0,
            changes,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Owned copy of the session list, newest first.
    pub fn snapshot(&self) -> Vec<Session> {
        self.sessions.clone()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_id().and_then(|id| self.session(id))
    }

    pub fn active_index(&self) -> Option<usize> {
        let id = self.active_id()?;
        self.sessions.iter().position(|s| s.id == id)
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting_response
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Insert a session at the top of the list and make it active.
    pub fn prepend_session(&mut self, session: Session) {
        self.active_id = Some(session.id.clone());
        self.sessions.insert(0, session);
        self.bump();
    }

    /// Returns `false` when no session has that id.
    pub fn append_message(&mut self, session_id: &str, message: Message) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return false;
        };
        session.push(message);
        self.bump();
        true
    }

    /// Remove a session. Unknown ids leave the state untouched.
    pub fn remove_session(&mut self, id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return false;
        }
        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.sessions.first().map(|s| s.id.clone());
        }
        self.bump();
        true
    }

    /// Select a session. `None` clears the selection; unknown ids are ignored.
    pub fn set_active(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if self.session(id).is_none() => false,
            _ => {
                let next = id.map(str::to_string);
                if next == self.active_id {
                    return true;
                }
                self.active_id = next;
                self.bump();
                true
            }
        }
    }

    pub fn set_awaiting(&mut self, awaiting: bool) {
        if self.awaiting_response != awaiting {
            self.awaiting_response = awaiting;
            self.bump();
        }
    }

    fn bump(&mut self) {
        self.version += 1;
        self.changes.send_replace(self.version);
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
