use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_SESSION_TITLE, TITLE_MAX_CHARS};
use crate::core::message::{next_id, HistoryTurn, Message};

/// One conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// An empty session created by an explicit "new chat".
    pub fn new() -> Self {
        Self {
            id: next_id(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A session created implicitly by the first send.
    pub fn titled_from(text: &str) -> Self {
        Self {
            title: derive_title(text),
            ..Self::new()
        }
    }

    /// Append a message. The first user message names the session; later
    /// messages never touch the title.
    pub fn push(&mut self, message: Message) {
        if self.messages.is_empty() && message.is_user() {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
    }

    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages.iter().map(Message::to_history_turn).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub fn derive_title(text: &str) -> String {
    text.chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_thirty_characters() {
        let text = "Explain the borrow checker in exactly three sentences please";
        let session = Session::titled_from(text);
        assert_eq!(session.title, "Explain the borrow checker in ");
        assert_eq!(session.title.chars().count(), 30);
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let text = "ü".repeat(40);
        assert_eq!(derive_title(&text), "ü".repeat(30));
    }

    #[test]
    fn first_user_message_names_a_new_chat() {
        let mut session = Session::new();
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);

        session.push(Message::user("hi"));
        assert_eq!(session.title, "hi");

        session.push(Message::assistant("hello"));
        session.push(Message::user("a completely different topic"));
        assert_eq!(session.title, "hi");
    }

    #[test]
    fn history_preserves_order_and_roles() {
        let mut session = Session::new();
        session.push(Message::user("q1"));
        session.push(Message::assistant("a1"));

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].role.is_user());
        assert_eq!(history[1].text, "a1");
    }

    #[test]
    fn serializes_created_at_as_text() {
        let session = Session::titled_from("hi");
        let value = serde_json::to_value(&session).unwrap();
        assert!(value["createdAt"].is_string());
        assert_eq!(value["title"], "hi");
    }
}
